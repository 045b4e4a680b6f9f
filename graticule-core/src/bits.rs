//! Bit-interleaving and Morton (Z-order) codecs.
//!
//! A Morton hash packs a (lon, lat) pair into a single `u64` whose numeric
//! order preserves spatial locality. Longitude occupies the even bits and
//! latitude the odd bits. Each axis is quantised to 31 bits of its full
//! range, so the hash carries 62 significant bits and the top two bits are
//! always zero.
//!
//! All functions here are infallible bit operations. Inputs outside
//! `lon ∈ [-180, 180)`, `lat ∈ [-90, 90)` are caller contract: longitude
//! 180 wraps to -180 and latitude clamps just below 90, anything further
//! out saturates at the range edge.

/// Quantised bits per axis.
pub const BITS: u32 = 31;

const LON_SCALE: f64 = (1u64 << BITS) as f64 / 360.0;
const LAT_SCALE: f64 = (1u64 << BITS) as f64 / 180.0;

const AXIS_MASK: u32 = 0x7fff_ffff;

const EVEN_BITS: u64 = 0x5555_5555_5555_5555;
const ODD_BITS: u64 = 0xAAAA_AAAA_AAAA_AAAA;

/// Spread each of the low 32 bits with a zero to its left.
///
/// Standard interleave-by-binary-magic-numbers cascade.
#[inline]
pub fn widen(low32: u32) -> u64 {
    let mut x = low32 as u64;
    x = (x | (x << 16)) & 0x0000_ffff_0000_ffff;
    x = (x | (x << 8)) & 0x00ff_00ff_00ff_00ff;
    x = (x | (x << 4)) & 0x0f0f_0f0f_0f0f_0f0f;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    x = (x | (x << 1)) & EVEN_BITS;
    x
}

/// Inverse of [`widen`]; bits outside the even-bit mask are ignored.
#[inline]
pub fn unwiden(wide: u64) -> u32 {
    let mut x = wide & EVEN_BITS;
    x = (x | (x >> 1)) & 0x3333_3333_3333_3333;
    x = (x | (x >> 2)) & 0x0f0f_0f0f_0f0f_0f0f;
    x = (x | (x >> 4)) & 0x00ff_00ff_00ff_00ff;
    x = (x | (x >> 8)) & 0x0000_ffff_0000_ffff;
    x = (x | (x >> 16)) & 0x0000_0000_ffff_ffff;
    x as u32
}

/// Interleave two 32-bit values: `even` into the even bits, `odd` into the
/// odd bits.
#[inline]
pub fn interleave(even: u32, odd: u32) -> u64 {
    widen(even) | (widen(odd) << 1)
}

/// Split an interleaved value back into its (even, odd) bit planes.
#[inline]
pub fn deinterleave(hash: u64) -> (u32, u32) {
    (unwiden(hash), unwiden(hash >> 1))
}

/// Swap the two interleaved bit planes.
#[inline]
pub fn flip_flop(hash: u64) -> u64 {
    ((hash & ODD_BITS) >> 1) | ((hash & EVEN_BITS) << 1)
}

#[inline]
fn scale_lon(lon: f64) -> u32 {
    // lon = 180 quantises to 2^31 and the mask wraps it to -180
    (((lon + 180.0) * LON_SCALE) as i64 as u32) & AXIS_MASK
}

#[inline]
fn scale_lat(lat: f64) -> u32 {
    // lat = 90 quantises to 2^31; clamp to the last representable row
    // instead of wrapping to -90
    let q = ((lat + 90.0) * LAT_SCALE) as i64;
    q.clamp(0, AXIS_MASK as i64) as u32
}

#[inline]
fn unscale_lon(q: u32) -> f64 {
    q as f64 / LON_SCALE - 180.0
}

#[inline]
fn unscale_lat(q: u32) -> f64 {
    q as f64 / LAT_SCALE - 90.0
}

/// Morton-encode a (lon, lat) pair: longitude in the even bits, latitude in
/// the odd bits.
#[inline]
pub fn morton_encode(lon: f64, lat: f64) -> u64 {
    interleave(scale_lon(lon), scale_lat(lat))
}

/// Longitude of the min corner of the Morton hash's quantisation cell.
#[inline]
pub fn morton_decode_lon(hash: u64) -> f64 {
    unscale_lon(unwiden(hash))
}

/// Latitude of the min corner of the Morton hash's quantisation cell.
#[inline]
pub fn morton_decode_lat(hash: u64) -> f64 {
    unscale_lat(unwiden(hash >> 1))
}

/// Size of one quantisation step on the longitude axis, in degrees.
pub const LON_STEP: f64 = 360.0 / (1u64 << BITS) as f64;

/// Size of one quantisation step on the latitude axis, in degrees.
pub const LAT_STEP: f64 = 180.0 / (1u64 << BITS) as f64;
