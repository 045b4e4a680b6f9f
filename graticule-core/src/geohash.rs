//! Geohash base-32 codecs.
//!
//! A geohash interleaves latitude and longitude bits (longitude first) and
//! renders them 5 bits per character in a base-32 alphabet. Two machine
//! forms are supported besides the string:
//!
//! - the **Morton form**: the 62-bit lon/lat interleaved hash from
//!   [`crate::bits`], bit-plane swapped so longitude leads
//! - the **packed form**: `(hash_bits << 4) | precision`, where `hash_bits`
//!   is the top `5 * precision` bits of the swapped hash. The low nibble
//!   carries the precision, so packed values of equal precision sort
//!   exactly like their strings.
//!
//! Latitude comes first in the public argument order, matching common
//! geohash usage; the Morton layer underneath is (lon, lat).

use crate::bits;
use crate::error::{Error, Result};
use crate::rect::GeoRect;

/// Base-32 alphabet used by geohashes.
pub const BASE_32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Maximum precision (characters) representable in the packed long form.
pub const MAX_PRECISION: usize = 12;

/// Maximum precision accepted for cell-envelope decoding. Prefix-tree cells
/// may be deeper than the packed form supports.
pub const MAX_CELL_PRECISION: usize = 24;

const BASE_32_INV: [i8; 128] = build_inverse();

const fn build_inverse() -> [i8; 128] {
    let mut table = [-1i8; 128];
    let mut i = 0;
    while i < 32 {
        table[BASE_32[i] as usize] = i as i8;
        i += 1;
    }
    table
}

#[inline]
fn char_index(c: u8) -> Result<u64> {
    let idx = if (c as usize) < 128 {
        BASE_32_INV[c as usize]
    } else {
        -1
    };
    if idx < 0 {
        return Err(Error::invalid_geohash(format!(
            "character {:?} is not base-32",
            c as char
        )));
    }
    Ok(idx as u64)
}

fn check_precision(precision: usize) -> Result<()> {
    if precision == 0 || precision > MAX_PRECISION {
        return Err(Error::invalid_geohash(format!(
            "precision {precision} outside 1..={MAX_PRECISION}"
        )));
    }
    Ok(())
}

/// Encode a point as a geohash string of `precision` characters
/// (`1..=12`).
pub fn string_encode(lat: f64, lon: f64, precision: usize) -> Result<String> {
    check_precision(precision)?;
    let hash = bits::flip_flop(bits::morton_encode(lon, lat));
    let mut out = String::with_capacity(precision);
    let mut shift = 57i32;
    for _ in 0..precision {
        out.push(BASE_32[((hash >> shift) & 0x1f) as usize] as char);
        shift -= 5;
    }
    Ok(out)
}

/// Encode a point in the packed long form: `(hash << 4) | precision`.
pub fn long_encode(lat: f64, lon: f64, precision: usize) -> Result<u64> {
    check_precision(precision)?;
    let shift = (MAX_PRECISION - precision) * 5 + 2;
    let hash = bits::flip_flop(bits::morton_encode(lon, lat));
    Ok(((hash >> shift) << 4) | precision as u64)
}

/// Convert a geohash string to the packed long form.
pub fn long_encode_from_string(hash: &str) -> Result<u64> {
    if hash.is_empty() || hash.len() > MAX_PRECISION {
        return Err(Error::invalid_geohash(format!(
            "length {} outside 1..={MAX_PRECISION}",
            hash.len()
        )));
    }
    let mut packed = 0u64;
    let mut level = hash.len() as u64 - 1;
    for c in hash.bytes() {
        packed |= char_index(c)? << (level * 5);
        level = level.wrapping_sub(1);
    }
    Ok((packed << 4) | hash.len() as u64)
}

/// Convert a packed long back to its geohash string.
pub fn string_encode_from_long(packed: u64) -> Result<String> {
    let precision = (packed & 0xf) as usize;
    check_precision(precision)?;
    let mut hash = packed >> 4;
    let mut chars = vec![b'0'; precision];
    for slot in chars.iter_mut().rev() {
        *slot = BASE_32[(hash & 0x1f) as usize];
        hash >>= 5;
    }
    // chars are drawn from the ASCII alphabet
    Ok(String::from_utf8(chars).expect("base-32 output is ASCII"))
}

/// Morton hash of the min corner of a geohash string's cell.
pub fn morton_encode_from_string(hash: &str) -> Result<u64> {
    if hash.is_empty() || hash.len() > MAX_PRECISION {
        return Err(Error::invalid_geohash(format!(
            "length {} outside 1..={MAX_PRECISION}",
            hash.len()
        )));
    }
    let mut swapped = 0u64;
    let mut shift = 57u32;
    for c in hash.bytes() {
        swapped |= char_index(c)? << shift;
        shift = shift.wrapping_sub(5);
    }
    Ok(bits::flip_flop(swapped))
}

/// Morton hash of the min corner of a packed geohash's cell.
pub fn morton_encode_from_long(packed: u64) -> Result<u64> {
    let precision = (packed & 0xf) as u32;
    check_precision(precision as usize)?;
    Ok(bits::flip_flop((packed >> 4) << (62 - precision * 5)))
}

/// A decoded geohash: cell centre plus half-cell error bars per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decoded {
    pub lat: f64,
    pub lon: f64,
    pub lat_error: f64,
    pub lon_error: f64,
}

impl Decoded {
    /// The cell envelope this decoding describes.
    pub fn bbox(&self) -> GeoRect {
        GeoRect::new(
            self.lon - self.lon_error,
            self.lat - self.lat_error,
            self.lon + self.lon_error,
            self.lat + self.lat_error,
        )
    }
}

/// Envelope of a geohash cell. Accepts up to [`MAX_CELL_PRECISION`]
/// characters; precisions past the packed-form limit are resolved by
/// continued bisection.
pub fn bbox_of(hash: &str) -> Result<GeoRect> {
    if hash.is_empty() || hash.len() > MAX_CELL_PRECISION {
        return Err(Error::invalid_geohash(format!(
            "length {} outside 1..={MAX_CELL_PRECISION}",
            hash.len()
        )));
    }
    let (mut min_lon, mut max_lon) = (-180.0f64, 180.0f64);
    let (mut min_lat, mut max_lat) = (-90.0f64, 90.0f64);
    let mut split_lon = true;
    for c in hash.bytes() {
        let idx = char_index(c)?;
        for b in (0..5).rev() {
            let high = (idx >> b) & 1 == 1;
            if split_lon {
                let mid = (min_lon + max_lon) / 2.0;
                if high {
                    min_lon = mid;
                } else {
                    max_lon = mid;
                }
            } else {
                let mid = (min_lat + max_lat) / 2.0;
                if high {
                    min_lat = mid;
                } else {
                    max_lat = mid;
                }
            }
            split_lon = !split_lon;
        }
    }
    Ok(GeoRect::new(min_lon, min_lat, max_lon, max_lat))
}

/// Decode a geohash string to its cell centre and error bars.
pub fn decode(hash: &str) -> Result<Decoded> {
    let bbox = bbox_of(hash)?;
    let (lon, lat) = bbox.center();
    Ok(Decoded {
        lat,
        lon,
        lat_error: bbox.height() / 2.0,
        lon_error: bbox.width() / 2.0,
    })
}

/// Decode a packed geohash long to its cell centre and error bars.
pub fn decode_long(packed: u64) -> Result<Decoded> {
    decode(&string_encode_from_long(packed)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SF_LAT: f64 = 37.7749;
    const SF_LON: f64 = -122.4194;

    #[test]
    fn known_hash() {
        assert_eq!(string_encode(SF_LAT, SF_LON, 9).unwrap(), "9q8yyk8yt");
        assert_eq!(string_encode(48.8566, 2.3522, 5).unwrap(), "u09tv");
    }

    #[test]
    fn string_and_long_agree() {
        for p in 1..=MAX_PRECISION {
            let s = string_encode(SF_LAT, SF_LON, p).unwrap();
            let l = long_encode(SF_LAT, SF_LON, p).unwrap();
            assert_eq!(string_encode_from_long(l).unwrap(), s, "precision {p}");
            assert_eq!(long_encode_from_string(&s).unwrap(), l, "precision {p}");
        }
    }

    #[test]
    fn morton_forms_agree() {
        let s = string_encode(SF_LAT, SF_LON, 12).unwrap();
        let from_string = morton_encode_from_string(&s).unwrap();
        let from_long = morton_encode_from_long(long_encode_from_string(&s).unwrap()).unwrap();
        assert_eq!(from_string, from_long);
        // full precision keeps the whole quantised point except the two
        // trailing interleaved bits dropped by the 60-bit hash
        let full = bits::morton_encode(SF_LON, SF_LAT);
        assert_eq!(from_string, full & !0x3);
    }

    #[test]
    fn decode_within_error_bars() {
        for p in 1..=MAX_PRECISION {
            let s = string_encode(SF_LAT, SF_LON, p).unwrap();
            let d = decode(&s).unwrap();
            assert!((d.lat - SF_LAT).abs() <= d.lat_error, "precision {p}");
            assert!((d.lon - SF_LON).abs() <= d.lon_error, "precision {p}");
        }
    }

    #[test]
    fn decode_nine_chars() {
        let d = decode("9q8yyk8yt").unwrap();
        // 45 bits: 23 for lon, 22 for lat; both half-cells are 90 / 2^22
        let expected = 90.0 / (1u64 << 22) as f64;
        assert!((d.lat_error - expected).abs() < 1e-12);
        assert!((d.lon_error - expected).abs() < 1e-12);
        assert!((d.lat - SF_LAT).abs() <= d.lat_error);
        assert!((d.lon - SF_LON).abs() <= d.lon_error);
    }

    #[test]
    fn bbox_contains_origin_point() {
        let s = string_encode(0.0, 0.0, 6).unwrap();
        let bbox = bbox_of(&s).unwrap();
        assert!(bbox.contains_point(0.0, 0.0));
        assert!((bbox.width() - 360.0 / (1u64 << 15) as f64).abs() < 1e-12);
    }

    #[test]
    fn packed_order_matches_string_order_at_fixed_precision() {
        let coords = [
            (SF_LAT, SF_LON),
            (48.8566, 2.3522),
            (-33.8688, 151.2093),
            (0.0, 0.0),
            (89.9, 179.9),
            (-89.9, -179.9),
        ];
        let mut strings: Vec<String> = coords
            .iter()
            .map(|&(lat, lon)| string_encode(lat, lon, 8).unwrap())
            .collect();
        let mut longs: Vec<u64> = strings
            .iter()
            .map(|s| long_encode_from_string(s).unwrap())
            .collect();
        strings.sort();
        longs.sort();
        let from_longs: Vec<String> = longs
            .iter()
            .map(|&l| string_encode_from_long(l).unwrap())
            .collect();
        assert_eq!(strings, from_longs);
    }

    #[test]
    fn rejects_garbage() {
        assert!(string_encode(0.0, 0.0, 0).is_err());
        assert!(string_encode(0.0, 0.0, 13).is_err());
        assert!(long_encode_from_string("").is_err());
        assert!(long_encode_from_string("abc").is_err()); // 'a' not in alphabet
        assert!(string_encode_from_long(0).is_err());
        assert!(bbox_of("9q8yyk8yt9q8yyk8yt9q8yyk8").is_err());
    }

    #[test]
    fn lat_edge_clamps_lon_edge_wraps() {
        let north = string_encode(90.0, 0.0, 6).unwrap();
        let below = string_encode(90.0 - 1e-9, 0.0, 6).unwrap();
        assert_eq!(north, below);

        let east = string_encode(0.0, 180.0, 6).unwrap();
        let west = string_encode(0.0, -180.0, 6).unwrap();
        assert_eq!(east, west);
    }
}
