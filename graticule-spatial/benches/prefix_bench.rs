//! Spatial core benchmarks.
//!
//! Measures:
//! - Streaming shape cover (cells emitted per shape)
//! - Morton term range computation for bbox and distance filters
//! - Geohash and Morton codec throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use graticule_core::{bits, geohash};
use graticule_spatial::{
    bbox_filters, distance_filters, GeoShapeOracle, PackedQuadTree, StreamingCellIterator,
};
use graticule_core::rect::GeoRect;
use std::str::FromStr;

fn parse_wkt(wkt: &str) -> geo_types::Geometry<f64> {
    wkt::Wkt::from_str(wkt)
        .expect("benchmark WKT parses")
        .try_into()
        .expect("benchmark WKT converts")
}

fn hexagon(center_lon: f64, center_lat: f64, radius_deg: f64) -> String {
    let mut coords = Vec::with_capacity(7);
    for i in 0..=6 {
        let angle = std::f64::consts::TAU * (i % 6) as f64 / 6.0;
        coords.push(format!(
            "{} {}",
            center_lon + radius_deg * angle.cos(),
            center_lat + radius_deg * angle.sin()
        ));
    }
    format!("POLYGON(({}))", coords.join(", "))
}

fn bench_streaming_cover(c: &mut Criterion) {
    let mut group = c.benchmark_group("streaming_cover");
    for levels in [4u32, 6, 8] {
        let tree = PackedQuadTree::new(levels).expect("valid depth");
        let shape = parse_wkt(&hexagon(2.3, 48.8, 12.0));
        let oracle = GeoShapeOracle::new(shape).expect("valid shape");
        group.bench_with_input(BenchmarkId::from_parameter(levels), &levels, |b, _| {
            b.iter(|| {
                let count = StreamingCellIterator::new(&tree, &oracle)
                    .filter_map(|c| c.ok())
                    .count();
                black_box(count)
            })
        });
    }
    group.finish();
}

fn bench_filter_ranges(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_ranges");
    group.bench_function("bbox", |b| {
        let rect = GeoRect::new(-5.0, -3.0, 7.0, 9.0);
        b.iter(|| black_box(bbox_filters(black_box(rect), 0.025).len()))
    });
    group.bench_function("distance", |b| {
        b.iter(|| black_box(distance_filters(40.0, -74.0, 250_000.0, 0.025).len()))
    });
    group.bench_function("distance_dateline", |b| {
        b.iter(|| black_box(distance_filters(0.0, 179.0, 321_869.0, 0.025).len()))
    });
    group.finish();
}

fn bench_codecs(c: &mut Criterion) {
    let mut group = c.benchmark_group("codecs");
    group.bench_function("morton_encode", |b| {
        b.iter(|| black_box(bits::morton_encode(black_box(-122.4194), black_box(37.7749))))
    });
    group.bench_function("geohash_string_encode", |b| {
        b.iter(|| {
            black_box(
                geohash::string_encode(black_box(37.7749), black_box(-122.4194), 12)
                    .expect("valid precision"),
            )
        })
    });
    group.bench_function("geohash_decode", |b| {
        b.iter(|| black_box(geohash::decode(black_box("9q8yyk8yt")).expect("valid hash")))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_streaming_cover,
    bench_filter_ranges,
    bench_codecs
);
criterion_main!(benches);
