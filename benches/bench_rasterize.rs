use city_traffic_sim::simulation_engine::rasterize::{
    rasterize_segments, GeoBounds, LatLon, RoadSegment,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_segments(count: usize, bounds: &GeoBounds, rng: &mut StdRng) -> Vec<RoadSegment> {
    let point = |rng: &mut StdRng| LatLon {
        lat: rng.random_range(bounds.south..bounds.north),
        lon: rng.random_range(bounds.west..bounds.east),
    };
    (0..count)
        .map(|_| RoadSegment {
            start: point(rng),
            end: point(rng),
        })
        .collect()
}

fn bench_rasterize(c: &mut Criterion) {
    let bounds = GeoBounds::new(52.50, 13.38, 52.52, 13.41);
    let mut rng = StdRng::seed_from_u64(7);
    let mut group = c.benchmark_group("rasterize_segments");

    for &count in &[50usize, 200, 1000] {
        let segments = random_segments(count, &bounds, &mut rng);
        group.bench_with_input(BenchmarkId::from_parameter(count), &segments, |b, segments| {
            let mut rng = StdRng::seed_from_u64(1);
            b.iter(|| {
                let grid = rasterize_segments(&bounds, black_box(segments), 20, 0.3, &mut rng);
                black_box(grid)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rasterize);
criterion_main!(benches);
