use city_traffic_sim::simulation_engine::classifier::{classify_all, reclassify_neighborhood};
use city_traffic_sim::simulation_engine::grid::{CellType, CityGrid, GridPos};
use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion,
    PlotConfiguration,
};

// Every third row and column is a street.
fn street_grid(size: usize) -> CityGrid {
    let mut grid = CityGrid::new(size);
    for pos in grid.positions().collect::<Vec<_>>() {
        if pos.x % 3 == 0 || pos.y % 3 == 0 {
            grid.set(pos, CellType::Road);
        }
    }
    grid
}

fn bench_classify_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_all");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    for &size in &[20usize, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let template = street_grid(size);
            b.iter(|| {
                let mut grid = template.clone();
                classify_all(&mut grid);
                black_box(grid);
            });
        });
    }
    group.finish();
}

fn bench_local_edit(c: &mut Criterion) {
    let mut grid = street_grid(20);
    classify_all(&mut grid);
    let pos = GridPos::new(9, 9);

    c.bench_function("reclassify_neighborhood", |b| {
        b.iter(|| {
            grid.set(pos, CellType::Road);
            reclassify_neighborhood(&mut grid, black_box(pos));
            grid.set(pos, CellType::Empty);
            reclassify_neighborhood(&mut grid, black_box(pos));
        });
    });
}

criterion_group!(benches, bench_classify_all, bench_local_edit);
criterion_main!(benches);
