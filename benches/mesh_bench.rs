use criterion::{black_box, criterion_group, criterion_main, Criterion};
use litematic_mesh::commands::fill_commands;
use litematic_mesh::{compress, BlockState, CommandOptions, Region, VoxelGrid};
use std::time::Duration;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_grid_solid(size: i32) -> VoxelGrid {
    VoxelGrid::from_cells((size, size, size), vec![1; (size * size * size) as usize]).unwrap()
}

fn make_grid_sparse(size: i32, pct: u32) -> VoxelGrid {
    let mut counter = 0u32;
    let cells = (0..(size * size * size) as usize)
        .map(|_| {
            counter = counter.wrapping_mul(1103515245).wrapping_add(12345);
            let roll = (counter >> 16) % 100;
            if roll < pct {
                1 + (roll as usize % 4)
            } else {
                0
            }
        })
        .collect();
    VoxelGrid::from_cells((size, size, size), cells).unwrap()
}

fn make_region_layers(size: i32) -> Region {
    let mut r = Region::new("bench".to_string(), (0, 0, 0), (size, size, size)).unwrap();
    let layers = [
        BlockState::new("minecraft:stone"),
        BlockState::new("minecraft:dirt"),
        BlockState::new("minecraft:grass_block").with_property("snowy", "false"),
    ];
    for y in 0..size as usize {
        for z in 0..size as usize {
            for x in 0..size as usize {
                r.set_block(x, y, z, &layers[y % layers.len()]);
            }
        }
    }
    r
}

// ── Benchmarks ───────────────────────────────────────────────────────────────

fn bench_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress");
    group.measurement_time(Duration::from_secs(3));

    for &size in &[16, 32] {
        let solid = make_grid_solid(size);
        group.bench_function(&format!("{}_solid", size), |b| {
            b.iter(|| black_box(compress(&solid)));
        });

        let sparse = make_grid_sparse(size, 10);
        group.bench_function(&format!("{}_sparse10", size), |b| {
            b.iter(|| black_box(compress(&sparse)));
        });

        let half = make_grid_sparse(size, 50);
        group.bench_function(&format!("{}_half", size), |b| {
            b.iter(|| black_box(compress(&half)));
        });
    }
    group.finish();
}

fn bench_fill_commands(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_commands");
    group.measurement_time(Duration::from_secs(3));

    let region = make_region_layers(32);
    let options = CommandOptions::with_origin((100, 64, 100));
    group.bench_function("32_layers", |b| {
        b.iter(|| black_box(fill_commands(&region, &options)));
    });
    group.finish();
}

criterion_group!(benches, bench_compress, bench_fill_commands);
criterion_main!(benches);
