//! # Transform Benchmark
//!
//! Propagation cost for wide and deep hierarchies.
//!
//! Run with: `cargo bench --package strata_core --bench transform_benchmark`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strata_core::ecs::EntityId;
use strata_core::transform::{Quat, Transform, Vec3};
use strata_core::{World, WorldConfig};

fn world_with_nodes(count: usize) -> (World, Vec<EntityId>) {
    let mut world = World::new(WorldConfig {
        builtin_systems: false,
        ..WorldConfig::default()
    });
    let ids = (0..count)
        .map(|i| {
            let id = world.spawn().unwrap();
            let transform = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0))
                .with_rotation(Quat::from_rotation_y(i as f32 * 0.01));
            world.insert(id, transform).unwrap();
            id
        })
        .collect();
    (world, ids)
}

/// One root with 10k direct children.
fn bench_wide(c: &mut Criterion) {
    let (mut world, ids) = world_with_nodes(10_001);
    for &child in &ids[1..] {
        world.set_parent(child, Some(ids[0])).unwrap();
    }
    world.propagate_transforms();

    c.bench_function("propagate_wide_root_dirty", |b| {
        b.iter(|| {
            world.get_mut::<Transform>(ids[0]).unwrap().translate(Vec3::Y);
            black_box(world.propagate_transforms())
        });
    });
}

/// A chain 1k deep, dirtied at the top.
fn bench_deep(c: &mut Criterion) {
    let (mut world, ids) = world_with_nodes(1_000);
    for pair in ids.windows(2) {
        world.set_parent(pair[1], Some(pair[0])).unwrap();
    }
    world.propagate_transforms();

    c.bench_function("propagate_deep_chain", |b| {
        b.iter(|| {
            world.get_mut::<Transform>(ids[0]).unwrap().rotate(Quat::from_rotation_y(0.01));
            black_box(world.propagate_transforms())
        });
    });
}

/// 10k roots, nothing dirty.
fn bench_clean(c: &mut Criterion) {
    let (mut world, _) = world_with_nodes(10_000);
    world.propagate_transforms();

    c.bench_function("propagate_clean_10k", |b| {
        b.iter(|| black_box(world.propagate_transforms()));
    });
}

criterion_group!(benches, bench_wide, bench_deep, bench_clean);
criterion_main!(benches);
