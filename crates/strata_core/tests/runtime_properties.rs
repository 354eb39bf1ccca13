//! Integration tests for identity, queries, signals and the transform graph.

use std::sync::Arc;

use parking_lot::Mutex;
use strata_core::ecs::{Active, ComponentStorage, EntityId, IdentityPool, Name, Tag};
use strata_core::signal::{Signal, SubscriptionId};
use strata_core::transform::{Quat, Transform, TransformGraph, Trs, Vec3};
use strata_core::{EcsError, World, WorldConfig};

fn bare_world() -> World {
    World::new(WorldConfig {
        builtin_systems: false,
        ..WorldConfig::default()
    })
}

#[test]
fn test_identity_stays_stale_after_reuse() {
    let pool = IdentityPool::new(16, 1024);
    let mut released = Vec::new();

    for round in 0..5 {
        let ids: Vec<_> = (0..8).map(|_| pool.acquire()).collect();
        for &id in &ids {
            assert!(pool.is_current(id), "round {round}: fresh id must be current");
        }
        for &id in &ids {
            pool.release(id).unwrap();
            released.push(id);
        }
        for &old in &released {
            assert!(!pool.is_current(old), "round {round}: released id revived");
        }
    }

    // Slots were reused, generations moved on.
    assert_eq!(pool.capacity(), 8);
    let stale = released[0];
    assert_eq!(pool.release(stale), Err(EcsError::InvalidEntity(stale)));
}

#[test]
fn test_component_round_trip() {
    let mut world = bare_world();
    let id = world.spawn().unwrap();

    let tag = {
        let mut tag = Tag::new("enemy");
        tag.add("flying");
        tag
    };
    world.insert(id, tag.clone()).unwrap();
    world.insert(id, Name::new("bat")).unwrap();

    assert_eq!(world.get::<Tag>(id), Some(&tag));
    assert_eq!(world.get::<Name>(id), Some(&Name::new("bat")));

    world.destroy(id).unwrap();
    world.commit();
    assert!(world.get::<Tag>(id).is_none());
    assert_eq!(
        world.insert(id, Name::new("ghost")),
        Err(EcsError::InvalidEntity(id))
    );
}

#[test]
fn test_query_matches_exactly_after_interleaving() {
    let mut world = bare_world();
    let ids: Vec<_> = (0..300).map(|_| world.spawn().unwrap()).collect();

    // Deterministic interleaving of attach/detach.
    for (i, &id) in ids.iter().enumerate() {
        if i % 2 == 0 {
            world.insert(id, Name::new(format!("n{i}"))).unwrap();
        }
        if i % 3 == 0 {
            world.insert(id, Active(true)).unwrap();
        }
        if i % 5 == 0 {
            world.remove::<Name>(id).unwrap();
        }
        if i % 7 == 0 {
            world.insert(id, Name::new("late")).unwrap();
        }
    }
    for &id in ids.iter().step_by(11) {
        world.destroy(id).unwrap();
    }
    world.commit();

    let set = world.type_set().with::<Name>().with::<Active>().build();
    let got: Vec<_> = world.for_each_with(&set).collect();
    let expected: Vec<_> = ids
        .iter()
        .copied()
        .filter(|&id| world.is_alive(id) && world.has::<Name>(id) && world.has::<Active>(id))
        .collect();

    assert!(!expected.is_empty());
    assert_eq!(got, expected);
}

#[test]
fn test_query_on_unregistered_type_is_empty() {
    #[derive(Clone, Default)]
    struct NeverUsed;
    impl strata_core::Component for NeverUsed {}

    let mut world = bare_world();
    let id = world.spawn().unwrap();
    world.insert(id, Active(true)).unwrap();

    let set = world.type_set().with::<Active>().with::<NeverUsed>().build();
    assert_eq!(world.for_each_with(&set).count(), 0);

    let all = world.type_set().build();
    assert_eq!(world.for_each_with(&all).collect::<Vec<_>>(), vec![id]);
}

#[test]
fn test_recompute_is_bit_identical() {
    let parent = Trs::new(
        Vec3::new(-2.0, 7.5, 0.25),
        Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 0.9),
        Vec3::new(0.5, 3.0, 1.25),
    );
    let mut node = Transform::from_translation(Vec3::new(0.1, 0.2, 0.3))
        .with_rotation(Quat::from_rotation_z(2.2))
        .with_scale(Vec3::splat(0.7));

    node.recompute(Some(&parent));
    let first = *node.world();
    node.recompute(Some(&parent));
    assert_eq!(
        bytemuck::bytes_of(&first),
        bytemuck::bytes_of(node.world())
    );
}

#[test]
fn test_child_world_position_scenario() {
    let mut world = World::with_defaults();
    let root = world.spawn().unwrap();
    let e = world.spawn().unwrap();
    world.insert(root, Transform::from_translation(Vec3::ZERO)).unwrap();
    world
        .insert(e, Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)))
        .unwrap();
    world.set_parent(e, Some(root)).unwrap();

    world.update(0.016);

    let transform = world.get::<Transform>(e).unwrap();
    assert!(!transform.is_dirty());
    assert_eq!(transform.world_translation(), Vec3::new(1.0, 0.0, 0.0));
    assert_eq!(world.world_transform(e).unwrap().translation, Vec3::new(1.0, 0.0, 0.0));
}

#[test]
fn test_propagation_through_rotated_scaled_parent() {
    let mut world = bare_world();
    let root = world.spawn().unwrap();
    let mid = world.spawn().unwrap();
    let leaf = world.spawn().unwrap();

    world
        .insert(
            root,
            Transform::from_translation(Vec3::new(10.0, 0.0, 0.0))
                .with_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2))
                .with_scale(Vec3::splat(2.0)),
        )
        .unwrap();
    world.insert(mid, Transform::from_translation(Vec3::X)).unwrap();
    world.insert(leaf, Transform::from_translation(Vec3::X)).unwrap();
    world.set_parent(leaf, Some(mid)).unwrap();
    world.set_parent(mid, Some(root)).unwrap();

    assert_eq!(world.propagate_transforms(), 3);

    // root: (10,0,0); mid: 10 + rot90(2,0,0) = (10,2,0); leaf: mid + rot90(2,0,0) = (10,4,0)
    let leaf_world = world.get::<Transform>(leaf).unwrap().world_translation();
    assert!(leaf_world.approx_eq(Vec3::new(10.0, 4.0, 0.0), 1e-5));
    assert_eq!(world.propagate_transforms(), 0);

    world.get_mut::<Transform>(mid).unwrap().translate(Vec3::X);
    assert_eq!(world.propagate_transforms(), 2);
}

#[test]
fn test_cycle_rejected_without_partial_mutation() {
    let mut world = bare_world();
    let ids: Vec<_> = (0..4).map(|_| world.spawn().unwrap()).collect();
    for &id in &ids {
        world.insert(id, Transform::default()).unwrap();
    }
    // b is an ancestor of a: b -> x -> a
    let (b, x, a, other) = (ids[0], ids[1], ids[2], ids[3]);
    world.set_parent(x, Some(b)).unwrap();
    world.set_parent(a, Some(x)).unwrap();
    world.set_parent(other, Some(b)).unwrap();

    let snapshot: Vec<_> = ids
        .iter()
        .map(|&id| world.get::<Transform>(id).cloned().unwrap())
        .collect();

    assert_eq!(
        world.set_parent(b, Some(a)),
        Err(EcsError::CycleDetected { parent: a, child: b })
    );
    assert_eq!(world.set_parent(a, Some(a)), Err(EcsError::SelfParent(a)));

    let after: Vec<_> = ids
        .iter()
        .map(|&id| world.get::<Transform>(id).cloned().unwrap())
        .collect();
    assert_eq!(snapshot, after);
    assert_eq!(world.children(b).collect::<Vec<_>>(), vec![x, other]);
}

#[test]
fn test_graph_detects_cycle_on_raw_storage() {
    let a = EntityId::new(0, 0);
    let b = EntityId::new(1, 0);
    let mut transforms: ComponentStorage<Transform> = ComponentStorage::new(4);
    transforms.set(a.index(), Transform::default());
    transforms.set(b.index(), Transform::default());

    transforms.set_parent(b, Some(a)).unwrap();
    assert!(transforms.is_ancestor(a, b));
    assert!(transforms.set_parent(a, Some(b)).is_err());
}

#[test]
fn test_unsubscribe_inside_dispatch_uses_snapshot() {
    let signal: Arc<Signal<u32>> = Arc::new(Signal::new("x"));
    let calls = Arc::new(Mutex::new(Vec::new()));
    let first_id: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

    let sink = Arc::clone(&calls);
    let first = signal.subscribe(move |event: &u32| sink.lock().push(("first", *event)));
    *first_id.lock() = Some(first);

    let sink = Arc::clone(&calls);
    let target = Arc::clone(&signal);
    let to_remove = Arc::clone(&first_id);
    signal.subscribe(move |event: &u32| {
        sink.lock().push(("second", *event));
        if let Some(id) = to_remove.lock().take() {
            target.unsubscribe(id);
        }
    });

    assert_eq!(signal.dispatch(&1), 2);
    assert_eq!(signal.dispatch(&2), 1);

    assert_eq!(
        *calls.lock(),
        vec![("first", 1), ("second", 1), ("second", 2)]
    );
}

#[test]
fn test_panicking_listener_is_contained() {
    let signal: Signal<u8> = Signal::new("fragile");
    let reached = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&reached);

    signal.subscribe(|_: &u8| panic!("listener bug"));
    signal.subscribe(move |_: &u8| *flag.lock() = true);

    assert_eq!(signal.dispatch(&0), 1);
    assert!(*reached.lock());
}

#[test]
fn test_independent_worlds() {
    #[derive(Clone, Default)]
    struct Marker;
    impl strata_core::Component for Marker {}

    let mut first = bare_world();
    let mut second = bare_world();
    second.register_component::<Active>().unwrap();

    let a = first.spawn().unwrap();
    first.insert(a, Marker).unwrap();
    let b = second.spawn().unwrap();

    assert_eq!(a, b);
    assert!(first.has::<Marker>(a));
    assert!(!second.has::<Marker>(b));
    assert_eq!(first.components().registry().len(), 1);
    assert_eq!(second.components().registry().len(), 1);
}
