//! Streamed terrain through the binder.

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use sim_binding::ElementKind;
use sim_binding::terrain::{PARK_HEIGHT, slot_name};
use sim_binding::EngineBinder;
use sim_conformance_tests::{bound, fast_config};
use sim_engine::ReferenceEngine;
use sim_scene::{Pose, Scene, ScriptedTerrainGenerator, TerrainPrimitive};

fn slab(x: f64) -> TerrainPrimitive {
    TerrainPrimitive::new(
        Pose::from_position(Point3::new(x, 0.0, 0.0)),
        Vector3::new(1.0, 1.0, 0.1),
    )
}

#[test]
fn fourth_primitive_evicts_the_oldest() {
    let mut generator = ScriptedTerrainGenerator::new("rocks");
    let ids: Vec<_> = [1.0, 2.0, 3.0, 4.0]
        .into_iter()
        .map(|x| generator.spawn(slab(x)))
        .collect();
    let mut scene = Scene::new("stream");
    scene.add_terrain_generator(Box::new(generator));

    let binder = bound(scene, fast_config().terrain_pool_capacity(3));

    let pool = &binder.bindings().unwrap().pools()[0];
    assert_eq!(pool.capacity(), 3);
    assert_eq!(pool.available_len(), 0);
    assert_eq!(pool.working_occupants(), ids[1..].to_vec());

    let model = binder.model().unwrap();
    let reused = model.name2id(ElementKind::Body, &slot_name("rocks", 0)).unwrap();
    assert_relative_eq!(model.body_pos[reused], Vector3::new(4.0, 0.0, 0.0));
    let geom = model.name2id(ElementKind::Geom, &slot_name("rocks", 0)).unwrap();
    assert_relative_eq!(model.geom_size[geom], Vector3::new(0.5, 0.5, 0.05));
}

#[test]
fn unused_slots_stay_parked() {
    let mut generator = ScriptedTerrainGenerator::new("rocks");
    generator.spawn(slab(1.0));
    let mut scene = Scene::new("stream");
    scene.add_terrain_generator(Box::new(generator));

    let binder = bound(scene, fast_config().terrain_pool_capacity(3));
    let pool = &binder.bindings().unwrap().pools()[0];
    assert_eq!(pool.available_len(), 2);

    let model = binder.model().unwrap();
    for i in 1..3 {
        let body = model.name2id(ElementKind::Body, &slot_name("rocks", i)).unwrap();
        assert!(model.body_pos[body].z >= PARK_HEIGHT);
    }
}

fn step_until(binder: &mut EngineBinder<ReferenceEngine>, time: f64) {
    while binder.time().unwrap() < time {
        binder.step().unwrap();
    }
}

#[test]
fn primitives_stream_in_while_stepping() {
    let mut generator = ScriptedTerrainGenerator::new("rocks");
    let ids: Vec<_> = [(0.0, 1.0), (0.12, 2.0), (0.27, 3.0), (0.42, 4.0)]
        .into_iter()
        .map(|(at, x)| generator.schedule(at, slab(x)))
        .collect();
    let mut scene = Scene::new("stream");
    scene.add_terrain_generator(Box::new(generator));

    let mut binder = bound(scene, fast_config().terrain_pool_capacity(3));
    let working = |binder: &EngineBinder<ReferenceEngine>| {
        binder.bindings().unwrap().pools()[0].working_occupants()
    };
    assert_eq!(working(&binder), ids[..1].to_vec());

    step_until(&mut binder, 0.35);
    assert_eq!(working(&binder), ids[..3].to_vec());

    step_until(&mut binder, 0.5);
    assert_eq!(working(&binder), ids[1..].to_vec());

    let model = binder.model().unwrap();
    let recycled = model.name2id(ElementKind::Body, &slot_name("rocks", 0)).unwrap();
    assert_relative_eq!(model.body_pos[recycled], Vector3::new(4.0, 0.0, 0.0));
}

#[test]
fn dropped_primitive_slot_is_parked_again() {
    let mut generator = ScriptedTerrainGenerator::new("floor");
    let floor = generator.schedule(
        0.0,
        TerrainPrimitive::new(Pose::identity(), Vector3::new(4.0, 4.0, 0.2)),
    );
    generator.schedule_removal(0.07, floor);
    let mut scene = Scene::new("stream");
    scene.add_terrain_generator(Box::new(generator));

    let mut binder = bound(scene, fast_config().terrain_pool_capacity(2));
    let body = binder
        .model()
        .unwrap()
        .name2id(ElementKind::Body, &slot_name("floor", 0))
        .unwrap();
    assert_relative_eq!(binder.model().unwrap().body_pos[body], Vector3::zeros());

    step_until(&mut binder, 0.2);

    let pool = &binder.bindings().unwrap().pools()[0];
    assert!(pool.working_occupants().is_empty());
    assert_eq!(pool.available_len(), 2);

    let model = binder.model().unwrap();
    assert!(model.body_pos[body].z >= PARK_HEIGHT);
    let geom = model.name2id(ElementKind::Geom, &slot_name("floor", 0)).unwrap();
    assert_relative_eq!(model.geom_size[geom], Vector3::new(0.25, 1.0, 0.0125));
}
