//! Binder lifecycle: build, bind, step, reset, reload.

use std::cell::Cell;
use std::rc::Rc;

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use sim_binding::{
    BindingError, EngineBinder, MeshBlob, Phase, activation_count, is_activated,
};
use sim_conformance_tests::{
    ball, bound, door, fast_config, init_tracing, mixed_scene, tetrahedron, tetrahedron_faces,
};
use sim_engine::ReferenceEngine;
use sim_scene::{Body, Collider, MeshSource, Scene};

fn ball_scene() -> Scene {
    let mut scene = Scene::new("ball");
    scene.add_body(ball()).unwrap();
    scene
}

#[test]
fn reset_returns_free_body_to_start_pose() {
    let mut binder = bound(ball_scene(), fast_config());
    for _ in 0..10 {
        binder.step().unwrap();
    }
    binder
        .set_body_velocity("ball", Vector3::new(1.0, 2.0, 3.0), Vector3::new(0.5, 0.0, 0.0))
        .unwrap();
    binder.step().unwrap();
    assert_eq!(binder.phase(), Phase::Stepping);

    binder.reset().unwrap();

    let free = binder.bindings().unwrap().body("ball").unwrap().free_joint.unwrap();
    let data = binder.data().unwrap();
    assert_eq!(
        free.positions(data.qpos.as_slice()).unwrap(),
        &[2.0, 0.0, 1.5, 1.0, 0.0, 0.0, 0.0]
    );
    assert!(free.velocities(data.qvel.as_slice()).unwrap().iter().all(|&v| v == 0.0));
    assert_eq!(binder.phase(), Phase::Bound);
    let pose = binder.scene().body("ball").unwrap().world_pose;
    assert_relative_eq!(pose.position, Point3::new(2.0, 0.0, 1.5));
}

#[test]
fn failed_bind_can_be_retried_without_reactivation() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mesh_path = dir.path().join("boulder.msh");
    let mut scene = Scene::new("quarry");
    scene
        .add_body(
            Body::dynamic_at("boulder", Point3::new(0.0, 0.0, 1.0)).with_collider(Collider::mesh(
                "boulder_shape",
                MeshSource::File(mesh_path.clone()),
                Vector3::repeat(1.0),
            )),
        )
        .unwrap();

    let mut binder = EngineBinder::new(ReferenceEngine::new(), scene, fast_config()).unwrap();
    binder.build().unwrap();

    let err = binder.bind().unwrap_err();
    assert!(err.is_fatal());
    let BindingError::Compile { diagnostic } = &err else {
        panic!("expected a compile error, got {err}");
    };
    assert!(diagnostic.contains("boulder.msh"));
    assert_eq!(binder.phase(), Phase::Built);
    assert!(binder.model().is_none());
    assert!(binder.step().is_err());

    let blob = MeshBlob::from_parts(&tetrahedron(), &tetrahedron_faces());
    std::fs::write(&mesh_path, blob.encode()).unwrap();

    binder.bind().unwrap();
    assert_eq!(binder.phase(), Phase::Bound);
    assert!(binder.bindings().unwrap().collider("boulder_shape").is_some());
    assert!(is_activated());
    assert_eq!(activation_count(), 1);
}

#[test]
fn operations_respect_phase() {
    init_tracing();
    let mut binder =
        EngineBinder::new(ReferenceEngine::new(), ball_scene(), fast_config()).unwrap();
    assert_eq!(binder.phase(), Phase::Unbuilt);
    assert!(matches!(binder.bind(), Err(BindingError::InvalidPhase { .. })));
    assert!(matches!(binder.step(), Err(BindingError::InvalidPhase { .. })));
    assert!(matches!(
        binder.set_collider_friction("ball_shell", 0.5),
        Err(BindingError::InvalidPhase { .. })
    ));

    binder.build().unwrap();
    binder.build().unwrap();
    binder.bind().unwrap();
    assert!(matches!(binder.build(), Err(BindingError::InvalidPhase { .. })));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let config = fast_config().timestep(-1.0);
    let err = EngineBinder::new(ReferenceEngine::new(), ball_scene(), config).unwrap_err();
    assert!(matches!(err, BindingError::InvalidConfig { .. }));
}

#[test]
fn step_advances_one_frame_and_pulls_poses() {
    let mut binder = bound(ball_scene(), fast_config());
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    binder.on_post_step(move |scene, _| {
        assert!(scene.body("ball").is_some());
        seen.set(seen.get() + 1);
    });

    binder.step().unwrap();
    binder.step().unwrap();

    assert_eq!(calls.get(), 2);
    let time = binder.time().unwrap();
    assert!(time >= 0.1 - 1e-9 && time < 0.1 + 0.011, "time {time}");
    let z = binder.scene().body("ball").unwrap().world_pose.position.z;
    assert!(z < 1.5, "ball should fall, z = {z}");
}

#[test]
fn constraint_state_follows_queued_commands() {
    let mut scene = Scene::new("hall");
    scene.add_body(door()).unwrap();
    let mut binder = bound(scene, fast_config().zero_gravity());

    binder.set_constraint_velocities("door_hinge", vec![1.0]).unwrap();
    binder.step().unwrap();

    let state = &binder.scene().constraint("door_hinge").unwrap().state;
    assert_relative_eq!(state.velocities[0], 1.0);
    let time = binder.time().unwrap();
    assert_relative_eq!(state.positions[0], time, epsilon = 1e-9);

    binder.set_constraint_positions("door_hinge", vec![0.25]).unwrap();
    binder.set_constraint_velocities("door_hinge", vec![0.0]).unwrap();
    binder.step().unwrap();
    let state = &binder.scene().constraint("door_hinge").unwrap().state;
    assert_relative_eq!(state.positions[0], 0.25);
}

#[test]
fn reload_rebinds_from_scratch() {
    let mut binder = bound(mixed_scene(), fast_config());
    binder.step().unwrap();
    assert!(binder.time().unwrap() > 0.0);

    binder.reload().unwrap();
    assert_eq!(binder.phase(), Phase::Bound);
    assert_relative_eq!(binder.time().unwrap(), 0.0);
    assert!(binder.contacts().is_empty());
    assert_eq!(binder.bindings().unwrap().colliders().len(), 4);
}
