//! Field mutation between steps.

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use sim_binding::{BindingError, ElementKind, EngineBinder};
use sim_conformance_tests::{bound, fast_config, mixed_scene, tetrahedron};
use sim_engine::ReferenceEngine;
use sim_scene::{Body, Constraint, ConstraintKind, Limits, Pose, Scene};

fn mixed() -> EngineBinder<ReferenceEngine> {
    bound(mixed_scene(), fast_config())
}

fn geom(binder: &EngineBinder<ReferenceEngine>, name: &str) -> usize {
    binder
        .model()
        .unwrap()
        .name2id(ElementKind::Geom, name)
        .unwrap()
}

fn hills_samples(binder: &EngineBinder<ReferenceEngine>) -> Vec<f64> {
    let model = binder.model().unwrap();
    let id = model.name2id(ElementKind::Hfield, "hills_asset").unwrap();
    let adr = model.hfield_adr[id];
    model.hfield_data[adr..adr + 4].to_vec()
}

#[test]
fn elevation_length_mismatch_keeps_previous_samples() {
    let mut binder = mixed();
    let before = hills_samples(&binder);

    let err = binder
        .set_collider_elevation("hills", &[1.0, 2.0, 3.0])
        .unwrap_err();
    assert!(matches!(err, BindingError::RuntimeMismatch { .. }));
    assert_eq!(hills_samples(&binder), before);

    binder
        .set_collider_elevation("hills", &[4.0, 4.0, 4.0, 8.0])
        .unwrap();
    assert_eq!(hills_samples(&binder), vec![0.5, 0.5, 0.5, 1.0]);
}

#[test]
fn wrong_shape_kinds_are_unsupported() {
    let mut binder = mixed();
    assert!(matches!(
        binder.set_collider_elevation("ball_shell", &[0.0; 4]),
        Err(BindingError::UnsupportedOperation { .. })
    ));
    assert!(matches!(
        binder.set_collider_mesh_vertices("hills", &tetrahedron()),
        Err(BindingError::UnsupportedOperation { .. })
    ));
    assert!(matches!(
        binder.set_collider_elevation("nonexistent", &[0.0; 4]),
        Err(BindingError::UnknownEntity { .. })
    ));
}

#[test]
fn mesh_topology_is_fixed() {
    let mut binder = mixed();
    let err = binder
        .set_collider_mesh_vertices("rock", &tetrahedron()[..3])
        .unwrap_err();
    assert!(matches!(err, BindingError::UnsupportedOperation { .. }));

    let lifted: Vec<_> = tetrahedron()
        .into_iter()
        .map(|v| v + Vector3::new(0.0, 0.0, 1.0))
        .collect();
    binder.set_collider_mesh_vertices("rock", &lifted).unwrap();
    let model = binder.model().unwrap();
    let mesh = model.name2id(ElementKind::Mesh, "rock_asset").unwrap();
    let adr = model.mesh_vert_adr[mesh];
    assert_relative_eq!(model.mesh_vert[adr], Vector3::new(0.0, 0.0, 1.0));
}

#[test]
fn mesh_resize_rescales_vertices() {
    let mut binder = mixed();
    binder
        .set_collider_size("rock", Vector3::new(2.0, 3.0, 4.0))
        .unwrap();

    let model = binder.model().unwrap();
    let mesh = model.name2id(ElementKind::Mesh, "rock_asset").unwrap();
    let adr = model.mesh_vert_adr[mesh];
    assert_relative_eq!(model.mesh_vert[adr + 1], Vector3::new(2.0, 0.0, 0.0));
    assert_relative_eq!(model.mesh_vert[adr + 3], Vector3::new(0.0, 0.0, 4.0));
    assert_relative_eq!(
        model.geom_rbound[geom(&binder, "rock")],
        0.5 * Vector3::new(2.0, 3.0, 4.0).norm()
    );
    assert_relative_eq!(
        binder.scene().collider("rock").unwrap().size,
        Vector3::new(2.0, 3.0, 4.0)
    );
}

#[test]
fn primitive_resize_and_filters() {
    let mut binder = mixed();
    binder
        .set_collider_size("ball_shell", Vector3::repeat(0.5))
        .unwrap();
    binder.set_collider_group("ball_shell", 2).unwrap();
    binder.set_collider_mask("ball_shell", 6).unwrap();
    binder.set_collider_friction("ball_shell", 0.3).unwrap();

    let g = geom(&binder, "ball_shell");
    let model = binder.model().unwrap();
    assert_relative_eq!(model.geom_size[g].x, 0.5);
    assert_relative_eq!(model.geom_rbound[g], 0.5);
    assert_eq!((model.geom_contype[g], model.geom_conaffinity[g]), (2, 6));
    assert_relative_eq!(model.geom_friction[g], Vector3::new(0.3, 0.005, 0.0001));

    assert!(binder.set_collider_friction("ball_shell", -1.0).is_err());
    assert!(binder
        .set_collider_size("ball_shell", Vector3::new(-1.0, 0.0, 0.0))
        .is_err());
    let model = binder.model().unwrap();
    assert_relative_eq!(model.geom_size[g].x, 0.5);
    assert_relative_eq!(model.geom_friction[g].x, 0.3);
}

#[test]
fn constraint_commands_are_validated() {
    let mut binder = mixed();
    assert!(matches!(
        binder.set_constraint_positions("door_hinge", vec![1.0, 2.0]),
        Err(BindingError::RuntimeMismatch { .. })
    ));
    assert!(matches!(
        binder.set_constraint_velocities("door_hinge", vec![]),
        Err(BindingError::RuntimeMismatch { .. })
    ));

    binder
        .set_constraint_limits("door_hinge", Limits::new(-0.5, 0.5))
        .unwrap();
    let model = binder.model().unwrap();
    let joint = model.name2id(ElementKind::Joint, "door_hinge").unwrap();
    assert!(model.jnt_limited[joint]);
    assert_eq!(model.jnt_range[joint], (-0.5, 0.5));

    binder.set_constraint_velocities("door_hinge", vec![100.0]).unwrap();
    binder.step().unwrap();
    let state = &binder.scene().constraint("door_hinge").unwrap().state;
    assert_relative_eq!(state.positions[0], 0.5);
}

#[test]
fn multi_primitive_limits_are_unsupported() {
    let mut scene = Scene::new("slider");
    scene
        .add_body(
            Body::dynamic_at("puck", Point3::new(0.0, 0.0, 1.0))
                .with_constraint(Constraint::new("puck_plane", ConstraintKind::Planar)),
        )
        .unwrap();
    let mut binder = bound(scene, fast_config());

    assert!(matches!(
        binder.set_constraint_limits("puck_plane", Limits::new(-1.0, 1.0)),
        Err(BindingError::UnsupportedOperation { .. })
    ));
    assert_eq!(
        binder.bindings().unwrap().constraint("puck_plane").unwrap().nq(),
        3
    );
}

#[test]
fn body_commands_need_a_free_joint() {
    let mut binder = mixed();
    assert!(matches!(
        binder.set_body_pose("door", Pose::identity()),
        Err(BindingError::UnsupportedOperation { .. })
    ));
    assert!(matches!(
        binder.set_body_velocity("landscape", Vector3::zeros(), Vector3::zeros()),
        Err(BindingError::UnsupportedOperation { .. })
    ));

    binder
        .set_body_pose("ball", Pose::from_position(Point3::new(0.0, -5.0, 3.0)))
        .unwrap();
    binder.step().unwrap();
    let position = binder.scene().body("ball").unwrap().world_pose.position;
    assert_relative_eq!(position.y, -5.0);
    assert!(position.z < 3.0 && position.z > 2.9);
}
