//! A name that fails to resolve leaves only its own entity unbound, and
//! every resolved entity maps to exactly its own engine indices.

use nalgebra::{Point3, Vector3};
use sim_binding::{
    BinderConfig, BindingError, BindingTable, ElementKind, GeomKind, JointKind, PhysicsEngine,
    build,
};
use sim_conformance_tests::{bound, fast_config, init_tracing, mixed_scene};
use sim_engine::ReferenceEngine;
use sim_scene::{Body, Collider, CompoundPart, MeshSource, Pose, Scene, Shape};

#[test]
fn missing_geometry_unbinds_one_collider() {
    init_tracing();
    let engine = ReferenceEngine::new();
    let mut output = build(&mixed_scene(), &BinderConfig::default());
    let (model, _data) = engine.compile(&output.description).unwrap();

    let ball = output
        .plan
        .colliders
        .iter_mut()
        .find(|c| c.name == "ball_shell")
        .unwrap();
    ball.geoms[0] = "ghost".into();

    let (table, errors) = BindingTable::resolve(&engine, &model, &output.plan);

    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], BindingError::Bind { entity, .. } if entity == "ball_shell"));
    assert!(table.is_unbound("ball_shell"));
    assert!(table.collider("ball_shell").is_none());
    for name in ["door_panel", "hills", "rock"] {
        assert!(table.collider(name).is_some(), "{name} should stay bound");
    }
    assert!(table.body("ball").unwrap().free_joint.is_some());
    assert!(table.constraint("door_hinge").is_some());
}

#[test]
fn joint_type_mismatch_unbinds_the_constraint() {
    init_tracing();
    let engine = ReferenceEngine::new();
    let mut output = build(&mixed_scene(), &BinderConfig::default());
    let (model, _data) = engine.compile(&output.description).unwrap();

    output.plan.constraints[0].primitives[0].kind = JointKind::Slide;
    let (table, errors) = BindingTable::resolve(&engine, &model, &output.plan);

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].entity(), Some("door_hinge"));
    assert!(table.constraint("door_hinge").is_none());
    assert_eq!(table.colliders().len(), 4);
}

#[test]
fn build_problems_stay_with_their_entity() {
    init_tracing();
    let mut scene = mixed_scene();
    scene
        .add_body(
            Body::dynamic_at("orphan", Point3::new(5.0, 5.0, 1.0))
                .with_parent("nobody")
                .with_collider(Collider::sphere("orphan_shell", 0.2)),
        )
        .unwrap();

    let mut binder =
        sim_binding::EngineBinder::new(ReferenceEngine::new(), scene, BinderConfig::default())
            .unwrap();
    let diagnostics = binder.build().unwrap().to_vec();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].entity(), Some("orphan"));
    assert!(!diagnostics[0].is_fatal());

    binder.bind().unwrap();
    let table = binder.bindings().unwrap();
    assert!(table.collider("orphan_shell").is_some());
    assert!(table.body("orphan").unwrap().free_joint.is_none());
}

#[test]
fn compound_binds_one_geometry_per_primitive_part() {
    let parts = vec![
        CompoundPart {
            shape: Shape::Box,
            size: Vector3::new(1.0, 1.0, 0.2),
            pose: Pose::identity(),
        },
        CompoundPart {
            shape: Shape::Mesh(MeshSource::Missing),
            size: Vector3::repeat(1.0),
            pose: Pose::identity(),
        },
        CompoundPart {
            shape: Shape::Sphere,
            size: Vector3::new(0.3, 0.0, 0.0),
            pose: Pose::from_position(Point3::new(0.0, 0.0, 0.5)),
        },
    ];
    let mut scene = Scene::new("lamp");
    scene
        .add_body(
            Body::dynamic_at("lamp", Point3::new(0.0, 0.0, 2.0)).with_collider(Collider::new(
                "lamp_shape",
                Shape::Compound(parts),
                Vector3::zeros(),
            )),
        )
        .unwrap();

    let binder = bound(scene, fast_config());
    let binding = binder.bindings().unwrap().collider("lamp_shape").unwrap();
    let model = binder.model().unwrap();

    let expected: Vec<usize> = ["lamp_shape_0", "lamp_shape_2"]
        .iter()
        .map(|name| model.name2id(ElementKind::Geom, name).unwrap())
        .collect();
    assert_eq!(binding.geoms.as_slice(), expected.as_slice());
    assert_eq!(model.geom_type[expected[0]], GeomKind::Box);
    assert_eq!(model.geom_type[expected[1]], GeomKind::Sphere);
    assert!(binder.diagnostics().is_empty());
}
