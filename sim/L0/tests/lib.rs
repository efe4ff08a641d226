//! Shared scenes and helpers for the integration tests.

#![allow(clippy::expect_used, missing_docs)]

use nalgebra::{Point3, Vector3};
use sim_binding::{BinderConfig, EngineBinder};
use sim_engine::ReferenceEngine;
use sim_scene::{
    Body, Collider, Constraint, ConstraintKind, HeightfieldData, MeshSource, Pose, Scene,
};

/// Route `tracing` output through the test harness. Safe to call from every
/// test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Coarse stepping keeps the tests fast.
pub fn fast_config() -> BinderConfig {
    BinderConfig::default().timestep(0.005).frame_duration(0.05)
}

/// A floating ball starting at (2, 0, 1.5).
pub fn ball() -> Body {
    Body::dynamic_at("ball", Point3::new(2.0, 0.0, 1.5))
        .with_collider(Collider::sphere("ball_shell", 0.25))
}

/// A door on a vertical hinge.
pub fn door() -> Body {
    Body::dynamic_at("door", Point3::new(-2.0, 0.0, 1.0))
        .with_constraint(
            Constraint::new("door_hinge", ConstraintKind::Revolute).with_axis(Vector3::z()),
        )
        .with_collider(Collider::cuboid("door_panel", 0.1, 1.0, 2.0))
}

/// Unit tetrahedron vertices.
pub fn tetrahedron() -> Vec<Point3<f64>> {
    vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
    ]
}

/// Faces of [`tetrahedron`].
pub fn tetrahedron_faces() -> Vec<[u32; 3]> {
    vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]]
}

/// Static terrain 10 m off to the side: a 2×2 heightfield and an inline
/// mesh rock.
pub fn landscape() -> Body {
    Body::fixed("landscape", Pose::from_position(Point3::new(0.0, 10.0, 0.0)))
        .with_collider(Collider::heightfield(
            "hills",
            HeightfieldData::new(2, 2, vec![0.0, 2.0, 8.0, -1.0]),
            Vector3::new(10.0, 10.0, 1.0),
        ))
        .with_collider(Collider::mesh(
            "rock",
            MeshSource::Inline {
                vertices: tetrahedron(),
                faces: tetrahedron_faces(),
            },
            Vector3::new(1.0, 1.0, 1.0),
        ))
}

/// Ball, door and landscape together.
pub fn mixed_scene() -> Scene {
    let mut scene = Scene::new("mixed");
    scene.add_body(ball()).expect("unique body");
    scene.add_body(door()).expect("unique body");
    scene.add_body(landscape()).expect("unique body");
    scene
}

/// Build and bind, failing the test on any fatal error.
pub fn bound(scene: Scene, config: BinderConfig) -> EngineBinder<ReferenceEngine> {
    init_tracing();
    let mut binder =
        EngineBinder::new(ReferenceEngine::new(), scene, config).expect("valid config");
    binder.build().expect("build");
    binder.bind().expect("bind");
    binder
}
