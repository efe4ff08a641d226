//! Contacts resolved to collider names.

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use sim_conformance_tests::{ball, bound, fast_config};
use sim_scene::{Body, Collider, Pose, Scene, ScriptedTerrainGenerator, TerrainPrimitive};

fn settle(binder: &mut sim_binding::EngineBinder<sim_engine::ReferenceEngine>, frames: usize) {
    for _ in 0..frames {
        binder.step().unwrap();
    }
}

#[test]
fn ground_plane_contacts_are_dropped() {
    let mut scene = Scene::new("floor");
    scene.add_body(ball()).unwrap();
    let mut binder = bound(scene, fast_config());
    settle(&mut binder, 40);

    assert!(!binder.data().unwrap().contacts.is_empty());
    assert!(binder.contacts().is_empty());
    let z = binder.scene().body("ball").unwrap().world_pose.position.z;
    assert_relative_eq!(z, 0.25, epsilon = 0.02);
}

#[test]
fn contacts_carry_collider_names() {
    let mut scene = Scene::new("table");
    scene
        .add_body(
            Body::fixed("table", Pose::from_position(Point3::new(0.0, 0.0, 0.5)))
                .with_collider(Collider::sphere("table_top", 0.5)),
        )
        .unwrap();
    scene
        .add_body(
            Body::dynamic_at("marble", Point3::new(0.0, 0.0, 1.5))
                .with_collider(Collider::sphere("marble_shell", 0.25)),
        )
        .unwrap();
    let mut binder = bound(scene, fast_config());
    settle(&mut binder, 20);

    let contact = binder.contacts().first().expect("marble resting on table");
    assert_eq!(contact.collider1, "table_top");
    assert_eq!(contact.collider2, "marble_shell");
    assert_relative_eq!(contact.normal, Vector3::z(), epsilon = 1e-9);
    assert!(contact.depth > 0.0);
    assert_eq!(binder.contacts().len(), 1);
}

#[test]
fn terrain_slots_report_their_slot_name() {
    let mut generator = ScriptedTerrainGenerator::new("ledge");
    generator.spawn(TerrainPrimitive::new(
        Pose::from_position(Point3::new(2.0, 0.0, 0.5)),
        Vector3::new(1.0, 1.0, 0.1),
    ));
    let mut scene = Scene::new("ledge");
    scene.add_body(ball()).unwrap();
    scene.add_terrain_generator(Box::new(generator));
    let mut binder = bound(scene, fast_config().without_ground_plane());
    settle(&mut binder, 20);

    let names: Vec<_> = binder
        .contacts()
        .iter()
        .map(|c| (c.collider1.as_str(), c.collider2.as_str()))
        .collect();
    assert_eq!(names, [("ball_shell", "terrainGen_ledge_0")]);
}
