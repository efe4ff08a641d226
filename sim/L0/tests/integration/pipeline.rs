//! Scene → description → engine model.

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use sim_binding::{BinderConfig, ElementKind, EngineBinder, build, tags};
use sim_conformance_tests::{bound, fast_config, init_tracing, mixed_scene};
use sim_engine::ReferenceEngine;
use sim_scene::{Body, Collider, MeshSource, Scene};

#[test]
fn sizes_follow_engine_conventions() {
    let mut scene = Scene::new("sizes");
    scene
        .add_body(
            Body::dynamic_at("crate", Point3::new(0.0, 0.0, 5.0))
                .with_collider(Collider::cuboid("crate_box", 2.0, 4.0, 6.0))
                .with_collider(Collider::capsule("crate_handle", 1.0, 10.0)),
        )
        .unwrap();

    let output = build(&scene, &BinderConfig::default());
    let world = output.description.worldbody().unwrap();
    let size = |name: &str| world.find(tags::GEOM, name).unwrap().reals("size").unwrap();
    assert_eq!(size("crate_box"), vec![1.0, 2.0, 3.0]);
    assert_eq!(size("crate_handle"), vec![1.0, 5.0]);
}

#[test]
fn repeated_builds_are_byte_identical() {
    let config = BinderConfig::default();
    let first = build(&mixed_scene(), &config).description.to_xml_string().unwrap();
    let second = build(&mixed_scene(), &config).description.to_xml_string().unwrap();
    assert_eq!(first, second);
    assert!(first.contains("<mujoco"));
}

#[test]
fn shared_mesh_file_is_declared_once() {
    let mut scene = Scene::new("quarry");
    for (i, x) in [0.0, 3.0, 6.0].into_iter().enumerate() {
        scene
            .add_body(
                Body::dynamic_at(format!("boulder_{i}"), Point3::new(x, 0.0, 1.0)).with_collider(
                    Collider::mesh(
                        format!("boulder_{i}_shape"),
                        MeshSource::File("meshes/boulder.msh".into()),
                        Vector3::repeat(1.0),
                    ),
                ),
            )
            .unwrap();
    }

    let output = build(&scene, &BinderConfig::default());
    let names: Vec<_> = output
        .description
        .assets()
        .iter()
        .filter_map(|a| a.name())
        .collect();
    assert_eq!(names, ["boulder"]);
    assert!(output.plan.colliders.iter().all(|c| c.asset.as_deref() == Some("boulder")));
}

#[test]
fn heightfield_samples_are_normalized_in_the_engine() {
    let binder = bound(mixed_scene(), fast_config());
    let model = binder.model().unwrap();

    let hfield = model.name2id(ElementKind::Hfield, "hills_asset").unwrap();
    let adr = model.hfield_adr[hfield];
    assert_eq!(&model.hfield_data[adr..adr + 4], &[0.0, 0.25, 1.0, 0.0]);
    assert_relative_eq!(model.hfield_size[hfield].z, 8.0);
    assert_relative_eq!(model.hfield_size[hfield].x, 5.0);
}

#[test]
fn inline_mesh_reaches_the_engine_through_a_blob() {
    let binder = bound(mixed_scene(), fast_config());
    let description = binder.description().unwrap();
    assert!(description.blob("rock.msh").is_some());

    let model = binder.model().unwrap();
    let mesh = model.name2id(ElementKind::Mesh, "rock_asset").unwrap();
    assert_eq!(model.mesh_vert_num[mesh], 4);
    assert_eq!(model.mesh_face_num[mesh], 4);
}

#[test]
fn dump_writes_description_and_blobs() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.xml");
    let config = fast_config().dump_description(&path);
    let mut binder = EngineBinder::new(ReferenceEngine::new(), mixed_scene(), config).unwrap();
    binder.build().unwrap();

    let xml = std::fs::read_to_string(&path).unwrap();
    assert_eq!(xml, binder.description().unwrap().to_xml_string().unwrap());
    assert!(dir.path().join("rock.msh").exists());
}
