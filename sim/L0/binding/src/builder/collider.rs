//! Collider geometry and asset synthesis.

use nalgebra::{Point3, Vector3};
use sim_scene::{
    Body, Collider, CompoundPart, EPS, HeightfieldData, MeshSource, Pose, Shape, ShapeKind,
};
use smallvec::{SmallVec, smallvec};
use tracing::warn;

use super::{ColliderPlan, ResourceBuilder};
use crate::mesh_blob::MeshBlob;
use crate::resource::{ResourceElement, tags};
use crate::shape::{
    engine_size, geom_kind, heightfield_asset_size, is_valid_size, normalize_heights,
    placeholder_faces, placeholder_vertices, primitive_volume,
};

/// Name of the asset synthesized for an inline or generated resource.
fn asset_name(collider: &str) -> String {
    format!("{collider}_asset")
}

/// File name of the mesh blob synthesized for a collider.
fn blob_file(collider: &str) -> String {
    format!("{collider}.msh")
}

impl ResourceBuilder<'_> {
    /// Geometry elements for one collider. Empty if the collider is skipped.
    pub(super) fn collider(
        &mut self,
        body: &Body,
        collider: &Collider,
        fallback_mass: Option<f64>,
    ) -> Vec<ResourceElement> {
        if !self.collider_names.insert(collider.name.clone()) {
            self.report(&collider.name, "duplicate collider name");
            return Vec::new();
        }
        let kind = collider.kind();
        if !is_valid_size(kind, &collider.size) {
            self.report(
                &collider.name,
                format!("invalid {kind} size {:?}", collider.size.as_slice()),
            );
            return Vec::new();
        }

        let (geoms, names, asset) = match &collider.shape {
            Shape::Compound(parts) => {
                let (geoms, names) = compound(collider, parts, fallback_mass);
                if names.is_empty() {
                    self.report(&collider.name, "compound has no primitive parts");
                    return Vec::new();
                }
                (geoms, names, None)
            }
            Shape::Mesh(source) => {
                let Some(asset) = self.mesh_asset(collider, source) else {
                    return Vec::new();
                };
                let mut geom = geom(
                    &collider.name,
                    kind,
                    &collider.size,
                    &collider.pose,
                    collider,
                    fallback_mass,
                );
                geom.set("mesh", asset.as_str());
                (vec![geom], smallvec![collider.name.clone()], Some(asset))
            }
            Shape::Heightfield(data) => {
                let Some(asset) = self.heightfield_asset(collider, data) else {
                    return Vec::new();
                };
                let mut geom = geom(
                    &collider.name,
                    kind,
                    &collider.size,
                    &collider.pose,
                    collider,
                    fallback_mass,
                );
                geom.set("hfield", asset.as_str());
                (vec![geom], smallvec![collider.name.clone()], Some(asset))
            }
            Shape::Box
            | Shape::Sphere
            | Shape::Capsule
            | Shape::Cylinder
            | Shape::Ellipsoid
            | Shape::Plane => {
                let geom = geom(
                    &collider.name,
                    kind,
                    &collider.size,
                    &collider.pose,
                    collider,
                    fallback_mass,
                );
                (vec![geom], smallvec![collider.name.clone()], None)
            }
        };

        self.plan.colliders.push(ColliderPlan {
            name: collider.name.clone(),
            body: body.name.clone(),
            kind,
            geoms: names,
            asset,
        });
        geoms
    }

    /// Offer the mesh asset and return its name.
    fn mesh_asset(&mut self, collider: &Collider, source: &MeshSource) -> Option<String> {
        let (name, file) = match source {
            MeshSource::File(path) => {
                let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned())
                else {
                    self.report(
                        &collider.name,
                        format!("mesh path {} has no file name", path.display()),
                    );
                    return None;
                };
                (stem, path.to_string_lossy().into_owned())
            }
            MeshSource::Inline { vertices, faces } => {
                if let Some(reason) = inline_mesh_problem(vertices, faces) {
                    self.report(&collider.name, reason);
                    return None;
                }
                self.mesh_blob(collider, vertices, faces)
            }
            MeshSource::Missing => {
                warn!(
                    collider = %collider.name,
                    "no mesh data, substituting placeholder tetrahedron"
                );
                self.mesh_blob(collider, &placeholder_vertices(), &placeholder_faces())
            }
        };

        self.assets.offer(
            ResourceElement::new(tags::MESH)
                .with("name", name.as_str())
                .with("file", file)
                .with("scale", collider.size),
        );
        Some(name)
    }

    fn mesh_blob(
        &mut self,
        collider: &Collider,
        vertices: &[Point3<f64>],
        faces: &[[u32; 3]],
    ) -> (String, String) {
        let file = blob_file(&collider.name);
        self.blobs
            .insert(file.clone(), MeshBlob::from_parts(vertices, faces).encode());
        (asset_name(&collider.name), file)
    }

    /// Offer the heightfield asset and return its name. Samples are written
    /// into the engine at bind time.
    fn heightfield_asset(&mut self, collider: &Collider, data: &HeightfieldData) -> Option<String> {
        if !data.is_consistent() {
            self.report(
                &collider.name,
                format!(
                    "heightfield grid {}x{} does not match {} samples",
                    data.depth_samples,
                    data.width_samples,
                    data.heights.len()
                ),
            );
            return None;
        }

        let normalized = normalize_heights(&data.heights);
        let size = heightfield_asset_size(
            &collider.size,
            normalized.max_height,
            self.config.hfield_base_depth,
        );
        let name = asset_name(&collider.name);
        self.assets.offer(
            ResourceElement::new(tags::HFIELD)
                .with("name", name.as_str())
                .with("nrow", data.depth_samples)
                .with("ncol", data.width_samples)
                .with("size", size),
        );
        Some(name)
    }
}

fn inline_mesh_problem(vertices: &[Point3<f64>], faces: &[[u32; 3]]) -> Option<String> {
    if vertices.is_empty() || faces.is_empty() {
        return Some("inline mesh needs vertices and faces".to_owned());
    }
    faces
        .iter()
        .flatten()
        .find(|&&i| i as usize >= vertices.len())
        .map(|i| format!("face index {i} out of range for {} vertices", vertices.len()))
}

/// Geometry elements for the valid primitive parts of a compound.
fn compound(
    collider: &Collider,
    parts: &[CompoundPart],
    fallback_mass: Option<f64>,
) -> (Vec<ResourceElement>, SmallVec<[String; 1]>) {
    let mut geoms = Vec::with_capacity(parts.len());
    let mut names = SmallVec::new();
    for (i, part) in parts.iter().enumerate() {
        let kind = part.shape.kind();
        if !kind.is_primitive() {
            warn!(
                collider = %collider.name,
                part = i,
                kind = %kind,
                "compound part is not a primitive, skipped"
            );
            continue;
        }
        if !is_valid_size(kind, &part.size) {
            warn!(
                collider = %collider.name,
                part = i,
                "compound part has an invalid size, skipped"
            );
            continue;
        }
        let name = format!("{}_{i}", collider.name);
        let pose = collider.pose.compose(&part.pose);
        geoms.push(geom(&name, kind, &part.size, &pose, collider, fallback_mass));
        names.push(name);
    }
    (geoms, names)
}

fn geom(
    name: &str,
    kind: ShapeKind,
    size: &Vector3<f64>,
    pose: &Pose,
    collider: &Collider,
    fallback_mass: Option<f64>,
) -> ResourceElement {
    let mut geom = ResourceElement::new(tags::GEOM)
        .with("name", name)
        .with("pos", pose.position.coords)
        .with("quat", pose.quat_wxyz())
        .with("size", engine_size(kind, size).as_slice())
        .with("contype", collider.collision_group)
        .with("conaffinity", collider.collision_mask)
        .with("friction", collider.friction);
    if let Some(engine_kind) = geom_kind(kind) {
        geom.set("type", engine_kind.as_str());
    }

    if let Some(density) = collider.density {
        geom.set("density", density);
    } else if let Some(mass) = fallback_mass {
        match primitive_volume(kind, size) {
            Some(volume) if volume > EPS => {
                geom.set("density", mass / volume);
            }
            _ => warn!(collider = %collider.name, "can't compute inertia of {kind}-collider"),
        }
    }
    geom
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::config::BinderConfig;
    use crate::error::BindingError;
    use sim_scene::{Inertia, Scene};

    fn scene_with(collider: Collider) -> Scene {
        let mut scene = Scene::new("s");
        scene
            .add_body(Body::dynamic_at("b", Point3::origin()).with_collider(collider))
            .unwrap();
        scene
    }

    #[test]
    fn primitive_sizes_are_converted() {
        let out = build(
            &scene_with(Collider::cuboid("box", 2.0, 4.0, 6.0)),
            &BinderConfig::default(),
        );
        let geom = out.description.worldbody().unwrap().find(tags::GEOM, "box").unwrap();
        assert_eq!(geom.text("type"), Some("box"));
        assert_eq!(geom.reals("size"), Some(vec![1.0, 2.0, 3.0]));

        let out = build(
            &scene_with(Collider::capsule("cap", 1.0, 10.0)),
            &BinderConfig::default(),
        );
        let geom = out.description.worldbody().unwrap().find(tags::GEOM, "cap").unwrap();
        assert_eq!(geom.reals("size"), Some(vec![1.0, 5.0]));
    }

    #[test]
    fn heightfield_asset_carries_grid_and_size() {
        let data = HeightfieldData::new(2, 2, vec![0.0, 2.0, 8.0, -1.0]);
        let collider = Collider::heightfield("hf", data, Vector3::new(10.0, 20.0, 0.5));
        let out = build(&scene_with(collider), &BinderConfig::default());

        let asset = &out.description.assets()[0];
        assert_eq!(asset.name(), Some("hf_asset"));
        assert_eq!(asset.int("nrow"), Some(2));
        assert_eq!(asset.int("ncol"), Some(2));
        assert_eq!(asset.reals("size"), Some(vec![5.0, 10.0, 4.0, 1.0]));
        let geom = out.description.worldbody().unwrap().find(tags::GEOM, "hf").unwrap();
        assert_eq!(geom.text("hfield"), Some("hf_asset"));
    }

    #[test]
    fn inconsistent_heightfield_is_skipped() {
        let data = HeightfieldData::new(3, 3, vec![0.0; 4]);
        let collider = Collider::heightfield("hf", data, Vector3::new(1.0, 1.0, 1.0));
        let out = build(&scene_with(collider), &BinderConfig::default());

        assert!(matches!(out.diagnostics[0], BindingError::Build { .. }));
        assert!(out.plan.colliders.is_empty());
        assert!(out.description.assets().is_empty());
    }

    #[test]
    fn mesh_file_uses_stem() {
        let collider = Collider::mesh(
            "rock",
            MeshSource::File("data/meshes/boulder.stl".into()),
            Vector3::new(1.0, 2.0, 1.0),
        );
        let out = build(&scene_with(collider), &BinderConfig::default());

        let asset = &out.description.assets()[0];
        assert_eq!(asset.name(), Some("boulder"));
        assert_eq!(asset.text("file"), Some("data/meshes/boulder.stl"));
        assert_eq!(asset.reals("scale"), Some(vec![1.0, 2.0, 1.0]));
        assert!(out.description.blobs().is_empty());
    }

    #[test]
    fn missing_mesh_gets_placeholder_blob() {
        let collider = Collider::mesh("ghost", MeshSource::Missing, Vector3::repeat(1.0));
        let out = build(&scene_with(collider), &BinderConfig::default());

        assert!(out.diagnostics.is_empty());
        let asset = &out.description.assets()[0];
        assert_eq!(asset.name(), Some("ghost_asset"));
        assert_eq!(asset.text("file"), Some("ghost.msh"));
        let blob = MeshBlob::decode(out.description.blob("ghost.msh").unwrap()).unwrap();
        assert_eq!(blob.vertices.len(), 4);
        assert_eq!(blob.faces.len(), 4);
    }

    #[test]
    fn inline_mesh_with_bad_face_is_skipped() {
        let source = MeshSource::Inline {
            vertices: vec![
                Point3::origin(),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            faces: vec![[0, 1, 5]],
        };
        let collider = Collider::mesh("bad", source, Vector3::repeat(1.0));
        let out = build(&scene_with(collider), &BinderConfig::default());

        assert_eq!(out.diagnostics.len(), 1);
        assert!(out.description.blobs().is_empty());
    }

    #[test]
    fn compound_parts_become_named_geoms() {
        let parts = vec![
            CompoundPart {
                shape: Shape::Box,
                size: Vector3::new(1.0, 1.0, 1.0),
                pose: Pose::from_position(Point3::new(0.0, 0.0, 1.0)),
            },
            CompoundPart {
                shape: Shape::Plane,
                size: Vector3::zeros(),
                pose: Pose::identity(),
            },
            CompoundPart {
                shape: Shape::Sphere,
                size: Vector3::new(0.5, 0.0, 0.0),
                pose: Pose::identity(),
            },
        ];
        let collider = Collider::new("c", Shape::Compound(parts), Vector3::zeros())
            .with_pose(Pose::from_position(Point3::new(1.0, 0.0, 0.0)));
        let out = build(&scene_with(collider), &BinderConfig::default());

        let plan = &out.plan.colliders[0];
        assert_eq!(plan.geoms.as_slice(), &["c_0".to_owned(), "c_2".to_owned()]);
        let world = out.description.worldbody().unwrap();
        assert_eq!(world.find(tags::GEOM, "c_0").unwrap().reals("pos"), Some(vec![1.0, 0.0, 1.0]));
        assert!(world.find(tags::GEOM, "c_1").is_none());
    }

    #[test]
    fn compound_without_primitives_is_a_build_error() {
        let parts = vec![CompoundPart {
            shape: Shape::Mesh(MeshSource::Missing),
            size: Vector3::repeat(1.0),
            pose: Pose::identity(),
        }];
        let collider = Collider::new("c", Shape::Compound(parts), Vector3::zeros());
        let out = build(&scene_with(collider), &BinderConfig::default());

        assert_eq!(out.diagnostics[0].entity(), Some("c"));
        assert!(out.plan.colliders.is_empty());
    }

    #[test]
    fn mass_only_compound_parts_use_their_own_volume() {
        let part = |z: f64| CompoundPart {
            shape: Shape::Box,
            size: Vector3::new(1.0, 1.0, z),
            pose: Pose::identity(),
        };
        let parts = vec![part(2.0), part(4.0)];
        let collider = Collider::new("c", Shape::Compound(parts), Vector3::zeros());
        let mut scene = Scene::new("s");
        scene
            .add_body(
                Body::dynamic_at("b", Point3::origin())
                    .with_inertia(Inertia::from_mass(8.0))
                    .with_collider(collider),
            )
            .unwrap();
        let out = build(&scene, &BinderConfig::default());
        let world = out.description.worldbody().unwrap();

        assert_eq!(world.find(tags::GEOM, "c_0").unwrap().real("density"), Some(4.0));
        assert_eq!(world.find(tags::GEOM, "c_1").unwrap().real("density"), Some(2.0));
    }

    #[test]
    fn mass_only_body_skips_density_on_meshes() {
        let mut scene = Scene::new("s");
        scene
            .add_body(
                Body::dynamic_at("b", Point3::origin())
                    .with_inertia(Inertia::from_mass(1.0))
                    .with_collider(Collider::sphere("ball", 1.0))
                    .with_collider(Collider::mesh("m", MeshSource::Missing, Vector3::repeat(1.0))),
            )
            .unwrap();
        let out = build(&scene, &BinderConfig::default());
        let world = out.description.worldbody().unwrap();

        assert!(world.find(tags::GEOM, "ball").unwrap().real("density").is_some());
        assert!(world.find(tags::GEOM, "m").unwrap().attr("density").is_none());
    }
}
