//! Scene-to-description builder.
//!
//! Translates a [`Scene`] into one [`ComposedDescription`] plus the
//! [`BindPlan`] that tells the binder which engine names to resolve after
//! compile. Sub-modules handle individual entity kinds; this module defines
//! the [`ResourceBuilder`] that threads shared state (asset deduplication,
//! collider name registry, diagnostics) through them and assembles the
//! final tree.
//!
//! Build never fails as a whole. An entity with missing or inconsistent data
//! is degraded or skipped and reported as a [`BindingError::Build`]
//! diagnostic; the rest of the scene is built normally.

mod body;
mod collider;

use std::collections::BTreeMap;

use hashbrown::HashSet;
use nalgebra::Vector3;
use sim_scene::{ConstraintKind, Pose, Scene, ShapeKind};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::assets::AssetDeduplicator;
use crate::config::BinderConfig;
use crate::constraint::JointPrimitive;
use crate::error::BindingError;
use crate::resource::{ComposedDescription, ResourceElement, tags};
use crate::terrain;

/// A body the binder resolves after compile.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyPlan {
    /// Body name.
    pub name: String,
    /// Name of the synthesized free joint, for floating roots.
    pub free_joint: Option<String>,
    /// World pose the free joint resets to.
    pub start_pose: Pose,
}

/// A collider the binder resolves after compile.
#[derive(Debug, Clone, PartialEq)]
pub struct ColliderPlan {
    /// Collider name.
    pub name: String,
    /// Owning body.
    pub body: String,
    /// Shape kind.
    pub kind: ShapeKind,
    /// Engine geometry names: one, or one per compound part.
    pub geoms: SmallVec<[String; 1]>,
    /// Mesh or heightfield asset the geometry references.
    pub asset: Option<String>,
}

/// A constraint the binder resolves after compile.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintPlan {
    /// Constraint name.
    pub name: String,
    /// Owning body.
    pub body: String,
    /// Constraint kind.
    pub kind: ConstraintKind,
    /// Expanded joint primitives.
    pub primitives: SmallVec<[JointPrimitive; 4]>,
}

/// Terrain slots reserved for one generator.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainPlan {
    /// Generator name.
    pub generator: String,
    /// Slot names, in slot order.
    pub slots: Vec<String>,
}

/// Everything emitted by a build that must be resolved by name at bind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindPlan {
    /// Bodies, in tree traversal order.
    pub bodies: Vec<BodyPlan>,
    /// Colliders, in tree traversal order.
    pub colliders: Vec<ColliderPlan>,
    /// Constraints, in tree traversal order.
    pub constraints: Vec<ConstraintPlan>,
    /// Terrain slots, per generator.
    pub terrain: Vec<TerrainPlan>,
}

/// Result of [`build`].
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// The description to compile.
    pub description: ComposedDescription,
    /// Names to resolve after compile.
    pub plan: BindPlan,
    /// Per-entity build problems, in the order they were found.
    pub diagnostics: Vec<BindingError>,
}

/// Build the composed description for a scene.
#[must_use]
pub fn build(scene: &Scene, config: &BinderConfig) -> BuildOutput {
    let mut builder = ResourceBuilder::new(config);
    let bodies = builder.body_tree(scene);
    let slots = builder.terrain_slots(scene);
    builder.finish(scene.name(), bodies, slots)
}

/// Shared state threaded through the per-entity builders.
pub(crate) struct ResourceBuilder<'a> {
    config: &'a BinderConfig,
    assets: AssetDeduplicator,
    blobs: BTreeMap<String, Vec<u8>>,
    collider_names: HashSet<String>,
    constraint_names: HashSet<String>,
    diagnostics: Vec<BindingError>,
    plan: BindPlan,
}

impl<'a> ResourceBuilder<'a> {
    fn new(config: &'a BinderConfig) -> Self {
        Self {
            config,
            assets: AssetDeduplicator::new(),
            blobs: BTreeMap::new(),
            collider_names: HashSet::new(),
            constraint_names: HashSet::new(),
            diagnostics: Vec::new(),
            plan: BindPlan::default(),
        }
    }

    /// Record a per-entity build problem.
    fn report(&mut self, entity: &str, reason: impl Into<String>) {
        let error = BindingError::build(entity, reason);
        warn!(entity = %entity, "{error}");
        self.diagnostics.push(error);
    }

    fn terrain_slots(&mut self, scene: &Scene) -> Vec<ResourceElement> {
        let capacity = self.config.terrain_pool_capacity;
        let mut elements = Vec::new();
        for generator in scene.terrain_generators() {
            let names: Vec<String> = (0..capacity)
                .map(|i| terrain::slot_name(generator.name(), i))
                .collect();
            elements.extend(
                names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| terrain::slot_element(name, i)),
            );
            debug!(generator = generator.name(), capacity, "reserved terrain slots");
            self.plan.terrain.push(TerrainPlan {
                generator: generator.name().to_owned(),
                slots: names,
            });
        }
        elements
    }

    fn finish(
        self,
        model_name: &str,
        bodies: Vec<ResourceElement>,
        slots: Vec<ResourceElement>,
    ) -> BuildOutput {
        let Self {
            config,
            assets,
            blobs,
            diagnostics,
            plan,
            ..
        } = self;

        let compiler = ResourceElement::new(tags::COMPILER)
            .with("angle", "radian")
            .with("inertiafromgeom", "true");
        let option = ResourceElement::new(tags::OPTION)
            .with("timestep", config.timestep)
            .with("gravity", config.gravity);

        let mut asset = ResourceElement::new(tags::ASSET);
        for element in assets.into_assets() {
            asset.push(element);
        }

        let mut worldbody = ResourceElement::new(tags::WORLDBODY);
        if config.ground_plane {
            worldbody.push(ground_plane());
        }
        for element in bodies.into_iter().chain(slots) {
            worldbody.push(element);
        }

        let root = ResourceElement::new(tags::ROOT)
            .with("model", model_name)
            .with_child(compiler)
            .with_child(option)
            .with_child(asset)
            .with_child(worldbody);

        let mut description = ComposedDescription::new(root);
        for (file, bytes) in blobs {
            description.insert_blob(file, bytes);
        }

        BuildOutput {
            description,
            plan,
            diagnostics,
        }
    }
}

/// Unnamed, infinite ground plane. Contacts with it are not reported.
fn ground_plane() -> ResourceElement {
    ResourceElement::new(tags::GEOM)
        .with("type", "plane")
        .with("size", Vector3::new(0.0, 0.0, 1.0))
        .with("contype", 1_i32)
        .with("conaffinity", 1_i32)
}
