//! Name-to-index binding table.
//!
//! Built once per bind from the [`BindPlan`]: every planned engine name is
//! looked up, type-checked and its addressing metadata cached. After that,
//! nothing is resolved by name again until the next reload. An entity that
//! fails to resolve is left out of the table (and remembered as unbound);
//! the rest of the scene is unaffected.

use hashbrown::{HashMap, HashSet};
use sim_scene::ShapeKind;
use smallvec::SmallVec;
use tracing::warn;

use crate::body::BodyBinding;
use crate::builder::{BindPlan, BodyPlan, ColliderPlan, ConstraintPlan};
use crate::collider::{AssetBinding, ColliderBinding};
use crate::constraint::{ConstraintBinding, JointBinding};
use crate::engine::{ElementKind, JointKind, PhysicsEngine};
use crate::error::BindingError;
use crate::shape::geom_kind;
use crate::terrain::TerrainPool;

/// Resolved bindings for one engine session.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    bodies: Vec<BodyBinding>,
    colliders: Vec<ColliderBinding>,
    constraints: Vec<ConstraintBinding>,
    pools: Vec<TerrainPool>,
    body_index: HashMap<String, usize>,
    collider_index: HashMap<String, usize>,
    constraint_index: HashMap<String, usize>,
    geom_owners: HashMap<usize, String>,
    unbound: HashSet<String>,
}

impl BindingTable {
    /// Resolve every planned entity. Returns the table and one
    /// [`BindingError::Bind`] per entity that could not be resolved.
    pub fn resolve<E: PhysicsEngine>(
        engine: &E,
        model: &E::Model,
        plan: &BindPlan,
    ) -> (Self, Vec<BindingError>) {
        let mut table = Self::default();
        let mut errors = Vec::new();

        for body in &plan.bodies {
            match resolve_body(engine, model, body) {
                Ok(binding) => {
                    table.body_index.insert(binding.name.clone(), table.bodies.len());
                    table.bodies.push(binding);
                }
                Err(error) => table.reject(&body.name, error, &mut errors),
            }
        }

        for collider in &plan.colliders {
            match resolve_collider(engine, model, collider) {
                Ok(binding) => {
                    for &geom in &binding.geoms {
                        table.geom_owners.insert(geom, binding.name.clone());
                    }
                    table
                        .collider_index
                        .insert(binding.name.clone(), table.colliders.len());
                    table.colliders.push(binding);
                }
                Err(error) => table.reject(&collider.name, error, &mut errors),
            }
        }

        for constraint in &plan.constraints {
            match resolve_constraint(engine, model, constraint) {
                Ok(binding) => {
                    table
                        .constraint_index
                        .insert(binding.name.clone(), table.constraints.len());
                    table.constraints.push(binding);
                }
                Err(error) => table.reject(&constraint.name, error, &mut errors),
            }
        }

        for terrain in &plan.terrain {
            let (pool, slot_errors) =
                TerrainPool::resolve(engine, model, &terrain.generator, &terrain.slots);
            for slot in pool.slots() {
                if let Some(geom) = slot.geom {
                    table.geom_owners.insert(geom, slot.name.clone());
                }
            }
            errors.extend(slot_errors);
            table.pools.push(pool);
        }

        (table, errors)
    }

    fn reject(&mut self, name: &str, error: BindingError, errors: &mut Vec<BindingError>) {
        warn!(entity = %name, "{error}");
        self.unbound.insert(name.to_owned());
        errors.push(error);
    }

    /// Bound body by name.
    #[must_use]
    pub fn body(&self, name: &str) -> Option<&BodyBinding> {
        self.body_index.get(name).map(|&i| &self.bodies[i])
    }

    /// Bound collider by name.
    #[must_use]
    pub fn collider(&self, name: &str) -> Option<&ColliderBinding> {
        self.collider_index.get(name).map(|&i| &self.colliders[i])
    }

    /// Bound constraint by name.
    #[must_use]
    pub fn constraint(&self, name: &str) -> Option<&ConstraintBinding> {
        self.constraint_index.get(name).map(|&i| &self.constraints[i])
    }

    /// All bound bodies.
    #[must_use]
    pub fn bodies(&self) -> &[BodyBinding] {
        &self.bodies
    }

    /// All bound colliders.
    #[must_use]
    pub fn colliders(&self) -> &[ColliderBinding] {
        &self.colliders
    }

    /// All bound constraints.
    #[must_use]
    pub fn constraints(&self) -> &[ConstraintBinding] {
        &self.constraints
    }

    /// Terrain pools, one per generator.
    #[must_use]
    pub fn pools(&self) -> &[TerrainPool] {
        &self.pools
    }

    /// Mutable terrain pools.
    pub fn pools_mut(&mut self) -> &mut [TerrainPool] {
        &mut self.pools
    }

    /// Geometry index to collider (or terrain slot) name.
    #[must_use]
    pub fn geom_owners(&self) -> &HashMap<usize, String> {
        &self.geom_owners
    }

    /// Whether `name` was planned but failed to resolve.
    #[must_use]
    pub fn is_unbound(&self, name: &str) -> bool {
        self.unbound.contains(name)
    }

    /// Reset every bound body and constraint to its rest state.
    pub fn reset(&self, qpos: &mut [f64], qvel: &mut [f64]) {
        for body in &self.bodies {
            if let Err(error) = body.reset(qpos, qvel) {
                warn!("body not reset: {error}");
            }
        }
        for constraint in &self.constraints {
            constraint.reset(qpos, qvel);
        }
    }
}

fn lookup<E: PhysicsEngine>(
    engine: &E,
    model: &E::Model,
    kind: ElementKind,
    name: &str,
    entity: &str,
) -> crate::Result<usize> {
    engine
        .name_to_index(model, kind, name)
        .ok_or_else(|| BindingError::bind(entity, format!("{kind:?} '{name}' not found")))
}

fn resolve_joint<E: PhysicsEngine>(
    engine: &E,
    model: &E::Model,
    name: &str,
    expected: JointKind,
    entity: &str,
) -> crate::Result<JointBinding> {
    let id = lookup(engine, model, ElementKind::Joint, name, entity)?;
    let address = engine
        .joint_address(model, id)
        .ok_or_else(|| BindingError::bind(entity, format!("joint '{name}' has no address")))?;
    if address.kind != expected {
        return Err(BindingError::bind(
            entity,
            format!(
                "joint '{name}' is a {}, expected {}",
                address.kind.as_str(),
                expected.as_str()
            ),
        ));
    }
    Ok(JointBinding { id, address })
}

fn resolve_body<E: PhysicsEngine>(
    engine: &E,
    model: &E::Model,
    plan: &BodyPlan,
) -> crate::Result<BodyBinding> {
    let id = lookup(engine, model, ElementKind::Body, &plan.name, &plan.name)?;
    let free_joint = plan
        .free_joint
        .as_deref()
        .map(|joint| resolve_joint(engine, model, joint, JointKind::Free, &plan.name))
        .transpose()?;
    Ok(BodyBinding {
        name: plan.name.clone(),
        id,
        free_joint,
        start_pose: plan.start_pose,
    })
}

fn resolve_collider<E: PhysicsEngine>(
    engine: &E,
    model: &E::Model,
    plan: &ColliderPlan,
) -> crate::Result<ColliderBinding> {
    let expected = geom_kind(plan.kind);
    let mut geoms = SmallVec::new();
    for name in &plan.geoms {
        let geom = lookup(engine, model, ElementKind::Geom, name, &plan.name)?;
        let actual = engine.geom_kind(model, geom);
        let matches = match expected {
            Some(kind) => actual == Some(kind),
            None => actual.is_some(),
        };
        if !matches {
            return Err(BindingError::bind(
                &plan.name,
                format!("geometry '{name}' has an unexpected type {actual:?}"),
            ));
        }
        geoms.push(geom);
    }

    let asset = match (plan.kind, plan.asset.as_deref()) {
        (ShapeKind::Mesh, Some(asset)) => {
            let id = lookup(engine, model, ElementKind::Mesh, asset, &plan.name)?;
            check_data_id(engine, model, &plan.name, &geoms, id)?;
            let address = engine
                .mesh_address(model, id)
                .ok_or_else(|| {
                    BindingError::bind(&plan.name, format!("mesh '{asset}' has no address"))
                })?;
            AssetBinding::Mesh { id, address }
        }
        (ShapeKind::Heightfield, Some(asset)) => {
            let id = lookup(engine, model, ElementKind::Hfield, asset, &plan.name)?;
            check_data_id(engine, model, &plan.name, &geoms, id)?;
            let address = engine
                .hfield_address(model, id)
                .ok_or_else(|| {
                    BindingError::bind(&plan.name, format!("heightfield '{asset}' has no address"))
                })?;
            AssetBinding::Hfield { id, address }
        }
        (ShapeKind::Mesh | ShapeKind::Heightfield, None) => {
            return Err(BindingError::bind(&plan.name, "no asset planned"));
        }
        _ => AssetBinding::None,
    };

    Ok(ColliderBinding {
        name: plan.name.clone(),
        kind: plan.kind,
        geoms,
        asset,
    })
}

fn check_data_id<E: PhysicsEngine>(
    engine: &E,
    model: &E::Model,
    entity: &str,
    geoms: &[usize],
    id: usize,
) -> crate::Result<()> {
    for &geom in geoms {
        if engine.geom_data_id(model, geom) != Some(id) {
            return Err(BindingError::bind(entity, "geometry references a different asset"));
        }
    }
    Ok(())
}

fn resolve_constraint<E: PhysicsEngine>(
    engine: &E,
    model: &E::Model,
    plan: &ConstraintPlan,
) -> crate::Result<ConstraintBinding> {
    let joints = plan
        .primitives
        .iter()
        .map(|p| resolve_joint(engine, model, &p.name, p.kind, &plan.name))
        .collect::<crate::Result<SmallVec<[JointBinding; 4]>>>()?;
    Ok(ConstraintBinding {
        name: plan.name.clone(),
        kind: plan.kind,
        joints,
    })
}
