//! Bodies: the rigid links of a scene.

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::collider::Collider;
use crate::constraint::Constraint;
use crate::pose::Pose;

/// Threshold below which mass and inertia terms count as unset.
pub const EPS: f64 = 1e-6;

/// How a body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Dynamics {
    /// Fixed to its parent (or the world).
    Static,
    /// Moved by the engine.
    #[default]
    Dynamic,
}

/// Mass and inertia tensor about the body frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Inertia {
    /// Total mass.
    pub mass: f64,
    /// Moment about x.
    pub ixx: f64,
    /// Moment about y.
    pub iyy: f64,
    /// Moment about z.
    pub izz: f64,
    /// Product xy.
    pub ixy: f64,
    /// Product xz.
    pub ixz: f64,
    /// Product yz.
    pub iyz: f64,
}

impl Inertia {
    /// Mass only; the tensor is derived from collider geometry.
    #[must_use]
    pub const fn from_mass(mass: f64) -> Self {
        Self {
            mass,
            ixx: 0.0,
            iyy: 0.0,
            izz: 0.0,
            ixy: 0.0,
            ixz: 0.0,
            iyz: 0.0,
        }
    }

    /// Mass plus a diagonal tensor.
    #[must_use]
    pub const fn diagonal(mass: f64, ixx: f64, iyy: f64, izz: f64) -> Self {
        Self {
            mass,
            ixx,
            iyy,
            izz,
            ixy: 0.0,
            ixz: 0.0,
            iyz: 0.0,
        }
    }

    /// Whether a mass is given.
    #[must_use]
    pub fn has_mass(&self) -> bool {
        self.mass > EPS
    }

    /// A mass is given but every tensor term is (approximately) zero.
    #[must_use]
    pub fn is_mass_only(&self) -> bool {
        self.has_mass()
            && [self.ixx, self.iyy, self.izz, self.ixy, self.ixz, self.iyz]
                .iter()
                .all(|t| t.abs() <= EPS)
    }

    /// Whether the off-diagonal terms are all zero.
    #[must_use]
    pub fn is_diagonal(&self) -> bool {
        [self.ixy, self.ixz, self.iyz].iter().all(|t| t.abs() <= EPS)
    }
}

/// A rigid link.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Body {
    /// Unique name within the scene.
    pub name: String,
    /// Name of the parent body, `None` for bodies attached to the world.
    pub parent: Option<String>,
    /// Static or dynamic.
    pub dynamics: Dynamics,
    /// Start transform relative to the parent. Reset returns here.
    pub start_pose: Pose,
    /// World transform, refreshed after every step.
    pub world_pose: Pose,
    /// Mass properties.
    pub inertia: Inertia,
    /// Collision geometry.
    pub colliders: Vec<Collider>,
    /// Articulation to the parent.
    pub constraints: Vec<Constraint>,
}

impl Body {
    /// Create a dynamic body with no geometry at the given start pose.
    #[must_use]
    pub fn new(name: impl Into<String>, start_pose: Pose) -> Self {
        Self {
            name: name.into(),
            parent: None,
            dynamics: Dynamics::Dynamic,
            start_pose,
            world_pose: start_pose,
            inertia: Inertia::default(),
            colliders: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Dynamic body at `position` with identity orientation.
    #[must_use]
    pub fn dynamic_at(name: impl Into<String>, position: Point3<f64>) -> Self {
        Self::new(name, Pose::from_position(position))
    }

    /// Static body at the given pose.
    #[must_use]
    pub fn fixed(name: impl Into<String>, pose: Pose) -> Self {
        Self {
            dynamics: Dynamics::Static,
            ..Self::new(name, pose)
        }
    }

    /// Attach to a parent body by name.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set mass properties.
    #[must_use]
    pub fn with_inertia(mut self, inertia: Inertia) -> Self {
        self.inertia = inertia;
        self
    }

    /// Add a collider.
    #[must_use]
    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.colliders.push(collider);
        self
    }

    /// Add a constraint.
    #[must_use]
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Whether the engine should give this body a free joint:
    /// dynamic, attached to the world, no explicit articulation.
    #[must_use]
    pub fn needs_free_joint(&self) -> bool {
        self.dynamics == Dynamics::Dynamic && self.parent.is_none() && self.constraints.is_empty()
    }

    /// Look up a collider by name.
    #[must_use]
    pub fn collider(&self, name: &str) -> Option<&Collider> {
        self.colliders.iter().find(|c| c.name == name)
    }

    /// Look up a constraint by name.
    #[must_use]
    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name == name)
    }
}
