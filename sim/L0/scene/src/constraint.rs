//! Constraints: articulation between a body and its parent.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::pose::Pose;

/// Articulation families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConstraintKind {
    /// One rotational DOF about the axis.
    Revolute,
    /// One translational DOF along the axis.
    Prismatic,
    /// Free rotation about the anchor.
    Spherical,
    /// Translation in x/z and rotation about y.
    Planar,
    /// Translation along x, y and z.
    Translational3d,
    /// Translation along x, y, z and rotation about z.
    Universal3d,
}

impl ConstraintKind {
    /// Lower-case name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Revolute => "revolute",
            Self::Prismatic => "prismatic",
            Self::Spherical => "spherical",
            Self::Planar => "planar",
            Self::Translational3d => "translational3d",
            Self::Universal3d => "universal3d",
        }
    }

    /// Whether the constraint maps to exactly one scalar joint.
    #[must_use]
    pub const fn is_single_dof(self) -> bool {
        matches!(self, Self::Revolute | Self::Prismatic)
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Joint range. An inverted range (`min > max`) means unlimited.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Limits {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl Limits {
    /// A limited range `[min, max]`.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// The canonical unlimited encoding.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self { min: 1.0, max: -1.0 }
    }

    /// Whether the range constrains motion.
    #[must_use]
    pub fn is_limited(&self) -> bool {
        self.min <= self.max
    }
}

/// Generalized coordinates read back from the engine after a step,
/// concatenated over the constraint's joint primitives.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintState {
    /// Generalized positions.
    pub positions: Vec<f64>,
    /// Generalized velocities.
    pub velocities: Vec<f64>,
}

/// An articulation owned by a [`Body`](crate::Body).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Constraint {
    /// Unique name within the scene; joint primitives derive their names from it.
    pub name: String,
    /// Articulation family.
    pub kind: ConstraintKind,
    /// Anchor frame relative to the owning body.
    pub pose: Pose,
    /// Axis in the anchor frame (revolute/prismatic only).
    pub axis: Vector3<f64>,
    /// Range; see [`Limits`].
    pub limits: Limits,
    /// Latest engine readings.
    pub state: ConstraintState,
}

impl Constraint {
    /// Create an unlimited constraint about +z at the body origin.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ConstraintKind) -> Self {
        Self {
            name: name.into(),
            kind,
            pose: Pose::identity(),
            axis: Vector3::z(),
            limits: Limits::unlimited(),
            state: ConstraintState::default(),
        }
    }

    /// Set the anchor frame.
    #[must_use]
    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    /// Set the axis.
    #[must_use]
    pub fn with_axis(mut self, axis: Vector3<f64>) -> Self {
        self.axis = axis;
        self
    }

    /// Set the range.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_range_is_unlimited() {
        assert!(!Limits::unlimited().is_limited());
        assert!(!Limits::new(0.5, -0.5).is_limited());
        assert!(Limits::new(-0.5, 0.5).is_limited());
        assert!(Limits::new(0.0, 0.0).is_limited());
    }
}
