//! Constraint adapters.
//!
//! One abstract [`Constraint`] expands into one to four engine joint
//! primitives. Single-primitive kinds keep the constraint name; multi
//! primitive kinds suffix it (`_trans_x`, `_rot_z`, ...) so every primitive
//! can be resolved on its own after bind. Generalized coordinates of a
//! constraint are the concatenation of its primitives' coordinates.

use nalgebra::Vector3;
use sim_scene::{Constraint, ConstraintKind, ConstraintState, Limits};
use smallvec::{SmallVec, smallvec};
use tracing::warn;

use crate::engine::{JointAddress, JointKind};
use crate::error::BindingError;
use crate::resource::{ResourceElement, tags};

/// Minimum axis length accepted before falling back to +z.
const MIN_AXIS_NORM: f64 = 1e-10;

/// One engine joint emitted for a constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct JointPrimitive {
    /// Engine joint name.
    pub name: String,
    /// Engine joint type.
    pub kind: JointKind,
    /// Anchor in the body frame.
    pub pos: Vector3<f64>,
    /// Unit axis in the body frame.
    pub axis: Vector3<f64>,
    /// Range; inverted means unlimited.
    pub limits: Limits,
}

impl JointPrimitive {
    fn new(name: String, kind: JointKind, axis: Vector3<f64>) -> Self {
        Self {
            name,
            kind,
            pos: Vector3::zeros(),
            axis,
            limits: Limits::unlimited(),
        }
    }

    /// Joint element for the composed description.
    #[must_use]
    pub fn to_element(&self) -> ResourceElement {
        let limited = self.limits.is_limited();
        let mut joint = ResourceElement::new(tags::JOINT)
            .with("name", self.name.as_str())
            .with("type", self.kind.as_str())
            .with("pos", self.pos)
            .with("axis", self.axis)
            .with("limited", limited);
        if limited {
            joint.set("range", [self.limits.min, self.limits.max]);
        }
        joint
    }
}

/// Expand a constraint into its joint primitives.
#[must_use]
pub fn expand(constraint: &Constraint) -> SmallVec<[JointPrimitive; 4]> {
    let name = &constraint.name;
    let suffixed = |suffix: &str| format!("{name}_{suffix}");

    match constraint.kind {
        ConstraintKind::Revolute | ConstraintKind::Prismatic => {
            let kind = if constraint.kind == ConstraintKind::Revolute {
                JointKind::Hinge
            } else {
                JointKind::Slide
            };
            let mut primitive = JointPrimitive::new(name.clone(), kind, body_axis(constraint));
            primitive.pos = constraint.pose.position.coords;
            primitive.limits = constraint.limits;
            smallvec![primitive]
        }
        ConstraintKind::Spherical => {
            warn_ignored_limits(constraint);
            let mut primitive = JointPrimitive::new(name.clone(), JointKind::Ball, Vector3::z());
            primitive.pos = constraint.pose.position.coords;
            smallvec![primitive]
        }
        ConstraintKind::Translational3d => {
            warn_ignored_limits(constraint);
            smallvec![
                JointPrimitive::new(suffixed("trans_x"), JointKind::Slide, Vector3::x()),
                JointPrimitive::new(suffixed("trans_y"), JointKind::Slide, Vector3::y()),
                JointPrimitive::new(suffixed("trans_z"), JointKind::Slide, Vector3::z()),
            ]
        }
        ConstraintKind::Universal3d => {
            warn_ignored_limits(constraint);
            smallvec![
                JointPrimitive::new(suffixed("trans_x"), JointKind::Slide, Vector3::x()),
                JointPrimitive::new(suffixed("trans_y"), JointKind::Slide, Vector3::y()),
                JointPrimitive::new(suffixed("trans_z"), JointKind::Slide, Vector3::z()),
                JointPrimitive::new(suffixed("rot_z"), JointKind::Hinge, Vector3::z()),
            ]
        }
        ConstraintKind::Planar => {
            warn_ignored_limits(constraint);
            smallvec![
                JointPrimitive::new(suffixed("trans_x"), JointKind::Slide, Vector3::x()),
                JointPrimitive::new(suffixed("trans_z"), JointKind::Slide, Vector3::z()),
                JointPrimitive::new(suffixed("rot_y"), JointKind::Hinge, Vector3::y()),
            ]
        }
    }
}

fn body_axis(constraint: &Constraint) -> Vector3<f64> {
    let axis = constraint.pose.rotation * constraint.axis;
    let norm = axis.norm();
    if norm < MIN_AXIS_NORM {
        warn!(constraint = %constraint.name, "zero-length axis, using +z");
        return Vector3::z();
    }
    axis / norm
}

fn warn_ignored_limits(constraint: &Constraint) {
    if constraint.limits.is_limited() {
        warn!(
            constraint = %constraint.name,
            kind = %constraint.kind,
            "limits only apply to revolute and prismatic constraints; ignored"
        );
    }
}

/// A resolved engine joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointBinding {
    /// Engine joint index.
    pub id: usize,
    /// Coordinate addresses.
    pub address: JointAddress,
}

impl JointBinding {
    /// Position coordinates of this joint.
    #[must_use]
    pub const fn nq(&self) -> usize {
        self.address.kind.nq()
    }

    /// Velocity coordinates of this joint.
    #[must_use]
    pub const fn nv(&self) -> usize {
        self.address.kind.nv()
    }

    /// Position slice of this joint inside `qpos`.
    #[must_use]
    pub fn positions<'a>(&self, qpos: &'a [f64]) -> Option<&'a [f64]> {
        qpos.get(self.address.qpos_adr..self.address.qpos_adr + self.nq())
    }

    /// Velocity slice of this joint inside `qvel`.
    #[must_use]
    pub fn velocities<'a>(&self, qvel: &'a [f64]) -> Option<&'a [f64]> {
        qvel.get(self.address.dof_adr..self.address.dof_adr + self.nv())
    }

    /// Mutable position slice.
    pub fn positions_mut<'a>(&self, qpos: &'a mut [f64]) -> Option<&'a mut [f64]> {
        qpos.get_mut(self.address.qpos_adr..self.address.qpos_adr + self.nq())
    }

    /// Mutable velocity slice.
    pub fn velocities_mut<'a>(&self, qvel: &'a mut [f64]) -> Option<&'a mut [f64]> {
        qvel.get_mut(self.address.dof_adr..self.address.dof_adr + self.nv())
    }

    /// Zero the velocity and move to the joint's rest position: zero for
    /// hinge/slide, identity for ball. Free joints need a pose and are reset
    /// by their body.
    pub fn reset_to_rest(&self, qpos: &mut [f64], qvel: &mut [f64]) {
        if let Some(q) = self.positions_mut(qpos) {
            match self.address.kind {
                JointKind::Hinge | JointKind::Slide => q.fill(0.0),
                JointKind::Ball => q.copy_from_slice(&[1.0, 0.0, 0.0, 0.0]),
                JointKind::Free => {}
            }
        }
        if let Some(v) = self.velocities_mut(qvel) {
            v.fill(0.0);
        }
    }
}

/// A constraint resolved against the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintBinding {
    /// Constraint name.
    pub name: String,
    /// Constraint kind.
    pub kind: ConstraintKind,
    /// Primitive bindings, in expansion order.
    pub joints: SmallVec<[JointBinding; 4]>,
}

impl ConstraintBinding {
    /// Total position coordinates.
    #[must_use]
    pub fn nq(&self) -> usize {
        self.joints.iter().map(JointBinding::nq).sum()
    }

    /// Total velocity coordinates.
    #[must_use]
    pub fn nv(&self) -> usize {
        self.joints.iter().map(JointBinding::nv).sum()
    }

    /// Reset every primitive independently.
    pub fn reset(&self, qpos: &mut [f64], qvel: &mut [f64]) {
        for joint in &self.joints {
            joint.reset_to_rest(qpos, qvel);
        }
    }

    /// Read concatenated coordinates.
    #[must_use]
    pub fn read(&self, qpos: &[f64], qvel: &[f64]) -> ConstraintState {
        let mut state = ConstraintState {
            positions: Vec::with_capacity(self.nq()),
            velocities: Vec::with_capacity(self.nv()),
        };
        for joint in &self.joints {
            if let Some(q) = joint.positions(qpos) {
                state.positions.extend_from_slice(q);
            }
            if let Some(v) = joint.velocities(qvel) {
                state.velocities.extend_from_slice(v);
            }
        }
        state
    }

    /// Check a position command length.
    pub fn check_positions(&self, values: &[f64]) -> crate::Result<()> {
        if values.len() == self.nq() {
            Ok(())
        } else {
            Err(BindingError::mismatch(
                &self.name,
                format!("{} positions", self.nq()),
                values.len(),
            ))
        }
    }

    /// Check a velocity command length.
    pub fn check_velocities(&self, values: &[f64]) -> crate::Result<()> {
        if values.len() == self.nv() {
            Ok(())
        } else {
            Err(BindingError::mismatch(
                &self.name,
                format!("{} velocities", self.nv()),
                values.len(),
            ))
        }
    }

    /// Write concatenated positions.
    pub fn write_positions(&self, qpos: &mut [f64], values: &[f64]) -> crate::Result<()> {
        self.check_positions(values)?;
        let mut offset = 0;
        for joint in &self.joints {
            let n = joint.nq();
            let dst = joint
                .positions_mut(qpos)
                .ok_or_else(|| {
                    BindingError::mismatch(&self.name, "qpos address in range", "out of range")
                })?;
            dst.copy_from_slice(&values[offset..offset + n]);
            offset += n;
        }
        Ok(())
    }

    /// Write concatenated velocities.
    pub fn write_velocities(&self, qvel: &mut [f64], values: &[f64]) -> crate::Result<()> {
        self.check_velocities(values)?;
        let mut offset = 0;
        for joint in &self.joints {
            let n = joint.nv();
            let dst = joint
                .velocities_mut(qvel)
                .ok_or_else(|| {
                    BindingError::mismatch(&self.name, "qvel address in range", "out of range")
                })?;
            dst.copy_from_slice(&values[offset..offset + n]);
            offset += n;
        }
        Ok(())
    }
}
