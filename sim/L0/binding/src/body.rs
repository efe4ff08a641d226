//! Body adapters.

use nalgebra::{Point3, Vector3};
use sim_scene::Pose;

use crate::constraint::JointBinding;
use crate::error::BindingError;

/// A body resolved against the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyBinding {
    /// Body name.
    pub name: String,
    /// Engine body index.
    pub id: usize,
    /// Synthesized free joint, for floating roots.
    pub free_joint: Option<JointBinding>,
    /// Pose the free joint resets to.
    pub start_pose: Pose,
}

impl BodyBinding {
    /// Move a floating body back to its start pose at rest. Bodies without a
    /// free joint have nothing to reset.
    ///
    /// # Errors
    ///
    /// [`BindingError::RuntimeMismatch`] if the free joint addresses fall
    /// outside the state vectors.
    pub fn reset(&self, qpos: &mut [f64], qvel: &mut [f64]) -> crate::Result<()> {
        if self.free_joint.is_none() {
            return Ok(());
        }
        self.write_pose(qpos, &self.start_pose)?;
        self.write_velocity(qvel, &Vector3::zeros(), &Vector3::zeros())
    }

    fn free_joint(&self) -> crate::Result<&JointBinding> {
        self.free_joint
            .as_ref()
            .ok_or_else(|| BindingError::unsupported(&self.name, "body has no free joint"))
    }

    /// Write position and `w x y z` orientation into the free joint.
    pub fn write_pose(&self, qpos: &mut [f64], pose: &Pose) -> crate::Result<()> {
        let joint = self.free_joint()?;
        let q = joint
            .positions_mut(qpos)
            .ok_or_else(|| {
                BindingError::mismatch(&self.name, "free joint qpos in range", "out of range")
            })?;
        q[..3].copy_from_slice(pose.position.coords.as_slice());
        q[3..].copy_from_slice(&pose.quat_wxyz());
        Ok(())
    }

    /// Write linear then angular velocity into the free joint.
    pub fn write_velocity(
        &self,
        qvel: &mut [f64],
        linear: &Vector3<f64>,
        angular: &Vector3<f64>,
    ) -> crate::Result<()> {
        let joint = self.free_joint()?;
        let v = joint
            .velocities_mut(qvel)
            .ok_or_else(|| {
                BindingError::mismatch(&self.name, "free joint qvel in range", "out of range")
            })?;
        v[..3].copy_from_slice(linear.as_slice());
        v[3..].copy_from_slice(angular.as_slice());
        Ok(())
    }

    /// World pose from the engine's body arrays.
    #[must_use]
    pub fn world_pose(
        &self,
        xpos: &[Vector3<f64>],
        xquat: &[nalgebra::UnitQuaternion<f64>],
    ) -> Option<Pose> {
        let position = xpos.get(self.id)?;
        let rotation = xquat.get(self.id)?;
        Some(Pose::from_position_rotation(Point3::from(*position), *rotation))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::engine::{JointAddress, JointKind};
    use nalgebra::UnitQuaternion;

    fn floating() -> BodyBinding {
        BodyBinding {
            name: "ball".into(),
            id: 1,
            free_joint: Some(JointBinding {
                id: 0,
                address: JointAddress {
                    kind: JointKind::Free,
                    qpos_adr: 0,
                    dof_adr: 0,
                },
            }),
            start_pose: Pose::from_position(Point3::new(2.0, 0.0, 1.5)),
        }
    }

    #[test]
    fn reset_restores_start_pose_at_rest() {
        let body = floating();
        let mut qpos = vec![9.0; 7];
        let mut qvel = vec![9.0; 6];
        body.reset(&mut qpos, &mut qvel).unwrap();

        assert_eq!(qpos, vec![2.0, 0.0, 1.5, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(qvel, vec![0.0; 6]);
    }

    #[test]
    fn reset_with_short_state_is_a_mismatch() {
        let body = floating();
        let err = body.reset(&mut [0.0; 3], &mut [0.0; 6]).unwrap_err();
        assert!(matches!(err, BindingError::RuntimeMismatch { .. }));

        let fixed = BodyBinding {
            free_joint: None,
            ..floating()
        };
        assert!(fixed.reset(&mut [], &mut []).is_ok());
    }

    #[test]
    fn fixed_body_rejects_pose_commands() {
        let body = BodyBinding {
            free_joint: None,
            ..floating()
        };
        let err = body.write_pose(&mut [0.0; 7], &Pose::identity()).unwrap_err();
        assert!(matches!(err, BindingError::UnsupportedOperation { .. }));
    }

    #[test]
    fn world_pose_reads_by_index() {
        let body = floating();
        let xpos = [Vector3::zeros(), Vector3::new(1.0, 2.0, 3.0)];
        let xquat = [UnitQuaternion::identity(); 2];

        let pose = body.world_pose(&xpos, &xquat).unwrap();
        assert_eq!(pose.position, Point3::new(1.0, 2.0, 3.0));
        assert!(body.world_pose(&xpos[..1], &xquat[..1]).is_none());
    }
}
