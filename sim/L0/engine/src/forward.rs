//! Forward kinematics: body and geom world poses from `qpos`.

use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};
use sim_binding::JointKind;

use crate::data::Data;
use crate::model::Model;

/// Compute body and geom world poses from `qpos`.
///
/// Bodies are stored parent-before-child, so one pass from the root
/// suffices.
pub fn mj_fwd_position(model: &Model, data: &mut Data) {
    data.xpos[0] = Vector3::zeros();
    data.xquat[0] = UnitQuaternion::identity();

    for body_id in 1..model.nbody {
        let parent_id = model.body_parent[body_id];
        let mut pos = data.xpos[parent_id];
        let mut quat = data.xquat[parent_id];

        pos += quat * model.body_pos[body_id];
        quat *= model.body_quat[body_id];

        let jnt_start = model.body_jnt_adr[body_id];
        let jnt_end = jnt_start + model.body_jnt_num[body_id];
        for jnt_id in jnt_start..jnt_end {
            let qpos_adr = model.jnt_qpos_adr[jnt_id];
            match model.jnt_type[jnt_id] {
                JointKind::Hinge => {
                    let angle = data.qpos[qpos_adr];
                    let world_anchor = pos + quat * model.jnt_pos[jnt_id];
                    let world_axis = quat * model.jnt_axis[jnt_id];
                    let rot = Unit::try_new(world_axis, 1e-10).map_or_else(
                        UnitQuaternion::identity,
                        |axis| UnitQuaternion::from_axis_angle(&axis, angle),
                    );
                    quat = rot * quat;
                    pos = world_anchor + rot * (pos - world_anchor);
                }
                JointKind::Slide => {
                    pos += quat * (model.jnt_axis[jnt_id] * data.qpos[qpos_adr]);
                }
                JointKind::Ball => {
                    quat *= quat_at(data.qpos.as_slice(), qpos_adr);
                }
                JointKind::Free => {
                    pos = Vector3::new(
                        data.qpos[qpos_adr],
                        data.qpos[qpos_adr + 1],
                        data.qpos[qpos_adr + 2],
                    );
                    quat = quat_at(data.qpos.as_slice(), qpos_adr + 3);
                }
            }
        }

        data.xpos[body_id] = pos;
        data.xquat[body_id] = quat;
    }

    for geom_id in 0..model.ngeom {
        let body_id = model.geom_body[geom_id];
        data.geom_xpos[geom_id] =
            data.xpos[body_id] + data.xquat[body_id] * model.geom_pos[geom_id];
        data.geom_xquat[geom_id] = data.xquat[body_id] * model.geom_quat[geom_id];
    }
}

/// Unit quaternion stored `[w, x, y, z]` at `adr`.
pub(crate) fn quat_at(qpos: &[f64], adr: usize) -> UnitQuaternion<f64> {
    UnitQuaternion::from_quaternion(Quaternion::new(
        qpos[adr],
        qpos[adr + 1],
        qpos[adr + 2],
        qpos[adr + 3],
    ))
}
