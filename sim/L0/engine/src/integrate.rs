//! Semi-implicit Euler step.
//!
//! Gravity accelerates the linear coordinates of free joints and slide
//! joints along their world axis. Velocities are integrated first, then
//! positions: scalar for hinge/slide, exponential map for ball/free.

use nalgebra::{Unit, UnitQuaternion, Vector3};
use sim_binding::JointKind;

use crate::collision::{mj_collision, resolve_penetration};
use crate::data::Data;
use crate::forward::{mj_fwd_position, quat_at};
use crate::model::Model;

/// Advance `data` by one timestep.
pub fn mj_step(model: &Model, data: &mut Data) {
    let h = model.timestep;
    mj_apply_gravity(model, data, h);
    mj_integrate_pos(model, data, h);
    mj_enforce_limits(model, data);
    data.time += h;

    mj_fwd_position(model, data);
    mj_collision(model, data);
    if resolve_penetration(model, data) {
        mj_fwd_position(model, data);
    }
}

fn mj_apply_gravity(model: &Model, data: &mut Data, h: f64) {
    for jnt_id in 0..model.njnt {
        let dof = model.jnt_dof_adr[jnt_id];
        match model.jnt_type[jnt_id] {
            JointKind::Free => {
                for axis in 0..3 {
                    data.qvel[dof + axis] += model.gravity[axis] * h;
                }
            }
            JointKind::Slide => {
                let body = model.jnt_body[jnt_id];
                let world_axis = data.xquat[body] * model.jnt_axis[jnt_id];
                data.qvel[dof] += model.gravity.dot(&world_axis) * h;
            }
            JointKind::Hinge | JointKind::Ball => {}
        }
    }
}

/// Position integration on the joint manifolds.
pub fn mj_integrate_pos(model: &Model, data: &mut Data, h: f64) {
    for jnt_id in 0..model.njnt {
        let qadr = model.jnt_qpos_adr[jnt_id];
        let dof = model.jnt_dof_adr[jnt_id];
        match model.jnt_type[jnt_id] {
            JointKind::Hinge | JointKind::Slide => {
                data.qpos[qadr] += data.qvel[dof] * h;
            }
            JointKind::Ball => {
                let omega = Vector3::new(data.qvel[dof], data.qvel[dof + 1], data.qvel[dof + 2]);
                integrate_quaternion(data.qpos.as_mut_slice(), qadr, &omega, h);
            }
            JointKind::Free => {
                for axis in 0..3 {
                    data.qpos[qadr + axis] += data.qvel[dof + axis] * h;
                }
                let omega =
                    Vector3::new(data.qvel[dof + 3], data.qvel[dof + 4], data.qvel[dof + 5]);
                integrate_quaternion(data.qpos.as_mut_slice(), qadr + 3, &omega, h);
            }
        }
    }
}

fn integrate_quaternion(qpos: &mut [f64], adr: usize, omega: &Vector3<f64>, h: f64) {
    let omega_norm = omega.norm();
    let angle = omega_norm * h;
    if angle <= 1e-10 {
        return;
    }
    let dq = UnitQuaternion::from_axis_angle(&Unit::new_unchecked(omega / omega_norm), angle);
    let q = quat_at(qpos, adr) * dq;
    qpos[adr] = q.w;
    qpos[adr + 1] = q.i;
    qpos[adr + 2] = q.j;
    qpos[adr + 3] = q.k;
}

/// Clamp limited hinge and slide joints into range, stopping motion into
/// the limit.
pub fn mj_enforce_limits(model: &Model, data: &mut Data) {
    for jnt_id in 0..model.njnt {
        if !model.jnt_limited[jnt_id]
            || !matches!(model.jnt_type[jnt_id], JointKind::Hinge | JointKind::Slide)
        {
            continue;
        }
        let (lower, upper) = model.jnt_range[jnt_id];
        let qadr = model.jnt_qpos_adr[jnt_id];
        let dof = model.jnt_dof_adr[jnt_id];
        if data.qpos[qadr] < lower {
            data.qpos[qadr] = lower;
            data.qvel[dof] = data.qvel[dof].max(0.0);
        } else if data.qpos[qadr] > upper {
            data.qpos[qadr] = upper;
            data.qvel[dof] = data.qvel[dof].min(0.0);
        }
    }
}
