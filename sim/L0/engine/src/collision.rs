//! Contact generation and penetration recovery.
//!
//! Every non-plane geom collides as its bounding sphere; planes are
//! half-spaces along their local +z. Pairs on the same body, pairs of two
//! static bodies and pairs rejected by the contype/conaffinity filter are
//! skipped.

use nalgebra::{Matrix3, UnitQuaternion, Vector3};
use sim_binding::{EngineContact, GeomKind};

use crate::data::Data;
use crate::model::Model;

const NORMAL_EPSILON: f64 = 1e-12;

/// Find all contacts at the current poses, replacing `data.contacts`.
pub fn mj_collision(model: &Model, data: &mut Data) {
    data.contacts.clear();
    for geom1 in 0..model.ngeom {
        for geom2 in geom1 + 1..model.ngeom {
            if !can_collide(model, geom1, geom2) {
                continue;
            }
            if let Some(contact) = collide(model, data, geom1, geom2) {
                data.contacts.push(contact);
            }
        }
    }
}

fn can_collide(model: &Model, geom1: usize, geom2: usize) -> bool {
    let (body1, body2) = (model.geom_body[geom1], model.geom_body[geom2]);
    if body1 == body2 || (model.body_static[body1] && model.body_static[body2]) {
        return false;
    }
    model.geom_contype[geom1] & model.geom_conaffinity[geom2] != 0
        || model.geom_contype[geom2] & model.geom_conaffinity[geom1] != 0
}

fn collide(model: &Model, data: &Data, geom1: usize, geom2: usize) -> Option<EngineContact> {
    let hit = match (model.geom_type[geom1], model.geom_type[geom2]) {
        (GeomKind::Plane, GeomKind::Plane) => None,
        (GeomKind::Plane, _) => plane_sphere(
            &data.geom_xpos[geom1],
            &data.geom_xquat[geom1],
            &data.geom_xpos[geom2],
            model.geom_rbound[geom2],
        ),
        (_, GeomKind::Plane) => plane_sphere(
            &data.geom_xpos[geom2],
            &data.geom_xquat[geom2],
            &data.geom_xpos[geom1],
            model.geom_rbound[geom1],
        )
        .map(|(pos, normal, depth)| (pos, -normal, depth)),
        _ => sphere_sphere(
            &data.geom_xpos[geom1],
            model.geom_rbound[geom1],
            &data.geom_xpos[geom2],
            model.geom_rbound[geom2],
        ),
    };
    hit.map(|(position, normal, depth)| EngineContact {
        position,
        frame: contact_frame(&normal),
        depth,
        geom1: Some(geom1),
        geom2: Some(geom2),
    })
}

/// Sphere against the half-space below a plane. The normal points out of
/// the plane.
fn plane_sphere(
    plane_pos: &Vector3<f64>,
    plane_quat: &UnitQuaternion<f64>,
    center: &Vector3<f64>,
    radius: f64,
) -> Option<(Vector3<f64>, Vector3<f64>, f64)> {
    let normal = plane_quat * Vector3::z();
    let dist = normal.dot(&(center - plane_pos)) - radius;
    if dist >= 0.0 {
        return None;
    }
    let depth = -dist;
    Some((center - normal * (radius - 0.5 * depth), normal, depth))
}

/// Normal points from the first sphere to the second.
fn sphere_sphere(
    center1: &Vector3<f64>,
    radius1: f64,
    center2: &Vector3<f64>,
    radius2: f64,
) -> Option<(Vector3<f64>, Vector3<f64>, f64)> {
    let delta = center2 - center1;
    let dist = delta.norm();
    let depth = radius1 + radius2 - dist;
    if depth <= 0.0 {
        return None;
    }
    let normal = if dist > NORMAL_EPSILON {
        delta / dist
    } else {
        Vector3::z()
    };
    Some((center1 + normal * (radius1 - 0.5 * depth), normal, depth))
}

/// Orthonormal contact frame with `normal` as its first row.
#[must_use]
pub fn contact_frame(normal: &Vector3<f64>) -> Matrix3<f64> {
    let helper = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let tangent1 = normal.cross(&helper).normalize();
    let tangent2 = normal.cross(&tangent1);
    Matrix3::from_rows(&[normal.transpose(), tangent1.transpose(), tangent2.transpose()])
}

/// Push free bodies out of the contacts found this step and remove their
/// velocity into the contact. Returns whether any coordinate moved.
pub fn resolve_penetration(model: &Model, data: &mut Data) -> bool {
    let mut moved = false;
    for index in 0..data.contacts.len() {
        let contact = data.contacts[index];
        let (Some(geom1), Some(geom2)) = (contact.geom1, contact.geom2) else {
            continue;
        };
        let normal: Vector3<f64> = contact.frame.row(0).transpose();
        let free1 = model.body_free_joint[model.geom_body[geom1]];
        let free2 = model.body_free_joint[model.geom_body[geom2]];
        let share = if free1.is_some() && free2.is_some() {
            0.5
        } else {
            1.0
        };
        if let Some(joint) = free1 {
            push_out(model, data, joint, &(-normal), share * contact.depth);
            moved = true;
        }
        if let Some(joint) = free2 {
            push_out(model, data, joint, &normal, share * contact.depth);
            moved = true;
        }
    }
    moved
}

fn push_out(model: &Model, data: &mut Data, joint: usize, direction: &Vector3<f64>, distance: f64) {
    let qadr = model.jnt_qpos_adr[joint];
    let dof = model.jnt_dof_adr[joint];
    let linear = Vector3::new(data.qvel[dof], data.qvel[dof + 1], data.qvel[dof + 2]);
    let inward = linear.dot(direction).min(0.0);
    for axis in 0..3 {
        data.qpos[qadr + axis] += direction[axis] * distance;
        data.qvel[dof + axis] -= direction[axis] * inward;
    }
}
