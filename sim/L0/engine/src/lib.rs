//! Minimal reference physics backend.
//!
//! Implements the [`PhysicsEngine`] interface of `sim-binding` with just
//! enough physics to exercise a bound scene end to end:
//!
//! - a description compiler producing flat per-field [`Model`] arrays
//! - forward kinematics over free, ball, slide and hinge joints
//! - a semi-implicit Euler step with gravity and joint limits
//! - bounding-sphere/plane contacts with positional recovery for free bodies
//!
//! There is no mass matrix and no constraint solver. Contacts are resolved
//! by projecting free bodies out of penetration.
//!
//! # Example
//!
//! ```
//! use sim_binding::{BinderConfig, EngineBinder};
//! use sim_engine::ReferenceEngine;
//! use sim_scene::Scene;
//!
//! let mut binder =
//!     EngineBinder::new(ReferenceEngine::new(), Scene::new("empty"), BinderConfig::default())?;
//! binder.build()?;
//! binder.bind()?;
//! binder.step()?;
//! # Ok::<(), sim_binding::BindingError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/sim-engine/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn, // Many methods can't be const due to nalgebra
    clippy::missing_errors_doc,   // Error docs added where non-obvious
    clippy::module_name_repetitions,
)]

mod collision;
mod compile;
mod data;
mod error;
mod forward;
mod integrate;
mod model;

pub use collision::{contact_frame, mj_collision};
pub use compile::{DEFAULT_FRICTION, compile, primitive_rbound};
pub use data::Data;
pub use error::{CompileError, Result};
pub use forward::mj_fwd_position;
pub use integrate::{mj_enforce_limits, mj_integrate_pos, mj_step};
pub use model::Model;

use nalgebra::{UnitQuaternion, Vector3, Vector4};
use sim_binding::{
    ComposedDescription, ElementKind, EngineContact, GeomKind, HfieldAddress, JointAddress,
    MeshAddress, PhysicsEngine,
};
use tracing::{debug, info};

/// The reference engine. Stateless; all state lives in [`Model`] and
/// [`Data`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceEngine;

impl ReferenceEngine {
    /// Create the engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PhysicsEngine for ReferenceEngine {
    type Model = Model;
    type Data = Data;

    fn activate(&self) {
        info!("reference engine activated");
    }

    fn compile(
        &self,
        description: &ComposedDescription,
    ) -> std::result::Result<(Model, Data), String> {
        let model = compile(description).map_err(|e| {
            debug!(error = %e, "description rejected");
            e.to_string()
        })?;
        let mut data = model.make_data();
        mj_fwd_position(&model, &mut data);
        Ok((model, data))
    }

    fn name_to_index(&self, model: &Model, kind: ElementKind, name: &str) -> Option<usize> {
        model.name2id(kind, name)
    }

    fn step(&self, model: &Model, data: &mut Data) {
        mj_step(model, data);
    }

    fn kinematics(&self, model: &Model, data: &mut Data) {
        mj_fwd_position(model, data);
    }

    fn time(&self, data: &Data) -> f64 {
        data.time
    }

    fn joint_address(&self, model: &Model, joint: usize) -> Option<JointAddress> {
        Some(JointAddress {
            kind: *model.jnt_type.get(joint)?,
            qpos_adr: model.jnt_qpos_adr[joint],
            dof_adr: model.jnt_dof_adr[joint],
        })
    }

    fn geom_kind(&self, model: &Model, geom: usize) -> Option<GeomKind> {
        model.geom_type.get(geom).copied()
    }

    fn geom_data_id(&self, model: &Model, geom: usize) -> Option<usize> {
        model.geom_data_id.get(geom).copied().flatten()
    }

    fn mesh_address(&self, model: &Model, mesh: usize) -> Option<MeshAddress> {
        Some(MeshAddress {
            vert_adr: *model.mesh_vert_adr.get(mesh)?,
            vert_num: model.mesh_vert_num[mesh],
            face_adr: model.mesh_face_adr[mesh],
            face_num: model.mesh_face_num[mesh],
        })
    }

    fn hfield_address(&self, model: &Model, hfield: usize) -> Option<HfieldAddress> {
        Some(HfieldAddress {
            adr: *model.hfield_adr.get(hfield)?,
            nrow: model.hfield_nrow[hfield],
            ncol: model.hfield_ncol[hfield],
        })
    }

    fn body_pos_mut<'m>(&self, model: &'m mut Model) -> &'m mut [Vector3<f64>] {
        &mut model.body_pos
    }

    fn body_quat_mut<'m>(&self, model: &'m mut Model) -> &'m mut [UnitQuaternion<f64>] {
        &mut model.body_quat
    }

    fn geom_pos_mut<'m>(&self, model: &'m mut Model) -> &'m mut [Vector3<f64>] {
        &mut model.geom_pos
    }

    fn geom_quat_mut<'m>(&self, model: &'m mut Model) -> &'m mut [UnitQuaternion<f64>] {
        &mut model.geom_quat
    }

    fn geom_size_mut<'m>(&self, model: &'m mut Model) -> &'m mut [Vector3<f64>] {
        &mut model.geom_size
    }

    fn geom_rbound_mut<'m>(&self, model: &'m mut Model) -> &'m mut [f64] {
        &mut model.geom_rbound
    }

    fn geom_friction_mut<'m>(&self, model: &'m mut Model) -> &'m mut [Vector3<f64>] {
        &mut model.geom_friction
    }

    fn geom_contype_mut<'m>(&self, model: &'m mut Model) -> &'m mut [i32] {
        &mut model.geom_contype
    }

    fn geom_conaffinity_mut<'m>(&self, model: &'m mut Model) -> &'m mut [i32] {
        &mut model.geom_conaffinity
    }

    fn jnt_limited_mut<'m>(&self, model: &'m mut Model) -> &'m mut [bool] {
        &mut model.jnt_limited
    }

    fn jnt_range_mut<'m>(&self, model: &'m mut Model) -> &'m mut [(f64, f64)] {
        &mut model.jnt_range
    }

    fn mesh_vert_mut<'m>(&self, model: &'m mut Model) -> &'m mut [Vector3<f64>] {
        &mut model.mesh_vert
    }

    fn hfield_size_mut<'m>(&self, model: &'m mut Model) -> &'m mut [Vector4<f64>] {
        &mut model.hfield_size
    }

    fn hfield_data_mut<'m>(&self, model: &'m mut Model) -> &'m mut [f64] {
        &mut model.hfield_data
    }

    fn qpos<'d>(&self, data: &'d Data) -> &'d [f64] {
        data.qpos.as_slice()
    }

    fn qpos_mut<'d>(&self, data: &'d mut Data) -> &'d mut [f64] {
        data.qpos.as_mut_slice()
    }

    fn qvel<'d>(&self, data: &'d Data) -> &'d [f64] {
        data.qvel.as_slice()
    }

    fn qvel_mut<'d>(&self, data: &'d mut Data) -> &'d mut [f64] {
        data.qvel.as_mut_slice()
    }

    fn state_mut<'d>(&self, data: &'d mut Data) -> (&'d mut [f64], &'d mut [f64]) {
        (data.qpos.as_mut_slice(), data.qvel.as_mut_slice())
    }

    fn body_xpos<'d>(&self, data: &'d Data) -> &'d [Vector3<f64>] {
        &data.xpos
    }

    fn body_xquat<'d>(&self, data: &'d Data) -> &'d [UnitQuaternion<f64>] {
        &data.xquat
    }

    fn contacts<'d>(&self, data: &'d Data) -> &'d [EngineContact] {
        &data.contacts
    }
}
