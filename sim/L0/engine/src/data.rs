//! Simulation state.

use nalgebra::{DVector, UnitQuaternion, Vector3};
use sim_binding::EngineContact;

/// Evolving state of one simulation.
#[derive(Debug, Clone)]
pub struct Data {
    /// Generalized positions.
    pub qpos: DVector<f64>,
    /// Generalized velocities.
    pub qvel: DVector<f64>,
    /// Simulation time.
    pub time: f64,
    /// Body world positions.
    pub xpos: Vec<Vector3<f64>>,
    /// Body world orientations.
    pub xquat: Vec<UnitQuaternion<f64>>,
    /// Geom world positions.
    pub geom_xpos: Vec<Vector3<f64>>,
    /// Geom world orientations.
    pub geom_xquat: Vec<UnitQuaternion<f64>>,
    /// Contacts found in the last step.
    pub contacts: Vec<EngineContact>,
}
