//! Binder configuration.

use std::path::PathBuf;

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::BindingError;

/// Configuration for an [`EngineBinder`](crate::EngineBinder).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BinderConfig {
    /// Simulated time advanced per [`step`](crate::EngineBinder::step) call (seconds).
    pub frame_duration: f64,
    /// Engine integration timestep written into the description (seconds).
    pub timestep: f64,
    /// Gravity written into the description.
    pub gravity: Vector3<f64>,
    /// Engine slots reserved per terrain generator.
    pub terrain_pool_capacity: usize,
    /// Depth of the solid base below every heightfield.
    pub hfield_base_depth: f64,
    /// Add an unnamed ground plane to the world body.
    pub ground_plane: bool,
    /// Write the composed description as XML here after every build.
    pub description_dump: Option<PathBuf>,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            frame_duration: 1.0 / 60.0,
            timestep: 0.002,
            gravity: Vector3::new(0.0, 0.0, -9.81),
            terrain_pool_capacity: 20,
            hfield_base_depth: 1.0,
            ground_plane: true,
            description_dump: None,
        }
    }
}

impl BinderConfig {
    /// Set the frame duration.
    #[must_use]
    pub fn frame_duration(mut self, seconds: f64) -> Self {
        self.frame_duration = seconds;
        self
    }

    /// Set the integration timestep.
    #[must_use]
    pub fn timestep(mut self, seconds: f64) -> Self {
        self.timestep = seconds;
        self
    }

    /// Set gravity.
    #[must_use]
    pub fn gravity(mut self, gravity: Vector3<f64>) -> Self {
        self.gravity = gravity;
        self
    }

    /// Disable gravity.
    #[must_use]
    pub fn zero_gravity(mut self) -> Self {
        self.gravity = Vector3::zeros();
        self
    }

    /// Set the terrain pool capacity.
    #[must_use]
    pub fn terrain_pool_capacity(mut self, capacity: usize) -> Self {
        self.terrain_pool_capacity = capacity;
        self
    }

    /// Omit the implicit ground plane.
    #[must_use]
    pub fn without_ground_plane(mut self) -> Self {
        self.ground_plane = false;
        self
    }

    /// Dump the composed description to `path` after every build.
    #[must_use]
    pub fn dump_description(mut self, path: impl Into<PathBuf>) -> Self {
        self.description_dump = Some(path.into());
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.frame_duration.is_finite() || self.frame_duration <= 0.0 {
            return Err(BindingError::invalid_config(format!(
                "frame duration {} must be positive and finite",
                self.frame_duration
            )));
        }
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(BindingError::invalid_config(format!(
                "timestep {} must be positive and finite",
                self.timestep
            )));
        }
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(BindingError::invalid_config("gravity must be finite"));
        }
        if self.terrain_pool_capacity == 0 {
            return Err(BindingError::invalid_config(
                "terrain pool capacity must be at least 1",
            ));
        }
        if !self.hfield_base_depth.is_finite() || self.hfield_base_depth <= 0.0 {
            return Err(BindingError::invalid_config(
                "heightfield base depth must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = BinderConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.frame_duration - 1.0 / 60.0).abs() < 1e-15);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(BinderConfig::default().timestep(0.0).validate().is_err());
        assert!(BinderConfig::default()
            .frame_duration(f64::NAN)
            .validate()
            .is_err());
        assert!(BinderConfig::default()
            .terrain_pool_capacity(0)
            .validate()
            .is_err());
    }

    #[test]
    fn builder_chain() {
        let config = BinderConfig::default()
            .zero_gravity()
            .without_ground_plane()
            .terrain_pool_capacity(3);
        assert_eq!(config.gravity, Vector3::zeros());
        assert!(!config.ground_plane);
        assert_eq!(config.terrain_pool_capacity, 3);
    }
}
