//! Error types for the binding layer.
//!
//! Only [`BindingError::Compile`] is fatal to a simulation. Every other
//! variant is confined to one entity: the binder logs it, leaves that entity
//! degraded or untouched, and carries on with the rest of the scene.

use thiserror::Error;

/// Errors raised while building, binding or synchronizing a scene.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindingError {
    /// An entity lacks data required to describe it; it was skipped or degraded.
    #[error("build failed for {entity}: {reason}")]
    Build {
        /// Name of the affected entity.
        entity: String,
        /// What was missing or invalid.
        reason: String,
    },

    /// The engine rejected the composed description.
    #[error("engine rejected the composed description: {diagnostic}")]
    Compile {
        /// Raw engine diagnostic.
        diagnostic: String,
    },

    /// An entity could not be resolved in the compiled model.
    #[error("bind failed for {entity}: {reason}")]
    Bind {
        /// Name of the affected entity.
        entity: String,
        /// Why the lookup failed.
        reason: String,
    },

    /// Runtime data does not match what the engine reports.
    #[error("runtime mismatch on {entity}: expected {expected}, got {actual}")]
    RuntimeMismatch {
        /// Name of the affected entity.
        entity: String,
        /// What the engine expects.
        expected: String,
        /// What was supplied.
        actual: String,
    },

    /// The operation would change topology or does not apply to this entity.
    #[error("unsupported operation on {entity}: {reason}")]
    UnsupportedOperation {
        /// Name of the affected entity.
        entity: String,
        /// Why the operation was rejected.
        reason: String,
    },

    /// No entity with this name exists in the scene.
    #[error("unknown entity: {name}")]
    UnknownEntity {
        /// The requested name.
        name: String,
    },

    /// The entity exists but holds no engine binding this session.
    #[error("entity {name} is not bound to the engine")]
    Unbound {
        /// The entity name.
        name: String,
    },

    /// Lifecycle operation called in the wrong phase.
    #[error("{operation} requires phase {expected}, binder is {actual}")]
    InvalidPhase {
        /// Operation attempted.
        operation: &'static str,
        /// Phase(s) the operation accepts.
        expected: &'static str,
        /// Current phase.
        actual: &'static str,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Rendering or writing the composed description failed.
    #[error("description output failed: {reason}")]
    Output {
        /// Underlying error text.
        reason: String,
    },
}

impl BindingError {
    /// Create a build error.
    #[must_use]
    pub fn build(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Build {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Create a bind error.
    #[must_use]
    pub fn bind(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Bind {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Create a runtime mismatch error.
    #[must_use]
    pub fn mismatch(
        entity: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::RuntimeMismatch {
            entity: entity.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an unsupported operation error.
    #[must_use]
    pub fn unsupported(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown entity error.
    #[must_use]
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownEntity { name: name.into() }
    }

    /// Create an unbound entity error.
    #[must_use]
    pub fn unbound(name: impl Into<String>) -> Self {
        Self::Unbound { name: name.into() }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an output error.
    #[must_use]
    pub fn output(reason: impl std::fmt::Display) -> Self {
        Self::Output {
            reason: reason.to_string(),
        }
    }

    /// Whether the error ends the simulation.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Compile { .. })
    }

    /// Name of the entity the error is confined to, if any.
    #[must_use]
    pub fn entity(&self) -> Option<&str> {
        match self {
            Self::Build { entity, .. }
            | Self::Bind { entity, .. }
            | Self::RuntimeMismatch { entity, .. }
            | Self::UnsupportedOperation { entity, .. } => Some(entity),
            Self::UnknownEntity { name } | Self::Unbound { name } => Some(name),
            Self::Compile { .. }
            | Self::InvalidPhase { .. }
            | Self::InvalidConfig { .. }
            | Self::Output { .. } => None,
        }
    }
}
