//! Error types for scene assembly.

use thiserror::Error;

/// Errors raised while assembling a [`Scene`](crate::Scene).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Two entities of the same kind share a name.
    #[error("duplicate {kind} name: {name}")]
    DuplicateName {
        /// Entity kind ("body", "collider", ...).
        kind: &'static str,
        /// The repeated name.
        name: String,
    },

    /// A body names a parent that is not in the scene.
    #[error("body {body} references unknown parent {parent}")]
    UnknownParent {
        /// The child body.
        body: String,
        /// The missing parent.
        parent: String,
    },
}

impl SceneError {
    /// Create a duplicate-name error.
    #[must_use]
    pub fn duplicate(kind: &'static str, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            kind,
            name: name.into(),
        }
    }
}
