//! Error types for description compilation.

use thiserror::Error;

/// Errors that can occur while compiling a composed description.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Root element is not `<mujoco>`.
    #[error("expected root element <mujoco>, found <{0}>")]
    UnexpectedRoot(String),

    /// Element not understood in this position.
    #[error("unknown element <{tag}> in <{context}>")]
    UnknownElement {
        /// Offending tag.
        tag: String,
        /// Enclosing element.
        context: String,
    },

    /// Missing required attribute.
    #[error("missing required attribute: {attribute} on <{element}>")]
    MissingAttribute {
        /// The missing attribute name.
        attribute: &'static str,
        /// The element that should have the attribute.
        element: String,
    },

    /// Invalid attribute value.
    #[error("invalid value for {attribute} on <{element}>: {message}")]
    InvalidAttribute {
        /// The attribute with the invalid value.
        attribute: &'static str,
        /// The element containing the attribute.
        element: String,
        /// Description of why the value is invalid.
        message: String,
    },

    /// Unknown joint type.
    #[error("unknown joint type: {0}")]
    UnknownJointType(String),

    /// Unknown geom type.
    #[error("unknown geom type: {0}")]
    UnknownGeomType(String),

    /// Two elements of one kind share a name.
    #[error("duplicate {kind} name: {name}")]
    DuplicateName {
        /// Element kind.
        kind: &'static str,
        /// The repeated name.
        name: String,
    },

    /// Geom references an asset that was never defined.
    #[error("reference to undefined {kind}: {name} in geom {geom}")]
    UndefinedAsset {
        /// Asset kind.
        kind: &'static str,
        /// Referenced name.
        name: String,
        /// Referencing geom.
        geom: String,
    },

    /// Mesh file missing or unreadable.
    #[error("mesh file {file}: {message}")]
    MeshFile {
        /// File as written in the description.
        file: String,
        /// What went wrong.
        message: String,
    },
}

impl CompileError {
    /// Create an invalid attribute error.
    #[must_use]
    pub fn invalid(
        attribute: &'static str,
        element: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            attribute,
            element: element.into(),
            message: message.into(),
        }
    }
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;
