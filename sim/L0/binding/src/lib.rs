//! Scene-to-physics-engine binding layer.
//!
//! Translates an engine-agnostic [`Scene`](sim_scene::Scene) into the
//! declarative description a physics engine compiles, resolves every entity
//! to engine indices once, and then keeps scene and engine in sync step by
//! step:
//!
//! - [`shape`] - pure size, volume and bounding-radius conversions
//! - [`builder`] - per-entity resource elements, assembled into one
//!   [`ComposedDescription`]
//! - [`AssetDeduplicator`] - one canonical, duplicate-free asset list
//! - [`EngineBinder`] - lifecycle state machine (build, bind, step, reset,
//!   reload) and runtime field mutation
//! - [`TerrainPool`] - fixed-capacity slots for streamed terrain
//! - [`ContactManager`] - per-step contacts resolved to collider names
//!
//! The engine itself sits behind the [`PhysicsEngine`] trait.
//!
//! # Failure model
//!
//! Only [`BindingError::Compile`] stops a simulation. Build and bind
//! problems are confined to the entity they concern and returned as
//! diagnostics; runtime mutations that do not fit the bound topology are
//! rejected before anything is written.
//!
//! # Layer 0
//!
//! No engine, renderer or ECS dependencies.

#![doc(html_root_url = "https://docs.rs/sim-binding/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn, // Many methods can't be const due to nalgebra
    clippy::missing_errors_doc,   // Error docs added where non-obvious
    clippy::module_name_repetitions,
)]

pub mod activation;
mod assets;
mod binder;
mod binding;
mod body;
pub mod builder;
mod collider;
mod config;
mod constraint;
mod contacts;
mod engine;
mod error;
pub mod mesh_blob;
mod resource;
pub mod shape;
pub mod terrain;

pub use activation::{activation_count, ensure_activated, is_activated};
pub use assets::AssetDeduplicator;
pub use binder::{EngineBinder, Phase, PostStepCallback};
pub use binding::BindingTable;
pub use body::BodyBinding;
pub use builder::{BindPlan, BuildOutput, build};
pub use collider::{AssetBinding, ColliderBinding};
pub use config::BinderConfig;
pub use constraint::{ConstraintBinding, JointBinding, JointPrimitive, expand};
pub use contacts::{Contact, ContactManager};
pub use engine::{
    ElementKind, EngineContact, GeomKind, HfieldAddress, JointAddress, JointKind, MeshAddress,
    PhysicsEngine,
};
pub use error::BindingError;
pub use mesh_blob::{MeshBlob, MeshBlobError};
pub use resource::{AttrValue, ComposedDescription, ResourceElement, tags};
pub use terrain::{TerrainPool, TerrainSlot};

/// Result type for binding operations.
pub type Result<T> = std::result::Result<T, BindingError>;
