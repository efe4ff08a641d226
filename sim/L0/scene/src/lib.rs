//! Engine-agnostic scene model.
//!
//! This crate describes *what* is simulated, independent of any physics
//! engine:
//!
//! - [`Scene`] - root aggregate, owns bodies and terrain generators
//! - [`Body`] - rigid link with start pose, inertia, colliders, constraints
//! - [`Collider`] - collision geometry ([`Shape`]) with filtering and friction
//! - [`Constraint`] - articulation ([`ConstraintKind`]) with optional [`Limits`]
//! - [`TerrainGenerator`] - source of streamed terrain primitives
//!
//! # Design Philosophy
//!
//! These types are **pure data**. Translation into an engine model and the
//! per-step synchronization live in `sim-binding`; the only state written
//! back here is what the binding layer pulls after a step
//! ([`Body::world_pose`], [`Constraint::state`]).
//!
//! # Layer 0
//!
//! No engine, renderer or ECS dependencies.
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: forward
//! - Z: up
//! - Right-handed
//!
//! # Example
//!
//! ```
//! use sim_scene::{Body, Collider, Scene};
//! use nalgebra::Point3;
//!
//! let mut scene = Scene::new("demo");
//! scene
//!     .add_body(
//!         Body::dynamic_at("ball", Point3::new(0.0, 0.0, 1.0))
//!             .with_collider(Collider::sphere("ball_geom", 0.1)),
//!     )
//!     .unwrap();
//!
//! assert!(scene.collider("ball_geom").is_some());
//! ```

#![doc(html_root_url = "https://docs.rs/sim-scene/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn, // Many methods can't be const due to nalgebra
    clippy::missing_errors_doc,   // Error docs added where non-obvious
)]

mod body;
mod collider;
mod constraint;
mod error;
mod pose;
mod scene;
mod shape;
mod terrain;

pub use body::{Body, Dynamics, EPS, Inertia};
pub use collider::{Collider, DEFAULT_FRICTION};
pub use constraint::{Constraint, ConstraintKind, ConstraintState, Limits};
pub use error::SceneError;
pub use pose::Pose;
pub use scene::Scene;
pub use shape::{CompoundPart, HeightfieldData, MeshSource, Shape, ShapeKind};
pub use terrain::{PrimitiveId, ScriptedTerrainGenerator, TerrainGenerator, TerrainPrimitive};

pub use nalgebra::{Point3, UnitQuaternion, Vector3};

/// Result type for scene operations.
pub type Result<T> = std::result::Result<T, SceneError>;
