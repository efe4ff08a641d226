//! Colliders: the collision geometry attached to a body.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::pose::Pose;
use crate::shape::{HeightfieldData, MeshSource, Shape, ShapeKind};

/// Default friction: sliding, torsional, rolling.
pub const DEFAULT_FRICTION: [f64; 3] = [1.0, 0.005, 0.0001];

/// A piece of collision geometry owned by a [`Body`](crate::Body).
///
/// Size semantics depend on the shape kind; see [`ShapeKind`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Collider {
    /// Unique name within the scene.
    pub name: String,
    /// Geometry.
    pub shape: Shape,
    /// Size parameters.
    pub size: Vector3<f64>,
    /// Placement relative to the owning body.
    pub pose: Pose,
    /// Collision group bits (engine `contype`).
    pub collision_group: i32,
    /// Collision mask bits (engine `conaffinity`).
    pub collision_mask: i32,
    /// Sliding, torsional and rolling friction.
    pub friction: Vector3<f64>,
    /// Explicit density. When `None` the body mass drives the inertia.
    pub density: Option<f64>,
}

impl Collider {
    /// Create a collider with default collision filtering and friction.
    #[must_use]
    pub fn new(name: impl Into<String>, shape: Shape, size: Vector3<f64>) -> Self {
        Self {
            name: name.into(),
            shape,
            size,
            pose: Pose::identity(),
            collision_group: 1,
            collision_mask: 1,
            friction: Vector3::from(DEFAULT_FRICTION),
            density: None,
        }
    }

    /// Box with full extents `(x, y, z)`.
    #[must_use]
    pub fn cuboid(name: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self::new(name, Shape::Box, Vector3::new(x, y, z))
    }

    /// Sphere of the given radius.
    #[must_use]
    pub fn sphere(name: impl Into<String>, radius: f64) -> Self {
        Self::new(name, Shape::Sphere, Vector3::new(radius, radius, radius))
    }

    /// Capsule with the given radius and cylinder length.
    #[must_use]
    pub fn capsule(name: impl Into<String>, radius: f64, length: f64) -> Self {
        Self::new(name, Shape::Capsule, Vector3::new(radius, length, radius))
    }

    /// Cylinder with the given radius and length.
    #[must_use]
    pub fn cylinder(name: impl Into<String>, radius: f64, length: f64) -> Self {
        Self::new(name, Shape::Cylinder, Vector3::new(radius, length, radius))
    }

    /// Mesh collider; `scale` becomes the mesh scale.
    #[must_use]
    pub fn mesh(name: impl Into<String>, source: MeshSource, scale: Vector3<f64>) -> Self {
        Self::new(name, Shape::Mesh(source), scale)
    }

    /// Heightfield collider; size is (width, depth, height scale).
    #[must_use]
    pub fn heightfield(name: impl Into<String>, data: HeightfieldData, size: Vector3<f64>) -> Self {
        Self::new(name, Shape::Heightfield(data), size)
    }

    /// Set the placement relative to the body.
    #[must_use]
    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    /// Set collision group and mask bits.
    #[must_use]
    pub fn with_collision_filter(mut self, group: i32, mask: i32) -> Self {
        self.collision_group = group;
        self.collision_mask = mask;
        self
    }

    /// Set the friction triple.
    #[must_use]
    pub fn with_friction(mut self, friction: Vector3<f64>) -> Self {
        self.friction = friction;
        self
    }

    /// Set an explicit density.
    #[must_use]
    pub fn with_density(mut self, density: f64) -> Self {
        self.density = Some(density);
        self
    }

    /// Shape kind of this collider.
    #[must_use]
    pub const fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }
}
