//! Collision shape descriptions.
//!
//! A [`Shape`] is the closed set of geometry variants a collider may carry.
//! Mesh and heightfield variants own the data that later becomes an engine
//! asset; compound shapes own a list of primitive parts placed relative to
//! the collider frame.

use std::path::PathBuf;

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::pose::Pose;

/// Payload-free discriminant of [`Shape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShapeKind {
    /// Axis-aligned box; size is the full extent along each axis.
    Box,
    /// Sphere; `size.x` is the radius.
    Sphere,
    /// Capsule; `size.x` is the radius, `size.y` the cylinder length.
    Capsule,
    /// Cylinder; `size.x` is the radius, `size.y` the length.
    Cylinder,
    /// Ellipsoid; size holds the three radii.
    Ellipsoid,
    /// Infinite plane; size is passed through to the engine.
    Plane,
    /// Triangle mesh; size is the mesh scale.
    Mesh,
    /// Heightfield; size is (width, depth, height scale).
    Heightfield,
    /// Several primitive parts attached to one collider.
    Compound,
}

impl ShapeKind {
    /// Whether the kind is a closed primitive with an analytic volume.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        matches!(
            self,
            Self::Box | Self::Sphere | Self::Capsule | Self::Cylinder | Self::Ellipsoid
        )
    }

    /// Lower-case name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::Sphere => "sphere",
            Self::Capsule => "capsule",
            Self::Cylinder => "cylinder",
            Self::Ellipsoid => "ellipsoid",
            Self::Plane => "plane",
            Self::Mesh => "mesh",
            Self::Heightfield => "heightfield",
            Self::Compound => "compound",
        }
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a mesh collider gets its triangles from.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MeshSource {
    /// External mesh file.
    File(PathBuf),
    /// Vertices and triangle indices supplied in memory.
    Inline {
        /// Vertex positions in the mesh frame.
        vertices: Vec<Point3<f64>>,
        /// Triangles as vertex index triples.
        faces: Vec<[u32; 3]>,
    },
    /// No data supplied; a placeholder is substituted at build time.
    #[default]
    Missing,
}

/// Raw heightfield samples, row-major over depth rows and width columns.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeightfieldData {
    /// Number of samples along the depth (y) axis.
    pub depth_samples: usize,
    /// Number of samples along the width (x) axis.
    pub width_samples: usize,
    /// Raw heights, `depth_samples * width_samples` of them.
    pub heights: Vec<f64>,
}

impl HeightfieldData {
    /// Create a heightfield grid.
    #[must_use]
    pub fn new(depth_samples: usize, width_samples: usize, heights: Vec<f64>) -> Self {
        Self {
            depth_samples,
            width_samples,
            heights,
        }
    }

    /// Number of samples implied by the grid dimensions.
    #[must_use]
    pub const fn grid_len(&self) -> usize {
        self.depth_samples * self.width_samples
    }

    /// Whether the sample buffer matches the grid dimensions.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.grid_len() > 0 && self.heights.len() == self.grid_len()
    }
}

/// One part of a compound collider.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompoundPart {
    /// Part geometry. Only primitive kinds survive the build.
    pub shape: Shape,
    /// Part size, same conventions as a collider of that kind.
    pub size: nalgebra::Vector3<f64>,
    /// Placement relative to the collider frame.
    pub pose: Pose,
}

/// Collider geometry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Shape {
    /// See [`ShapeKind::Box`].
    Box,
    /// See [`ShapeKind::Sphere`].
    Sphere,
    /// See [`ShapeKind::Capsule`].
    Capsule,
    /// See [`ShapeKind::Cylinder`].
    Cylinder,
    /// See [`ShapeKind::Ellipsoid`].
    Ellipsoid,
    /// See [`ShapeKind::Plane`].
    Plane,
    /// Triangle mesh with its data source.
    Mesh(MeshSource),
    /// Heightfield with its raw samples.
    Heightfield(HeightfieldData),
    /// Primitive parts sharing one collider.
    Compound(Vec<CompoundPart>),
}

impl Shape {
    /// The payload-free kind of this shape.
    #[must_use]
    pub const fn kind(&self) -> ShapeKind {
        match self {
            Self::Box => ShapeKind::Box,
            Self::Sphere => ShapeKind::Sphere,
            Self::Capsule => ShapeKind::Capsule,
            Self::Cylinder => ShapeKind::Cylinder,
            Self::Ellipsoid => ShapeKind::Ellipsoid,
            Self::Plane => ShapeKind::Plane,
            Self::Mesh(_) => ShapeKind::Mesh,
            Self::Heightfield(_) => ShapeKind::Heightfield,
            Self::Compound(_) => ShapeKind::Compound,
        }
    }
}
