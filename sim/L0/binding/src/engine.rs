//! The external physics engine interface.
//!
//! The binding layer never looks inside the engine. It hands over a
//! [`ComposedDescription`], receives opaque model/state handles, resolves
//! names to indices once, and afterwards touches engine memory only through
//! the indexed bulk-array accessors below.

use nalgebra::{Matrix3, UnitQuaternion, Vector3, Vector4};

use crate::resource::ComposedDescription;

/// Element kinds addressable by name in a compiled model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Bodies.
    Body,
    /// Joints.
    Joint,
    /// Geometries.
    Geom,
    /// Mesh assets.
    Mesh,
    /// Heightfield assets.
    Hfield,
}

/// Engine joint primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointKind {
    /// 6-DOF floating joint (position + unit quaternion).
    Free,
    /// 3-DOF rotation (unit quaternion).
    Ball,
    /// 1-DOF translation.
    Slide,
    /// 1-DOF rotation.
    Hinge,
}

impl JointKind {
    /// Number of generalized position coordinates.
    #[must_use]
    pub const fn nq(self) -> usize {
        match self {
            Self::Free => 7,
            Self::Ball => 4,
            Self::Slide | Self::Hinge => 1,
        }
    }

    /// Number of generalized velocity coordinates.
    #[must_use]
    pub const fn nv(self) -> usize {
        match self {
            Self::Free => 6,
            Self::Ball => 3,
            Self::Slide | Self::Hinge => 1,
        }
    }

    /// Name used in the composed description.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Ball => "ball",
            Self::Slide => "slide",
            Self::Hinge => "hinge",
        }
    }

    /// Parse a description name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "free" => Some(Self::Free),
            "ball" => Some(Self::Ball),
            "slide" => Some(Self::Slide),
            "hinge" => Some(Self::Hinge),
            _ => None,
        }
    }
}

/// Engine geometry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeomKind {
    /// Infinite plane.
    Plane,
    /// Heightfield.
    Hfield,
    /// Sphere.
    Sphere,
    /// Capsule.
    Capsule,
    /// Ellipsoid.
    Ellipsoid,
    /// Cylinder.
    Cylinder,
    /// Box.
    Box,
    /// Triangle mesh.
    Mesh,
}

impl GeomKind {
    /// Name used in the composed description.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plane => "plane",
            Self::Hfield => "hfield",
            Self::Sphere => "sphere",
            Self::Capsule => "capsule",
            Self::Ellipsoid => "ellipsoid",
            Self::Cylinder => "cylinder",
            Self::Box => "box",
            Self::Mesh => "mesh",
        }
    }

    /// Parse a description name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "plane" => Some(Self::Plane),
            "hfield" => Some(Self::Hfield),
            "sphere" => Some(Self::Sphere),
            "capsule" => Some(Self::Capsule),
            "ellipsoid" => Some(Self::Ellipsoid),
            "cylinder" => Some(Self::Cylinder),
            "box" => Some(Self::Box),
            "mesh" => Some(Self::Mesh),
            _ => None,
        }
    }
}

/// Where a joint's coordinates live in `qpos` / `qvel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointAddress {
    /// Joint type as compiled.
    pub kind: JointKind,
    /// Start index in `qpos`.
    pub qpos_adr: usize,
    /// Start index in `qvel`.
    pub dof_adr: usize,
}

/// Where a mesh's vertices and faces live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshAddress {
    /// First vertex in the global vertex array.
    pub vert_adr: usize,
    /// Vertex count.
    pub vert_num: usize,
    /// First face in the global face array.
    pub face_adr: usize,
    /// Face count.
    pub face_num: usize,
}

/// Where a heightfield's samples live and the grid they form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HfieldAddress {
    /// First sample in the global elevation array.
    pub adr: usize,
    /// Rows (depth samples).
    pub nrow: usize,
    /// Columns (width samples).
    pub ncol: usize,
}

impl HfieldAddress {
    /// Samples in the grid.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nrow * self.ncol
    }

    /// Whether the grid is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One contact as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineContact {
    /// World position.
    pub position: Vector3<f64>,
    /// Contact frame; first row is the normal.
    pub frame: Matrix3<f64>,
    /// Penetration depth (positive when overlapping).
    pub depth: f64,
    /// First geometry, `None` if engine-internal.
    pub geom1: Option<usize>,
    /// Second geometry, `None` if engine-internal.
    pub geom2: Option<usize>,
}

/// A physics engine the binder can drive.
///
/// `Model` holds compiled, mostly static parameters; `Data` holds the
/// evolving state. Accessors return whole arrays indexed by element id so the
/// binder can cache addresses at bind time and write in O(1) afterwards.
pub trait PhysicsEngine {
    /// Compiled model handle.
    type Model;
    /// Simulation state handle.
    type Data;

    /// Process-wide activation. Called at most once per process.
    fn activate(&self) {}

    /// Compile and load a description. Errors carry the raw diagnostic.
    fn compile(
        &self,
        description: &ComposedDescription,
    ) -> std::result::Result<(Self::Model, Self::Data), String>;

    /// Resolve a name to an element index.
    fn name_to_index(&self, model: &Self::Model, kind: ElementKind, name: &str) -> Option<usize>;

    /// Advance one integration step.
    fn step(&self, model: &Self::Model, data: &mut Self::Data);

    /// Recompute poses from the current coordinates without integrating.
    fn kinematics(&self, model: &Self::Model, data: &mut Self::Data);

    /// Current simulation time.
    fn time(&self, data: &Self::Data) -> f64;

    /// Joint type and coordinate addresses.
    fn joint_address(&self, model: &Self::Model, joint: usize) -> Option<JointAddress>;

    /// Geometry type.
    fn geom_kind(&self, model: &Self::Model, geom: usize) -> Option<GeomKind>;

    /// Mesh or heightfield referenced by a geometry.
    fn geom_data_id(&self, model: &Self::Model, geom: usize) -> Option<usize>;

    /// Mesh vertex/face addresses.
    fn mesh_address(&self, model: &Self::Model, mesh: usize) -> Option<MeshAddress>;

    /// Heightfield sample address and grid.
    fn hfield_address(&self, model: &Self::Model, hfield: usize) -> Option<HfieldAddress>;

    /// Body positions relative to the parent.
    fn body_pos_mut<'m>(&self, model: &'m mut Self::Model) -> &'m mut [Vector3<f64>];

    /// Body orientations relative to the parent.
    fn body_quat_mut<'m>(&self, model: &'m mut Self::Model) -> &'m mut [UnitQuaternion<f64>];

    /// Geometry positions relative to the body.
    fn geom_pos_mut<'m>(&self, model: &'m mut Self::Model) -> &'m mut [Vector3<f64>];

    /// Geometry orientations relative to the body.
    fn geom_quat_mut<'m>(&self, model: &'m mut Self::Model) -> &'m mut [UnitQuaternion<f64>];

    /// Geometry size parameters (unused trailing entries are zero).
    fn geom_size_mut<'m>(&self, model: &'m mut Self::Model) -> &'m mut [Vector3<f64>];

    /// Geometry bounding-sphere radii.
    fn geom_rbound_mut<'m>(&self, model: &'m mut Self::Model) -> &'m mut [f64];

    /// Geometry friction (sliding, torsional, rolling).
    fn geom_friction_mut<'m>(&self, model: &'m mut Self::Model) -> &'m mut [Vector3<f64>];

    /// Geometry collision type bits.
    fn geom_contype_mut<'m>(&self, model: &'m mut Self::Model) -> &'m mut [i32];

    /// Geometry collision affinity bits.
    fn geom_conaffinity_mut<'m>(&self, model: &'m mut Self::Model) -> &'m mut [i32];

    /// Joint limit flags.
    fn jnt_limited_mut<'m>(&self, model: &'m mut Self::Model) -> &'m mut [bool];

    /// Joint ranges.
    fn jnt_range_mut<'m>(&self, model: &'m mut Self::Model) -> &'m mut [(f64, f64)];

    /// All mesh vertices, concatenated.
    fn mesh_vert_mut<'m>(&self, model: &'m mut Self::Model) -> &'m mut [Vector3<f64>];

    /// Heightfield sizes (half-x, half-y, elevation, base).
    fn hfield_size_mut<'m>(&self, model: &'m mut Self::Model) -> &'m mut [Vector4<f64>];

    /// All heightfield samples, concatenated.
    fn hfield_data_mut<'m>(&self, model: &'m mut Self::Model) -> &'m mut [f64];

    /// Generalized positions.
    fn qpos<'d>(&self, data: &'d Self::Data) -> &'d [f64];

    /// Mutable generalized positions.
    fn qpos_mut<'d>(&self, data: &'d mut Self::Data) -> &'d mut [f64];

    /// Generalized velocities.
    fn qvel<'d>(&self, data: &'d Self::Data) -> &'d [f64];

    /// Mutable generalized velocities.
    fn qvel_mut<'d>(&self, data: &'d mut Self::Data) -> &'d mut [f64];

    /// Positions and velocities together, for writes that touch both.
    fn state_mut<'d>(&self, data: &'d mut Self::Data) -> (&'d mut [f64], &'d mut [f64]);

    /// Body world positions.
    fn body_xpos<'d>(&self, data: &'d Self::Data) -> &'d [Vector3<f64>];

    /// Body world orientations.
    fn body_xquat<'d>(&self, data: &'d Self::Data) -> &'d [UnitQuaternion<f64>];

    /// Contacts found during the last step.
    fn contacts<'d>(&self, data: &'d Self::Data) -> &'d [EngineContact];
}
