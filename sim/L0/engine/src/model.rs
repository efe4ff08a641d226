//! Compiled model: static parameters in flat per-field arrays.
//!
//! Body 0 is the world. Bodies are stored parent-before-child so a single
//! forward pass computes every world pose.

use std::collections::HashMap;

use nalgebra::{DVector, UnitQuaternion, Vector3, Vector4};
use sim_binding::{ElementKind, GeomKind, JointKind};

use crate::data::Data;

/// Compiled model.
#[derive(Debug, Clone)]
#[allow(clippy::struct_field_names)]
pub struct Model {
    /// Model name.
    pub name: String,
    /// Integration timestep (seconds).
    pub timestep: f64,
    /// Gravity.
    pub gravity: Vector3<f64>,

    // ==================== Dimensions ====================
    /// Number of bodies, including the world.
    pub nbody: usize,
    /// Number of joints.
    pub njnt: usize,
    /// Number of geoms.
    pub ngeom: usize,
    /// Number of position coordinates.
    pub nq: usize,
    /// Number of degrees of freedom.
    pub nv: usize,

    // ==================== Bodies ====================
    /// Parent body index (world is its own parent).
    pub body_parent: Vec<usize>,
    /// Position relative to the parent.
    pub body_pos: Vec<Vector3<f64>>,
    /// Orientation relative to the parent.
    pub body_quat: Vec<UnitQuaternion<f64>>,
    /// First joint of each body.
    pub body_jnt_adr: Vec<usize>,
    /// Joint count of each body.
    pub body_jnt_num: Vec<usize>,
    /// Free joint of each body, if any.
    pub body_free_joint: Vec<Option<usize>>,
    /// Whether no joint moves the body relative to the world.
    pub body_static: Vec<bool>,
    /// Explicit mass, if given.
    pub body_mass: Vec<Option<f64>>,
    /// Body names.
    pub body_name: Vec<Option<String>>,

    // ==================== Joints ====================
    /// Joint type.
    pub jnt_type: Vec<JointKind>,
    /// Owning body.
    pub jnt_body: Vec<usize>,
    /// First position coordinate.
    pub jnt_qpos_adr: Vec<usize>,
    /// First degree of freedom.
    pub jnt_dof_adr: Vec<usize>,
    /// Anchor in the body frame.
    pub jnt_pos: Vec<Vector3<f64>>,
    /// Unit axis in the body frame.
    pub jnt_axis: Vec<Vector3<f64>>,
    /// Whether the range is enforced.
    pub jnt_limited: Vec<bool>,
    /// Range (lower, upper).
    pub jnt_range: Vec<(f64, f64)>,
    /// Joint names.
    pub jnt_name: Vec<Option<String>>,

    // ==================== Geoms ====================
    /// Geom type.
    pub geom_type: Vec<GeomKind>,
    /// Owning body.
    pub geom_body: Vec<usize>,
    /// Position in the body frame.
    pub geom_pos: Vec<Vector3<f64>>,
    /// Orientation in the body frame.
    pub geom_quat: Vec<UnitQuaternion<f64>>,
    /// Size parameters, zero-padded.
    pub geom_size: Vec<Vector3<f64>>,
    /// Bounding-sphere radius.
    pub geom_rbound: Vec<f64>,
    /// Friction (sliding, torsional, rolling).
    pub geom_friction: Vec<Vector3<f64>>,
    /// Collision type bits.
    pub geom_contype: Vec<i32>,
    /// Collision affinity bits.
    pub geom_conaffinity: Vec<i32>,
    /// Referenced mesh or heightfield.
    pub geom_data_id: Vec<Option<usize>>,
    /// Geom names.
    pub geom_name: Vec<Option<String>>,

    // ==================== Meshes ====================
    /// First vertex of each mesh.
    pub mesh_vert_adr: Vec<usize>,
    /// Vertex count of each mesh.
    pub mesh_vert_num: Vec<usize>,
    /// First face of each mesh.
    pub mesh_face_adr: Vec<usize>,
    /// Face count of each mesh.
    pub mesh_face_num: Vec<usize>,
    /// All vertices, scaled.
    pub mesh_vert: Vec<Vector3<f64>>,
    /// All faces, indices local to their mesh.
    pub mesh_face: Vec<[usize; 3]>,
    /// Mesh names.
    pub mesh_name: Vec<String>,

    // ==================== Height Fields ====================
    /// Size (half-x, half-y, elevation, base).
    pub hfield_size: Vec<Vector4<f64>>,
    /// Rows of each heightfield.
    pub hfield_nrow: Vec<usize>,
    /// Columns of each heightfield.
    pub hfield_ncol: Vec<usize>,
    /// First sample of each heightfield.
    pub hfield_adr: Vec<usize>,
    /// All samples, normalized to `[0, 1]`.
    pub hfield_data: Vec<f64>,
    /// Heightfield names.
    pub hfield_name: Vec<String>,

    // ==================== Defaults ====================
    /// Reference configuration.
    pub qpos0: DVector<f64>,

    // ==================== Name↔Index Lookup ====================
    /// Body name → index.
    pub body_name_to_id: HashMap<String, usize>,
    /// Joint name → index.
    pub jnt_name_to_id: HashMap<String, usize>,
    /// Geom name → index.
    pub geom_name_to_id: HashMap<String, usize>,
    /// Mesh name → index.
    pub mesh_name_to_id: HashMap<String, usize>,
    /// Height field name → index.
    pub hfield_name_to_id: HashMap<String, usize>,
}

impl Model {
    /// A model containing only the world body.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            timestep: 0.002,
            gravity: Vector3::new(0.0, 0.0, -9.81),
            nbody: 1,
            njnt: 0,
            ngeom: 0,
            nq: 0,
            nv: 0,
            body_parent: vec![0],
            body_pos: vec![Vector3::zeros()],
            body_quat: vec![UnitQuaternion::identity()],
            body_jnt_adr: vec![0],
            body_jnt_num: vec![0],
            body_free_joint: vec![None],
            body_static: vec![true],
            body_mass: vec![None],
            body_name: vec![Some("world".to_owned())],
            jnt_type: Vec::new(),
            jnt_body: Vec::new(),
            jnt_qpos_adr: Vec::new(),
            jnt_dof_adr: Vec::new(),
            jnt_pos: Vec::new(),
            jnt_axis: Vec::new(),
            jnt_limited: Vec::new(),
            jnt_range: Vec::new(),
            jnt_name: Vec::new(),
            geom_type: Vec::new(),
            geom_body: Vec::new(),
            geom_pos: Vec::new(),
            geom_quat: Vec::new(),
            geom_size: Vec::new(),
            geom_rbound: Vec::new(),
            geom_friction: Vec::new(),
            geom_contype: Vec::new(),
            geom_conaffinity: Vec::new(),
            geom_data_id: Vec::new(),
            geom_name: Vec::new(),
            mesh_vert_adr: Vec::new(),
            mesh_vert_num: Vec::new(),
            mesh_face_adr: Vec::new(),
            mesh_face_num: Vec::new(),
            mesh_vert: Vec::new(),
            mesh_face: Vec::new(),
            mesh_name: Vec::new(),
            hfield_size: Vec::new(),
            hfield_nrow: Vec::new(),
            hfield_ncol: Vec::new(),
            hfield_adr: Vec::new(),
            hfield_data: Vec::new(),
            hfield_name: Vec::new(),
            qpos0: DVector::zeros(0),
            body_name_to_id: HashMap::from([("world".to_owned(), 0)]),
            jnt_name_to_id: HashMap::new(),
            geom_name_to_id: HashMap::new(),
            mesh_name_to_id: HashMap::new(),
            hfield_name_to_id: HashMap::new(),
        }
    }

    /// Look up element index by name.
    #[must_use]
    pub fn name2id(&self, element: ElementKind, name: &str) -> Option<usize> {
        match element {
            ElementKind::Body => self.body_name_to_id.get(name).copied(),
            ElementKind::Joint => self.jnt_name_to_id.get(name).copied(),
            ElementKind::Geom => self.geom_name_to_id.get(name).copied(),
            ElementKind::Mesh => self.mesh_name_to_id.get(name).copied(),
            ElementKind::Hfield => self.hfield_name_to_id.get(name).copied(),
        }
    }

    /// Look up element name by index.
    ///
    /// Returns `None` if the index is out of bounds or the element has no name.
    #[must_use]
    pub fn id2name(&self, element: ElementKind, id: usize) -> Option<&str> {
        match element {
            ElementKind::Body => self.body_name.get(id).and_then(|n| n.as_deref()),
            ElementKind::Joint => self.jnt_name.get(id).and_then(|n| n.as_deref()),
            ElementKind::Geom => self.geom_name.get(id).and_then(|n| n.as_deref()),
            ElementKind::Mesh => self.mesh_name.get(id).map(String::as_str),
            ElementKind::Hfield => self.hfield_name.get(id).map(String::as_str),
        }
    }

    /// Fresh state at the reference configuration. Poses are not computed
    /// until kinematics runs.
    #[must_use]
    pub fn make_data(&self) -> Data {
        Data {
            qpos: self.qpos0.clone(),
            qvel: DVector::zeros(self.nv),
            time: 0.0,
            xpos: vec![Vector3::zeros(); self.nbody],
            xquat: vec![UnitQuaternion::identity(); self.nbody],
            geom_xpos: vec![Vector3::zeros(); self.ngeom],
            geom_xquat: vec![UnitQuaternion::identity(); self.ngeom],
            contacts: Vec::new(),
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::empty()
    }
}
