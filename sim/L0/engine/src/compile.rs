//! Description compiler: [`ComposedDescription`] → [`Model`].
//!
//! Options are read first, then every asset, then the body tree, so a geom
//! may reference an asset that appears anywhere in the asset section. Mesh
//! files are taken from the description's blobs when present and from disk
//! otherwise.

use std::borrow::Cow;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use nalgebra::{DVector, Quaternion, UnitQuaternion, Vector3, Vector4};
use sim_binding::shape::{heightfield_rbound, mesh_rbound};
use sim_binding::{
    AttrValue, ComposedDescription, GeomKind, JointKind, MeshBlob, ResourceElement, tags,
};
use tracing::debug;

use crate::error::{CompileError, Result};
use crate::model::Model;

/// Default friction (sliding, torsional, rolling).
pub const DEFAULT_FRICTION: [f64; 3] = [1.0, 0.005, 0.0001];

const AXIS_EPSILON: f64 = 1e-10;

/// Compile a description into a model.
pub fn compile(description: &ComposedDescription) -> Result<Model> {
    let root = description.root();
    if root.tag() != tags::ROOT {
        return Err(CompileError::UnexpectedRoot(root.tag().to_owned()));
    }

    let mut compiler = Compiler {
        description,
        model: Model::empty(),
        qpos0: Vec::new(),
    };
    compiler.model.name = root.text("model").unwrap_or_default().to_owned();

    for child in root.children() {
        match child.tag() {
            tags::ASSET | tags::WORLDBODY => {}
            tags::COMPILER => compiler.compiler(child)?,
            tags::OPTION => compiler.option(child)?,
            other => return Err(unknown(other, tags::ROOT)),
        }
    }
    for asset in root.children_tagged(tags::ASSET) {
        for child in asset.children() {
            match child.tag() {
                tags::MESH => compiler.mesh(child)?,
                tags::HFIELD => compiler.hfield(child)?,
                other => return Err(unknown(other, tags::ASSET)),
            }
        }
    }
    for world in root.children_tagged(tags::WORLDBODY) {
        compiler.worldbody(world)?;
    }

    let model = compiler.finish();
    debug!(
        model = %model.name,
        nbody = model.nbody,
        njnt = model.njnt,
        ngeom = model.ngeom,
        nq = model.nq,
        "compiled description"
    );
    Ok(model)
}

struct Compiler<'a> {
    description: &'a ComposedDescription,
    model: Model,
    qpos0: Vec<f64>,
}

impl Compiler<'_> {
    fn compiler(&self, element: &ResourceElement) -> Result<()> {
        match element.attr("angle") {
            None => Ok(()),
            Some(value) if value.as_text() == Some("radian") => Ok(()),
            Some(value) => Err(CompileError::invalid(
                "angle",
                tags::COMPILER,
                format!("only radians are supported, got '{value}'"),
            )),
        }
    }

    fn option(&mut self, element: &ResourceElement) -> Result<()> {
        let timestep = real(element, "timestep", self.model.timestep)?;
        if !(timestep.is_finite() && timestep > 0.0) {
            return Err(CompileError::invalid(
                "timestep",
                tags::OPTION,
                format!("must be positive, got {timestep}"),
            ));
        }
        self.model.timestep = timestep;
        self.model.gravity = vec3(element, "gravity", self.model.gravity)?;
        Ok(())
    }

    fn mesh(&mut self, element: &ResourceElement) -> Result<()> {
        let name = required_name(element)?;
        let file = element
            .text("file")
            .ok_or_else(|| missing("file", tags::MESH))?;
        let scale = vec3(element, "scale", Vector3::repeat(1.0))?;

        let bytes = match self.description.blob(file) {
            Some(bytes) => Cow::Borrowed(bytes),
            None => Cow::Owned(std::fs::read(file).map_err(|e| mesh_file(file, e))?),
        };
        let blob = MeshBlob::decode(&bytes).map_err(|e| mesh_file(file, e))?;
        if blob.vertices.is_empty() {
            return Err(mesh_file(file, "mesh has no vertices"));
        }

        let nvert = blob.vertices.len();
        let mut faces = Vec::with_capacity(blob.faces.len());
        for face in &blob.faces {
            let mut local = [0_usize; 3];
            for (slot, &index) in local.iter_mut().zip(face) {
                *slot = usize::try_from(index)
                    .ok()
                    .filter(|&i| i < nvert)
                    .ok_or_else(|| mesh_file(file, format!("face index {index} out of range")))?;
            }
            faces.push(local);
        }

        let id = self.model.mesh_name.len();
        register(&mut self.model.mesh_name_to_id, "mesh", name, id)?;
        self.model.mesh_vert_adr.push(self.model.mesh_vert.len());
        self.model.mesh_vert_num.push(nvert);
        self.model.mesh_face_adr.push(self.model.mesh_face.len());
        self.model.mesh_face_num.push(faces.len());
        self.model.mesh_vert.extend(blob.vertices.iter().map(|v| {
            Vector3::new(f64::from(v[0]), f64::from(v[1]), f64::from(v[2])).component_mul(&scale)
        }));
        self.model.mesh_face.extend(faces);
        self.model.mesh_name.push(name.to_owned());
        Ok(())
    }

    fn hfield(&mut self, element: &ResourceElement) -> Result<()> {
        let name = required_name(element)?;
        let nrow = count(element, "nrow")?;
        let ncol = count(element, "ncol")?;
        let size = match element.reals("size").as_deref() {
            Some(&[x, y, z, base]) => Vector4::new(x, y, z, base),
            Some(_) => {
                return Err(CompileError::invalid(
                    "size",
                    tags::HFIELD,
                    "expected 4 numbers",
                ));
            }
            None => return Err(missing("size", tags::HFIELD)),
        };

        let id = self.model.hfield_name.len();
        register(&mut self.model.hfield_name_to_id, "hfield", name, id)?;
        self.model.hfield_adr.push(self.model.hfield_data.len());
        self.model.hfield_nrow.push(nrow);
        self.model.hfield_ncol.push(ncol);
        self.model.hfield_size.push(size);
        self.model
            .hfield_data
            .extend(std::iter::repeat(0.0).take(nrow * ncol));
        self.model.hfield_name.push(name.to_owned());
        Ok(())
    }

    fn worldbody(&mut self, element: &ResourceElement) -> Result<()> {
        for child in element.children() {
            match child.tag() {
                tags::GEOM => self.geom(child, 0)?,
                tags::BODY => self.body(child, 0)?,
                other => return Err(unknown(other, tags::WORLDBODY)),
            }
        }
        Ok(())
    }

    fn body(&mut self, element: &ResourceElement, parent: usize) -> Result<()> {
        let id = self.model.body_parent.len();
        if let Some(name) = element.name() {
            register(&mut self.model.body_name_to_id, "body", name, id)?;
        }
        let m = &mut self.model;
        m.body_parent.push(parent);
        m.body_pos.push(vec3(element, "pos", Vector3::zeros())?);
        m.body_quat.push(quat(element)?);
        m.body_jnt_adr.push(m.jnt_type.len());
        m.body_jnt_num.push(0);
        m.body_free_joint.push(None);
        m.body_static.push(false);
        m.body_mass.push(None);
        m.body_name.push(element.name().map(str::to_owned));

        for joint in element.children_tagged(tags::JOINT) {
            self.joint(joint, id)?;
        }
        let njnt = self.model.jnt_type.len() - self.model.body_jnt_adr[id];
        self.model.body_jnt_num[id] = njnt;
        self.model.body_static[id] = njnt == 0 && self.model.body_static[parent];

        for child in element.children() {
            match child.tag() {
                tags::JOINT => {}
                tags::GEOM => self.geom(child, id)?,
                tags::BODY => self.body(child, id)?,
                tags::INERTIAL => {
                    let mass = real(child, "mass", 0.0)?;
                    if !(mass.is_finite() && mass >= 0.0) {
                        return Err(CompileError::invalid(
                            "mass",
                            tags::INERTIAL,
                            format!("must be non-negative, got {mass}"),
                        ));
                    }
                    self.model.body_mass[id] = Some(mass);
                }
                other => return Err(unknown(other, tags::BODY)),
            }
        }
        Ok(())
    }

    fn joint(&mut self, element: &ResourceElement, body: usize) -> Result<()> {
        let kind = match element.attr("type") {
            None => JointKind::Hinge,
            Some(value) => value
                .as_text()
                .and_then(JointKind::parse)
                .ok_or_else(|| CompileError::UnknownJointType(value.to_string()))?,
        };
        if kind == JointKind::Free && self.model.body_parent[body] != 0 {
            return Err(CompileError::invalid(
                "type",
                tags::JOINT,
                "free joints are only allowed on top-level bodies",
            ));
        }

        let axis = vec3(element, "axis", Vector3::z())?;
        let norm = axis.norm();
        if norm < AXIS_EPSILON {
            return Err(CompileError::invalid("axis", tags::JOINT, "axis has zero length"));
        }
        let limited = flag(element, "limited", false)?;
        let range = match element.reals("range").as_deref() {
            None => (0.0, 0.0),
            Some(&[lower, upper]) if lower <= upper => (lower, upper),
            Some(_) => {
                return Err(CompileError::invalid(
                    "range",
                    tags::JOINT,
                    "expected 'lower upper' with lower <= upper",
                ));
            }
        };

        let id = self.model.jnt_type.len();
        if let Some(name) = element.name() {
            register(&mut self.model.jnt_name_to_id, "joint", name, id)?;
        }
        let m = &mut self.model;
        m.jnt_type.push(kind);
        m.jnt_body.push(body);
        m.jnt_qpos_adr.push(m.nq);
        m.jnt_dof_adr.push(m.nv);
        m.jnt_pos.push(vec3(element, "pos", Vector3::zeros())?);
        m.jnt_axis.push(axis / norm);
        m.jnt_limited.push(limited);
        m.jnt_range.push(range);
        m.jnt_name.push(element.name().map(str::to_owned));
        m.nq += kind.nq();
        m.nv += kind.nv();

        match kind {
            JointKind::Free => {
                let pos = m.body_pos[body];
                let q = m.body_quat[body];
                self.qpos0
                    .extend_from_slice(&[pos.x, pos.y, pos.z, q.w, q.i, q.j, q.k]);
                m.body_free_joint[body] = Some(id);
            }
            JointKind::Ball => self.qpos0.extend_from_slice(&[1.0, 0.0, 0.0, 0.0]),
            JointKind::Hinge | JointKind::Slide => self.qpos0.push(0.0),
        }
        Ok(())
    }

    fn geom(&mut self, element: &ResourceElement, body: usize) -> Result<()> {
        let label = element.name().unwrap_or("<unnamed>");
        let kind = match element.attr("type") {
            None => GeomKind::Sphere,
            Some(value) => value
                .as_text()
                .and_then(GeomKind::parse)
                .ok_or_else(|| CompileError::UnknownGeomType(value.to_string()))?,
        };

        let size = geom_size(element)?;
        let needed = match kind {
            GeomKind::Plane | GeomKind::Hfield | GeomKind::Mesh => 0,
            GeomKind::Sphere => 1,
            GeomKind::Capsule | GeomKind::Cylinder => 2,
            GeomKind::Ellipsoid | GeomKind::Box => 3,
        };
        if size.iter().take(needed).any(|&s| !(s.is_finite() && s > 0.0)) {
            return Err(CompileError::invalid(
                "size",
                label,
                format!("{} needs {needed} positive size values", kind.as_str()),
            ));
        }

        let data_id = match kind {
            GeomKind::Mesh => Some(self.asset_ref(element, label, "mesh")?),
            GeomKind::Hfield => Some(self.asset_ref(element, label, "hfield")?),
            _ => None,
        };
        let rbound = match (kind, data_id) {
            (GeomKind::Mesh, Some(mesh)) => {
                let adr = self.model.mesh_vert_adr[mesh];
                let num = self.model.mesh_vert_num[mesh];
                mesh_rbound(&self.model.mesh_vert[adr..adr + num])
            }
            (GeomKind::Hfield, Some(hfield)) => heightfield_rbound(&self.model.hfield_size[hfield]),
            _ => primitive_rbound(kind, &size),
        };

        let friction = match element.reals("friction") {
            None => Vector3::from(DEFAULT_FRICTION),
            Some(values) if (1..=3).contains(&values.len()) => {
                let mut friction = Vector3::from(DEFAULT_FRICTION);
                for (slot, value) in friction.iter_mut().zip(values) {
                    *slot = value;
                }
                friction
            }
            Some(_) => {
                return Err(CompileError::invalid(
                    "friction",
                    label,
                    "expected 1 to 3 numbers",
                ));
            }
        };

        let id = self.model.geom_type.len();
        if let Some(name) = element.name() {
            register(&mut self.model.geom_name_to_id, "geom", name, id)?;
        }
        let m = &mut self.model;
        m.geom_type.push(kind);
        m.geom_body.push(body);
        m.geom_pos.push(vec3(element, "pos", Vector3::zeros())?);
        m.geom_quat.push(quat(element)?);
        m.geom_size.push(size);
        m.geom_rbound.push(rbound);
        m.geom_friction.push(friction);
        m.geom_contype.push(bits(element, "contype")?);
        m.geom_conaffinity.push(bits(element, "conaffinity")?);
        m.geom_data_id.push(data_id);
        m.geom_name.push(element.name().map(str::to_owned));
        Ok(())
    }

    fn asset_ref(
        &self,
        element: &ResourceElement,
        geom: &str,
        kind: &'static str,
    ) -> Result<usize> {
        let name = element.text(kind).ok_or_else(|| missing(kind, geom))?;
        let map = if kind == "mesh" {
            &self.model.mesh_name_to_id
        } else {
            &self.model.hfield_name_to_id
        };
        map.get(name)
            .copied()
            .ok_or_else(|| CompileError::UndefinedAsset {
                kind,
                name: name.to_owned(),
                geom: geom.to_owned(),
            })
    }

    fn finish(mut self) -> Model {
        let m = &mut self.model;
        m.nbody = m.body_parent.len();
        m.njnt = m.jnt_type.len();
        m.ngeom = m.geom_type.len();
        m.qpos0 = DVector::from_vec(self.qpos0);
        self.model
    }
}

/// Bounding-sphere radius of a primitive from its engine size.
#[must_use]
pub fn primitive_rbound(kind: GeomKind, size: &Vector3<f64>) -> f64 {
    match kind {
        GeomKind::Sphere => size.x,
        GeomKind::Capsule => size.x + size.y,
        GeomKind::Cylinder => size.x.hypot(size.y),
        GeomKind::Ellipsoid => size.max(),
        GeomKind::Box => size.norm(),
        GeomKind::Plane | GeomKind::Hfield | GeomKind::Mesh => 0.0,
    }
}

fn register(
    map: &mut HashMap<String, usize>,
    kind: &'static str,
    name: &str,
    id: usize,
) -> Result<()> {
    match map.entry(name.to_owned()) {
        Entry::Occupied(_) => Err(CompileError::DuplicateName {
            kind,
            name: name.to_owned(),
        }),
        Entry::Vacant(slot) => {
            slot.insert(id);
            Ok(())
        }
    }
}

fn unknown(tag: &str, context: &str) -> CompileError {
    CompileError::UnknownElement {
        tag: tag.to_owned(),
        context: context.to_owned(),
    }
}

fn missing(attribute: &'static str, element: &str) -> CompileError {
    CompileError::MissingAttribute {
        attribute,
        element: element.to_owned(),
    }
}

fn mesh_file(file: &str, message: impl ToString) -> CompileError {
    CompileError::MeshFile {
        file: file.to_owned(),
        message: message.to_string(),
    }
}

fn required_name(element: &ResourceElement) -> Result<&str> {
    element.name().ok_or_else(|| missing("name", element.tag()))
}

fn expect_reals(
    element: &ResourceElement,
    key: &'static str,
    value: &AttrValue,
    len: usize,
) -> Result<Vec<f64>> {
    value
        .as_reals()
        .filter(|v| v.len() == len && v.iter().all(|x| x.is_finite()))
        .ok_or_else(|| {
            CompileError::invalid(
                key,
                element.tag(),
                format!("expected {len} finite numbers, got '{value}'"),
            )
        })
}

fn vec3(
    element: &ResourceElement,
    key: &'static str,
    default: Vector3<f64>,
) -> Result<Vector3<f64>> {
    match element.attr(key) {
        None => Ok(default),
        Some(value) => Ok(Vector3::from_column_slice(&expect_reals(element, key, value, 3)?)),
    }
}

fn quat(element: &ResourceElement) -> Result<UnitQuaternion<f64>> {
    let Some(value) = element.attr("quat") else {
        return Ok(UnitQuaternion::identity());
    };
    let q = expect_reals(element, "quat", value, 4)?;
    let q = Quaternion::new(q[0], q[1], q[2], q[3]);
    if q.norm() < AXIS_EPSILON {
        return Err(CompileError::invalid("quat", element.tag(), "quaternion has zero norm"));
    }
    Ok(UnitQuaternion::from_quaternion(q))
}

fn real(element: &ResourceElement, key: &'static str, default: f64) -> Result<f64> {
    match element.attr(key) {
        None => Ok(default),
        Some(value) => Ok(expect_reals(element, key, value, 1)?[0]),
    }
}

fn flag(element: &ResourceElement, key: &'static str, default: bool) -> Result<bool> {
    match element.attr(key) {
        None => Ok(default),
        Some(value) => value.as_bool().ok_or_else(|| {
            CompileError::invalid(key, element.tag(), format!("expected true/false, got '{value}'"))
        }),
    }
}

fn count(element: &ResourceElement, key: &'static str) -> Result<usize> {
    let value = element.attr(key).ok_or_else(|| missing(key, element.tag()))?;
    value
        .as_int()
        .and_then(|n| usize::try_from(n).ok())
        .filter(|&n| n > 0)
        .ok_or_else(|| {
            CompileError::invalid(
                key,
                element.tag(),
                format!("expected a positive count, got '{value}'"),
            )
        })
}

fn bits(element: &ResourceElement, key: &'static str) -> Result<i32> {
    match element.attr(key) {
        None => Ok(1),
        Some(value) => value
            .as_int()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| {
                CompileError::invalid(
                    key,
                    element.tag(),
                    format!("expected an integer, got '{value}'"),
                )
            }),
    }
}

fn geom_size(element: &ResourceElement) -> Result<Vector3<f64>> {
    let Some(value) = element.attr("size") else {
        return Ok(Vector3::zeros());
    };
    let values = value
        .as_reals()
        .filter(|v| v.len() <= 3 && v.iter().all(|x| x.is_finite()))
        .ok_or_else(|| {
            CompileError::invalid(
                "size",
                element.tag(),
                format!("expected up to 3 numbers, got '{value}'"),
            )
        })?;
    let mut size = Vector3::zeros();
    for (slot, value) in size.iter_mut().zip(values) {
        *slot = value;
    }
    Ok(size)
}
