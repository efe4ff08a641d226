//! Collider adapters and runtime field mutation.
//!
//! Every operation here mutates continuous fields only: sizes, bounding
//! radii, vertex positions, elevation samples, collision bits and friction.
//! Anything that would change topology (vertex counts, grid dimensions) is
//! rejected before a single value is written.

use nalgebra::{Point3, Vector3};
use sim_scene::{Collider, EPS, MeshSource, Shape, ShapeKind};
use smallvec::SmallVec;
use tracing::warn;

use crate::engine::{HfieldAddress, MeshAddress, PhysicsEngine};
use crate::error::BindingError;
use crate::shape::{
    engine_size_padded, heightfield_asset_size, heightfield_rbound, is_valid_size, mesh_rbound,
    normalize_heights, primitive_rbound, rescale_ratio,
};

/// Asset a collider's geometry references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetBinding {
    /// Primitive or compound geometry.
    None,
    /// Mesh asset.
    Mesh {
        /// Engine mesh index.
        id: usize,
        /// Vertex and face addresses.
        address: MeshAddress,
    },
    /// Heightfield asset.
    Hfield {
        /// Engine heightfield index.
        id: usize,
        /// Sample address and grid.
        address: HfieldAddress,
    },
}

/// A collider resolved against the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ColliderBinding {
    /// Collider name.
    pub name: String,
    /// Shape kind.
    pub kind: ShapeKind,
    /// Engine geometry indices: one, or one per compound part.
    pub geoms: SmallVec<[usize; 1]>,
    /// Referenced asset.
    pub asset: AssetBinding,
}

impl ColliderBinding {
    fn unsupported(&self, operation: &str) -> BindingError {
        BindingError::unsupported(
            &self.name,
            format!("{operation} is not supported on {}-colliders", self.kind),
        )
    }

    fn single_geom(&self) -> crate::Result<usize> {
        match self.geoms.as_slice() {
            [geom] => Ok(*geom),
            _ => Err(self.unsupported("per-geometry write")),
        }
    }

    /// Resize the collider.
    ///
    /// Primitives get new engine sizes and bounding radii. Meshes are scaled
    /// per axis by the ratio between the new and current size. Heightfields
    /// rewrite their asset size, keeping the current elevation and base.
    pub fn set_size<E: PhysicsEngine>(
        &self,
        engine: &E,
        model: &mut E::Model,
        collider: &mut Collider,
        size: Vector3<f64>,
    ) -> crate::Result<()> {
        if !is_valid_size(self.kind, &size) {
            return Err(BindingError::mismatch(
                &self.name,
                format!("a valid {} size", self.kind),
                format!("{:?}", size.as_slice()),
            ));
        }

        match (self.kind, self.asset) {
            (ShapeKind::Compound, _) => return Err(self.unsupported("resizing")),
            (ShapeKind::Mesh, AssetBinding::Mesh { address, .. }) => {
                let geom = self.single_geom()?;
                let ratio = rescale_ratio(&size, &collider.size);
                let vertices = mesh_vertices(engine, model, &address)
                    .ok_or_else(|| {
                        BindingError::mismatch(&self.name, "mesh vertices in range", "out of range")
                    })?;
                for v in vertices.iter_mut() {
                    *v = v.component_mul(&ratio);
                }
                let rbound = mesh_rbound(vertices);
                write_rbound(engine, model, geom, rbound);
                collider.size = collider.size.component_mul(&ratio);
            }
            (ShapeKind::Heightfield, AssetBinding::Hfield { id, .. }) => {
                let geom = self.single_geom()?;
                let Some(current) = engine.hfield_size_mut(model).get(id).copied() else {
                    return Err(BindingError::mismatch(&self.name, "heightfield in range", id));
                };
                let max_height = heights_of(collider).map_or_else(
                    || current.z / collider.size.z.max(EPS),
                    |h| normalize_heights(h).max_height,
                );
                let asset_size = heightfield_asset_size(&size, max_height, current.w);
                engine.hfield_size_mut(model)[id] = asset_size;
                write_rbound(engine, model, geom, heightfield_rbound(&asset_size));
                collider.size = size;
            }
            (ShapeKind::Mesh | ShapeKind::Heightfield, _) => {
                return Err(BindingError::unbound(&self.name));
            }
            (kind, _) => {
                let geom = self.single_geom()?;
                if let Some(slot) = engine.geom_size_mut(model).get_mut(geom) {
                    *slot = engine_size_padded(kind, &size);
                }
                if let Some(rbound) = primitive_rbound(kind, &size) {
                    write_rbound(engine, model, geom, rbound);
                }
                collider.size = size;
            }
        }
        Ok(())
    }

    /// Replace the elevation samples of a heightfield collider.
    pub fn set_elevation<E: PhysicsEngine>(
        &self,
        engine: &E,
        model: &mut E::Model,
        collider: &mut Collider,
        heights: &[f64],
    ) -> crate::Result<()> {
        self.write_elevation(engine, model, &collider.size, heights)?;
        if let Shape::Heightfield(data) = &mut collider.shape {
            data.heights = heights.to_vec();
        }
        Ok(())
    }

    /// Write raw heights into the engine without touching the scene.
    pub(crate) fn write_elevation<E: PhysicsEngine>(
        &self,
        engine: &E,
        model: &mut E::Model,
        size: &Vector3<f64>,
        heights: &[f64],
    ) -> crate::Result<()> {
        let AssetBinding::Hfield { id, address } = self.asset else {
            return Err(self.unsupported("setting elevation"));
        };
        if heights.len() != address.len() {
            warn!(
                collider = %self.name,
                expected = address.len(),
                actual = heights.len(),
                "elevation length does not match the heightfield grid"
            );
            return Err(BindingError::mismatch(
                &self.name,
                format!("{}x{} samples", address.nrow, address.ncol),
                heights.len(),
            ));
        }

        let normalized = normalize_heights(heights);
        let samples = engine
            .hfield_data_mut(model)
            .get_mut(address.adr..address.adr + address.len())
            .ok_or_else(|| BindingError::mismatch(&self.name, "samples in range", "out of range"))?;
        samples.copy_from_slice(&normalized.samples);

        let Some(asset_size) = engine.hfield_size_mut(model).get_mut(id) else {
            return Err(BindingError::mismatch(&self.name, "heightfield in range", id));
        };
        asset_size.z = normalized.max_height * size.z;
        let rbound = heightfield_rbound(asset_size);
        if let Some(&geom) = self.geoms.first() {
            write_rbound(engine, model, geom, rbound);
        }
        Ok(())
    }

    /// Move the vertices of a mesh collider. The vertex count is fixed.
    pub fn set_mesh_vertices<E: PhysicsEngine>(
        &self,
        engine: &E,
        model: &mut E::Model,
        collider: &mut Collider,
        vertices: &[Point3<f64>],
    ) -> crate::Result<()> {
        let AssetBinding::Mesh { address, .. } = self.asset else {
            return Err(self.unsupported("setting vertices"));
        };
        if vertices.len() != address.vert_num {
            return Err(BindingError::unsupported(
                &self.name,
                format!(
                    "changing the vertex count ({} -> {}) changes topology",
                    address.vert_num,
                    vertices.len()
                ),
            ));
        }
        let geom = self.single_geom()?;

        let scale = collider.size;
        let dst = mesh_vertices(engine, model, &address)
            .ok_or_else(|| {
                BindingError::mismatch(&self.name, "mesh vertices in range", "out of range")
            })?;
        for (dst, src) in dst.iter_mut().zip(vertices) {
            *dst = src.coords.component_mul(&scale);
        }
        let rbound = mesh_rbound(dst);
        write_rbound(engine, model, geom, rbound);

        if let Shape::Mesh(MeshSource::Inline { vertices: stored, .. }) = &mut collider.shape {
            stored.clear();
            stored.extend_from_slice(vertices);
        }
        Ok(())
    }

    /// Set the collision group (engine contype) of every geometry.
    pub fn set_group<E: PhysicsEngine>(
        &self,
        engine: &E,
        model: &mut E::Model,
        collider: &mut Collider,
        group: i32,
    ) {
        for &geom in &self.geoms {
            if let Some(slot) = engine.geom_contype_mut(model).get_mut(geom) {
                *slot = group;
            }
        }
        collider.collision_group = group;
    }

    /// Set the collision mask (engine conaffinity) of every geometry.
    pub fn set_mask<E: PhysicsEngine>(
        &self,
        engine: &E,
        model: &mut E::Model,
        collider: &mut Collider,
        mask: i32,
    ) {
        for &geom in &self.geoms {
            if let Some(slot) = engine.geom_conaffinity_mut(model).get_mut(geom) {
                *slot = mask;
            }
        }
        collider.collision_mask = mask;
    }

    /// Set the sliding friction coefficient; torsional and rolling terms
    /// are kept.
    pub fn set_friction<E: PhysicsEngine>(
        &self,
        engine: &E,
        model: &mut E::Model,
        collider: &mut Collider,
        sliding: f64,
    ) -> crate::Result<()> {
        if !(sliding.is_finite() && sliding >= 0.0) {
            return Err(BindingError::mismatch(&self.name, "finite non-negative friction", sliding));
        }
        for &geom in &self.geoms {
            if let Some(friction) = engine.geom_friction_mut(model).get_mut(geom) {
                friction.x = sliding;
            }
        }
        collider.friction.x = sliding;
        Ok(())
    }
}

fn heights_of(collider: &Collider) -> Option<&[f64]> {
    match &collider.shape {
        Shape::Heightfield(data) => Some(data.heights.as_slice()),
        _ => None,
    }
}

fn mesh_vertices<'m, E: PhysicsEngine>(
    engine: &E,
    model: &'m mut E::Model,
    address: &MeshAddress,
) -> Option<&'m mut [Vector3<f64>]> {
    engine
        .mesh_vert_mut(model)
        .get_mut(address.vert_adr..address.vert_adr + address.vert_num)
}

fn write_rbound<E: PhysicsEngine>(engine: &E, model: &mut E::Model, geom: usize, rbound: f64) {
    if let Some(slot) = engine.geom_rbound_mut(model).get_mut(geom) {
        *slot = rbound;
    }
}
