//! Shape and size conversion.
//!
//! Pure functions from abstract collider parameters to engine size arrays,
//! volumes and bounding radii. Abstract box sizes are full extents while the
//! engine wants half-extents; capsule and cylinder lengths likewise become
//! half-lengths.

use std::f64::consts::PI;

use nalgebra::{Point3, Vector3, Vector4};
use sim_scene::{EPS, ShapeKind};
use smallvec::{SmallVec, smallvec};

use crate::engine::GeomKind;

/// Lower bound for per-axis mesh rescale ratios.
pub const MIN_RESCALE: f64 = 1e-3;

/// Engine geometry type for a shape kind. Compounds have none.
#[must_use]
pub const fn geom_kind(kind: ShapeKind) -> Option<GeomKind> {
    match kind {
        ShapeKind::Box => Some(GeomKind::Box),
        ShapeKind::Sphere => Some(GeomKind::Sphere),
        ShapeKind::Capsule => Some(GeomKind::Capsule),
        ShapeKind::Cylinder => Some(GeomKind::Cylinder),
        ShapeKind::Ellipsoid => Some(GeomKind::Ellipsoid),
        ShapeKind::Plane => Some(GeomKind::Plane),
        ShapeKind::Mesh => Some(GeomKind::Mesh),
        ShapeKind::Heightfield => Some(GeomKind::Hfield),
        ShapeKind::Compound => None,
    }
}

/// Engine size array for a shape.
///
/// ```
/// use sim_binding::shape::engine_size;
/// use sim_scene::ShapeKind;
/// use nalgebra::Vector3;
///
/// assert_eq!(engine_size(ShapeKind::Box, &Vector3::new(2.0, 4.0, 6.0)).as_slice(), &[1.0, 2.0, 3.0]);
/// assert_eq!(engine_size(ShapeKind::Capsule, &Vector3::new(1.0, 10.0, 0.0)).as_slice(), &[1.0, 5.0]);
/// ```
#[must_use]
pub fn engine_size(kind: ShapeKind, size: &Vector3<f64>) -> SmallVec<[f64; 3]> {
    match kind {
        ShapeKind::Box => smallvec![0.5 * size.x, 0.5 * size.y, 0.5 * size.z],
        ShapeKind::Sphere => smallvec![size.x],
        ShapeKind::Capsule | ShapeKind::Cylinder => smallvec![size.x, 0.5 * size.y],
        ShapeKind::Ellipsoid
        | ShapeKind::Plane
        | ShapeKind::Mesh
        | ShapeKind::Heightfield
        | ShapeKind::Compound => smallvec![size.x, size.y, size.z],
    }
}

/// [`engine_size`] zero-padded to three entries.
#[must_use]
pub fn engine_size_padded(kind: ShapeKind, size: &Vector3<f64>) -> Vector3<f64> {
    let values = engine_size(kind, size);
    let mut padded = Vector3::zeros();
    for (dst, src) in padded.iter_mut().zip(values.iter()) {
        *dst = *src;
    }
    padded
}

/// Volume of a closed primitive. `None` for planes, meshes, heightfields
/// and compounds.
#[must_use]
pub fn primitive_volume(kind: ShapeKind, size: &Vector3<f64>) -> Option<f64> {
    match kind {
        ShapeKind::Box => Some(size.x * size.y * size.z),
        ShapeKind::Sphere => Some(4.0 / 3.0 * PI * size.x.powi(3)),
        ShapeKind::Capsule => {
            let r = size.x;
            Some(PI * r * r * size.y + 4.0 / 3.0 * PI * r.powi(3))
        }
        ShapeKind::Cylinder => Some(PI * size.x * size.x * size.y),
        ShapeKind::Ellipsoid => Some(4.0 / 3.0 * PI * size.x * size.y * size.z),
        ShapeKind::Plane | ShapeKind::Mesh | ShapeKind::Heightfield | ShapeKind::Compound => None,
    }
}

/// Bounding-sphere radius about the geometry origin. Planes report zero
/// (unbounded); meshes and heightfields need their data, see
/// [`mesh_rbound`] and [`heightfield_rbound`].
#[must_use]
pub fn primitive_rbound(kind: ShapeKind, size: &Vector3<f64>) -> Option<f64> {
    let s = engine_size_padded(kind, size);
    match kind {
        ShapeKind::Box => Some(s.norm()),
        ShapeKind::Sphere => Some(s.x),
        ShapeKind::Capsule => Some(s.x + s.y),
        ShapeKind::Cylinder => Some(s.x.hypot(s.y)),
        ShapeKind::Ellipsoid => Some(s.x.max(s.y).max(s.z)),
        ShapeKind::Plane => Some(0.0),
        ShapeKind::Mesh | ShapeKind::Heightfield | ShapeKind::Compound => None,
    }
}

/// Whether a size is usable for a shape kind.
#[must_use]
pub fn is_valid_size(kind: ShapeKind, size: &Vector3<f64>) -> bool {
    if size.iter().any(|v| !v.is_finite()) {
        return false;
    }
    match kind {
        ShapeKind::Sphere => size.x > 0.0,
        ShapeKind::Capsule | ShapeKind::Cylinder => size.x > 0.0 && size.y >= 0.0,
        ShapeKind::Box | ShapeKind::Ellipsoid | ShapeKind::Mesh | ShapeKind::Heightfield => {
            size.iter().all(|v| *v > 0.0)
        }
        ShapeKind::Plane => size.iter().all(|v| *v >= 0.0),
        ShapeKind::Compound => true,
    }
}

/// Elevation normalization result.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedHeights {
    /// Maximum raw height (floored at `EPS`).
    pub max_height: f64,
    /// Samples scaled into `[0, 1]`.
    pub samples: Vec<f64>,
}

/// Normalize raw heights by their maximum, clamping negatives to zero.
///
/// A maximum at or below `EPS` yields all-zero samples with `EPS` as the
/// reported maximum so the engine still gets a positive elevation.
#[must_use]
pub fn normalize_heights(heights: &[f64]) -> NormalizedHeights {
    let raw_max = heights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if raw_max.is_nan() || raw_max <= EPS {
        return NormalizedHeights {
            max_height: EPS,
            samples: vec![0.0; heights.len()],
        };
    }
    NormalizedHeights {
        max_height: raw_max,
        samples: heights.iter().map(|h| (h / raw_max).max(0.0)).collect(),
    }
}

/// Heightfield asset size: `(0.5 sx, 0.5 sy, max_height sz, base)`.
#[must_use]
pub fn heightfield_asset_size(size: &Vector3<f64>, max_height: f64, base: f64) -> Vector4<f64> {
    Vector4::new(0.5 * size.x, 0.5 * size.y, max_height * size.z, base)
}

/// Half the diagonal of a heightfield's bounding box.
#[must_use]
pub fn heightfield_rbound(asset_size: &Vector4<f64>) -> f64 {
    let min = Vector3::new(-asset_size.x, -asset_size.y, -asset_size.w);
    let max = Vector3::new(asset_size.x, asset_size.y, asset_size.z);
    0.5 * (max - min).norm()
}

/// Half the diagonal of a vertex set's bounding box.
#[must_use]
pub fn mesh_rbound(vertices: &[Vector3<f64>]) -> f64 {
    if vertices.is_empty() {
        return 0.0;
    }
    let mut min = Vector3::repeat(f64::INFINITY);
    let mut max = Vector3::repeat(f64::NEG_INFINITY);
    for v in vertices {
        min = min.inf(v);
        max = max.sup(v);
    }
    0.5 * (max - min).norm()
}

/// Per-axis scale taking a mesh from `current` to `target` size.
#[must_use]
pub fn rescale_ratio(target: &Vector3<f64>, current: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(
        (target.x / current.x).max(MIN_RESCALE),
        (target.y / current.y).max(MIN_RESCALE),
        (target.z / current.z).max(MIN_RESCALE),
    )
}

/// Vertices of the placeholder tetrahedron used for meshes without data.
#[must_use]
pub fn placeholder_vertices() -> Vec<Point3<f64>> {
    vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
    ]
}

/// Faces of the placeholder tetrahedron.
#[must_use]
pub fn placeholder_faces() -> Vec<[u32; 3]> {
    vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn box_uses_half_extents() {
        let size = engine_size(ShapeKind::Box, &Vector3::new(2.0, 4.0, 6.0));
        assert_eq!(size.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn capsule_and_cylinder_use_half_length() {
        let capsule = engine_size(ShapeKind::Capsule, &Vector3::new(1.0, 10.0, 7.0));
        assert_eq!(capsule.as_slice(), &[1.0, 5.0]);
        let cylinder = engine_size(ShapeKind::Cylinder, &Vector3::new(0.5, 2.0, 0.0));
        assert_eq!(cylinder.as_slice(), &[0.5, 1.0]);
    }

    #[test]
    fn sphere_and_passthrough() {
        assert_eq!(
            engine_size(ShapeKind::Sphere, &Vector3::new(0.3, 9.0, 9.0)).as_slice(),
            &[0.3]
        );
        let raw = Vector3::new(3.0, 4.0, 0.5);
        assert_eq!(
            engine_size(ShapeKind::Heightfield, &raw).as_slice(),
            raw.as_slice()
        );
        assert_eq!(engine_size(ShapeKind::Mesh, &raw).as_slice(), raw.as_slice());
        assert_eq!(engine_size(ShapeKind::Plane, &raw).as_slice(), raw.as_slice());
    }

    #[test]
    fn padded_size_fills_zeros() {
        let padded = engine_size_padded(ShapeKind::Capsule, &Vector3::new(1.0, 10.0, 7.0));
        assert_eq!(padded, Vector3::new(1.0, 5.0, 0.0));
    }

    #[test]
    fn volumes() {
        assert_relative_eq!(
            primitive_volume(ShapeKind::Box, &Vector3::new(2.0, 4.0, 6.0)).unwrap(),
            48.0
        );
        assert_relative_eq!(
            primitive_volume(ShapeKind::Sphere, &Vector3::new(1.0, 0.0, 0.0)).unwrap(),
            4.0 / 3.0 * PI,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            primitive_volume(ShapeKind::Cylinder, &Vector3::new(1.0, 2.0, 0.0)).unwrap(),
            2.0 * PI,
            epsilon = 1e-12
        );
        assert!(primitive_volume(ShapeKind::Plane, &Vector3::new(1.0, 1.0, 1.0)).is_none());
        assert!(primitive_volume(ShapeKind::Mesh, &Vector3::new(1.0, 1.0, 1.0)).is_none());
        assert!(primitive_volume(ShapeKind::Heightfield, &Vector3::new(1.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn rbounds() {
        assert_relative_eq!(
            primitive_rbound(ShapeKind::Box, &Vector3::new(2.0, 4.0, 4.0)).unwrap(),
            3.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            primitive_rbound(ShapeKind::Capsule, &Vector3::new(1.0, 10.0, 0.0)).unwrap(),
            6.0
        );
        assert_eq!(
            primitive_rbound(ShapeKind::Plane, &Vector3::new(5.0, 5.0, 1.0)),
            Some(0.0)
        );
    }

    #[test]
    fn heightfield_normalization() {
        let normalized = normalize_heights(&[0.0, 2.0, 8.0, -1.0]);
        assert_relative_eq!(normalized.max_height, 8.0);
        assert_eq!(normalized.samples, vec![0.0, 0.25, 1.0, 0.0]);
    }

    #[test]
    fn flat_heightfield_normalizes_to_zero() {
        let normalized = normalize_heights(&[-1.0, 0.0, -3.0]);
        assert_eq!(normalized.samples, vec![0.0, 0.0, 0.0]);
        assert!(normalized.max_height > 0.0);
    }

    #[test]
    fn heightfield_asset_size_layout() {
        let size = heightfield_asset_size(&Vector3::new(10.0, 6.0, 0.5), 8.0, 1.0);
        assert_eq!(size, Vector4::new(5.0, 3.0, 4.0, 1.0));
    }

    #[test]
    fn mesh_bounds_and_rescale() {
        let verts = [
            Vector3::new(-1.0, -1.0, -1.0),
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(0.0, 0.5, 0.0),
        ];
        assert_relative_eq!(mesh_rbound(&verts), 3.0_f64.sqrt(), epsilon = 1e-12);

        let ratio = rescale_ratio(&Vector3::new(2.0, 0.0, 1.0), &Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(ratio, Vector3::new(2.0, MIN_RESCALE, 1.0));
    }

    #[test]
    fn size_validation() {
        assert!(is_valid_size(ShapeKind::Box, &Vector3::new(1.0, 1.0, 1.0)));
        assert!(!is_valid_size(ShapeKind::Box, &Vector3::new(1.0, 0.0, 1.0)));
        assert!(!is_valid_size(ShapeKind::Sphere, &Vector3::new(f64::NAN, 1.0, 1.0)));
        assert!(is_valid_size(ShapeKind::Plane, &Vector3::new(0.0, 0.0, 1.0)));
    }
}
