//! Binary mesh blobs.
//!
//! Layout (little-endian): four `i32` counts `nvert, nnormal, ntexcoord,
//! nface`, then `3 * nvert` `f32` positions, `3 * nnormal` `f32` normals,
//! `2 * ntexcoord` `f32` texture coordinates and `3 * nface` `i32` indices.
//! Synthesized blobs carry no normals or texture coordinates.

use nalgebra::Point3;
use thiserror::Error;

/// Errors decoding a mesh blob.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshBlobError {
    /// Fewer bytes than the header promises.
    #[error("mesh blob truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes implied by the header.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// A header count is negative.
    #[error("mesh blob header has negative count {0}")]
    NegativeCount(i32),

    /// A face references a vertex that does not exist.
    #[error("mesh blob face index {index} out of range for {vertices} vertices")]
    FaceIndex {
        /// Offending index.
        index: i32,
        /// Vertex count.
        vertices: usize,
    },
}

/// Decoded mesh data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshBlob {
    /// Vertex positions.
    pub vertices: Vec<[f32; 3]>,
    /// Triangles.
    pub faces: Vec<[i32; 3]>,
}

impl MeshBlob {
    /// Build from scene-side vertex and face arrays.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn from_parts(vertices: &[Point3<f64>], faces: &[[u32; 3]]) -> Self {
        Self {
            vertices: vertices
                .iter()
                .map(|v| [v.x as f32, v.y as f32, v.z as f32])
                .collect(),
            faces: faces
                .iter()
                .map(|f| [f[0] as i32, f[1] as i32, f[2] as i32])
                .collect(),
        }
    }

    /// Encode to bytes.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + 12 * self.vertices.len() + 12 * self.faces.len());
        for count in [self.vertices.len() as i32, 0, 0, self.faces.len() as i32] {
            out.extend_from_slice(&count.to_le_bytes());
        }
        for v in &self.vertices {
            for c in v {
                out.extend_from_slice(&c.to_le_bytes());
            }
        }
        for f in &self.faces {
            for i in f {
                out.extend_from_slice(&i.to_le_bytes());
            }
        }
        out
    }

    /// Decode from bytes, validating the header and face indices.
    pub fn decode(bytes: &[u8]) -> std::result::Result<Self, MeshBlobError> {
        let mut reader = Reader { bytes, offset: 0 };
        let mut counts = [0usize; 4];
        for count in &mut counts {
            let raw = reader.i32(16)?;
            *count = usize::try_from(raw).map_err(|_| MeshBlobError::NegativeCount(raw))?;
        }
        let [nvert, nnormal, ntexcoord, nface] = counts;
        let expected = 16 + 4 * (3 * nvert + 3 * nnormal + 2 * ntexcoord + 3 * nface);
        if bytes.len() < expected {
            return Err(MeshBlobError::Truncated {
                expected,
                actual: bytes.len(),
            });
        }

        let mut vertices = Vec::with_capacity(nvert);
        for _ in 0..nvert {
            vertices.push([
                reader.f32(expected)?,
                reader.f32(expected)?,
                reader.f32(expected)?,
            ]);
        }
        reader.offset += 4 * (3 * nnormal + 2 * ntexcoord);

        let mut faces = Vec::with_capacity(nface);
        for _ in 0..nface {
            let face = [
                reader.i32(expected)?,
                reader.i32(expected)?,
                reader.i32(expected)?,
            ];
            for &index in &face {
                if usize::try_from(index).map_or(true, |i| i >= nvert) {
                    return Err(MeshBlobError::FaceIndex {
                        index,
                        vertices: nvert,
                    });
                }
            }
            faces.push(face);
        }
        Ok(Self { vertices, faces })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl Reader<'_> {
    fn word(&mut self, expected: usize) -> std::result::Result<[u8; 4], MeshBlobError> {
        let end = self.offset + 4;
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or(MeshBlobError::Truncated {
                expected: expected.max(end),
                actual: self.bytes.len(),
            })?;
        self.offset = end;
        let mut word = [0u8; 4];
        word.copy_from_slice(slice);
        Ok(word)
    }

    fn i32(&mut self, expected: usize) -> std::result::Result<i32, MeshBlobError> {
        self.word(expected).map(i32::from_le_bytes)
    }

    fn f32(&mut self, expected: usize) -> std::result::Result<f32, MeshBlobError> {
        self.word(expected).map(f32::from_le_bytes)
    }
}
