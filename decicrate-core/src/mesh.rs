//! Mesh data structures and functionality

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// A triangle mesh with vertices, faces and optional attributes.
///
/// Texture coordinates are stored per face corner: `tex_coords` is a pool of
/// `(u, v)` pairs and `face_tex` holds, for every face, the index of the pool
/// entry used by each of its three corners. This matches how OBJ files store
/// them and lets a vertex sitting on a texture seam carry different
/// coordinates in different faces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
    pub tex_coords: Option<Vec<TexCoord>>,
    pub face_tex: Option<Vec<[usize; 3]>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
            tex_coords: None,
            face_tex: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
            tex_coords: None,
            face_tex: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Whether the mesh carries texture coordinates with per-corner indices
    pub fn has_texture(&self) -> bool {
        self.tex_coords.is_some() && self.face_tex.is_some()
    }

    /// Recompute per-vertex normals as the area-weighted average of the
    /// normals of the incident faces. Vertices without faces get +Z.
    pub fn compute_vertex_normals(&mut self) {
        let mut accum = vec![Vector3f::zeros(); self.vertices.len()];
        for face in &self.faces {
            let v0 = self.vertices[face[0]];
            let v1 = self.vertices[face[1]];
            let v2 = self.vertices[face[2]];
            // Unnormalised cross product is proportional to the face area
            let n = (v1 - v0).cross(&(v2 - v0));
            for &vi in face {
                accum[vi] += n;
            }
        }
        let normals = accum
            .into_iter()
            .map(|n| {
                let len = n.norm();
                if len > f32::EPSILON && len.is_finite() {
                    n / len
                } else {
                    Vector3f::new(0.0, 0.0, 1.0)
                }
            })
            .collect();
        self.normals = Some(normals);
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Set texture coordinates and the per-corner indices into them.
    ///
    /// Ignored unless there is exactly one index triple per face.
    pub fn set_texture(&mut self, tex_coords: Vec<TexCoord>, face_tex: Vec<[usize; 3]>) {
        if face_tex.len() == self.faces.len() {
            self.tex_coords = Some(tex_coords);
            self.face_tex = Some(face_tex);
        }
    }

    /// Check structural consistency: face indices in range and attribute
    /// counts matching their owners. Texture index values are not checked.
    pub fn validate(&self) -> Result<()> {
        let nv = self.vertices.len();
        for (fi, face) in self.faces.iter().enumerate() {
            if let Some(&bad) = face.iter().find(|&&vi| vi >= nv) {
                return Err(Error::InvalidData(format!(
                    "Face {} references vertex {} but mesh has {} vertices",
                    fi, bad, nv
                )));
            }
        }
        if let Some(ref normals) = self.normals {
            if normals.len() != nv {
                return Err(Error::InvalidData(format!(
                    "Normal count mismatch: {} normals for {} vertices",
                    normals.len(),
                    nv
                )));
            }
        }
        match (&self.tex_coords, &self.face_tex) {
            (Some(_), Some(face_tex)) if face_tex.len() != self.faces.len() => {
                Err(Error::InvalidData(format!(
                    "Texture index count mismatch: {} entries for {} faces",
                    face_tex.len(),
                    self.faces.len()
                )))
            }
            (Some(_), None) | (None, Some(_)) => Err(Error::InvalidData(
                "Texture coordinates and per-corner texture indices must be set together"
                    .to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}
