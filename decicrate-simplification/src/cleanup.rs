//! Pre-decimation cleanup
//!
//! Merges near-coincident vertices, then drops the faces this makes
//! degenerate, exact duplicate faces and vertices no face references.

use decicrate_core::{Drawable, Result, TriangleMesh};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// What a cleanup pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub merged_vertices: usize,
    pub degenerate_faces: usize,
    pub duplicate_faces: usize,
    pub unreferenced_vertices: usize,
}

impl CleanReport {
    pub fn removed_vertices(&self) -> usize {
        self.merged_vertices + self.unreferenced_vertices
    }

    pub fn removed_faces(&self) -> usize {
        self.degenerate_faces + self.duplicate_faces
    }

    pub fn is_clean(&self) -> bool {
        self.removed_vertices() == 0 && self.removed_faces() == 0
    }
}

impl fmt::Display for CleanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            write!(f, "no issues found")
        } else {
            write!(
                f,
                "removed {} vertices and {} faces",
                self.removed_vertices(),
                self.removed_faces()
            )
        }
    }
}

/// Clean a mesh. Vertices closer than `merge_threshold_ratio` times the
/// bounding box diagonal are merged into the lowest-indexed one.
pub fn clean_mesh(mesh: &TriangleMesh, merge_threshold_ratio: f64) -> Result<(TriangleMesh, CleanReport)> {
    mesh.validate()?;

    let mut report = CleanReport::default();
    let epsilon = merge_threshold_ratio * mesh.diagonal() as f64;
    let representative = merge_close_vertices(mesh, epsilon);
    report.merged_vertices = representative
        .iter()
        .enumerate()
        .filter(|&(i, &r)| i != r)
        .count();

    let face_tex = mesh.face_tex.as_ref().filter(|_| mesh.has_texture());
    let mut seen: HashSet<[usize; 3]> = HashSet::with_capacity(mesh.faces.len());
    let mut faces = Vec::with_capacity(mesh.faces.len());
    let mut tex_rows = Vec::new();

    for (fi, face) in mesh.faces.iter().enumerate() {
        let f = face.map(|v| representative[v]);
        if f[0] == f[1] || f[1] == f[2] || f[0] == f[2] {
            report.degenerate_faces += 1;
            continue;
        }
        let mut key = f;
        key.sort_unstable();
        if !seen.insert(key) {
            report.duplicate_faces += 1;
            continue;
        }
        faces.push(f);
        if let Some(rows) = face_tex {
            tex_rows.push(rows[fi]);
        }
    }

    // Renumber the referenced vertices in their original order
    let mut referenced = vec![false; mesh.vertices.len()];
    for f in &faces {
        for &v in f {
            referenced[v] = true;
        }
    }
    let mut new_index = vec![usize::MAX; mesh.vertices.len()];
    let mut vertices = Vec::new();
    let mut normals = mesh.normals.as_ref().map(|_| Vec::new());
    for (i, &used) in referenced.iter().enumerate() {
        if used {
            new_index[i] = vertices.len();
            vertices.push(mesh.vertices[i]);
            if let (Some(out), Some(src)) = (normals.as_mut(), mesh.normals.as_ref()) {
                out.push(src[i]);
            }
        } else if representative[i] == i {
            report.unreferenced_vertices += 1;
        }
    }

    let faces: Vec<[usize; 3]> = faces.into_iter().map(|f| f.map(|v| new_index[v])).collect();
    let mut cleaned = TriangleMesh::from_vertices_and_faces(vertices, faces);
    if let Some(normals) = normals {
        cleaned.set_normals(normals);
    }
    if let (Some(tex_coords), Some(_)) = (mesh.tex_coords.as_ref(), face_tex) {
        cleaned.set_texture(tex_coords.clone(), tex_rows);
    }

    debug!(
        merged = report.merged_vertices,
        degenerate = report.degenerate_faces,
        duplicates = report.duplicate_faces,
        unreferenced = report.unreferenced_vertices,
        "Cleanup finished"
    );
    Ok((cleaned, report))
}

/// Map every vertex to the lowest-indexed vertex within `epsilon` of it.
///
/// Vertices are visited in index order and hashed into cubic cells of side
/// `epsilon`; each one is compared against the representatives already in
/// its own and the 26 surrounding cells.
fn merge_close_vertices(mesh: &TriangleMesh, epsilon: f64) -> Vec<usize> {
    let mut representative: Vec<usize> = (0..mesh.vertices.len()).collect();
    if !(epsilon > 0.0) || !epsilon.is_finite() {
        return representative;
    }

    let cell_of = |i: usize| {
        let p = mesh.vertices[i];
        [
            (p.x as f64 / epsilon).floor() as i64,
            (p.y as f64 / epsilon).floor() as i64,
            (p.z as f64 / epsilon).floor() as i64,
        ]
    };

    let mut grid: HashMap<[i64; 3], Vec<usize>> = HashMap::new();
    for i in 0..mesh.vertices.len() {
        let cell = cell_of(i);
        let p = mesh.vertices[i];
        let mut best: Option<usize> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = [cell[0] + dx, cell[1] + dy, cell[2] + dz];
                    let Some(bucket) = grid.get(&key) else {
                        continue;
                    };
                    for &j in bucket {
                        let d = (mesh.vertices[j] - p).norm() as f64;
                        if d < epsilon && best.map_or(true, |b| j < b) {
                            best = Some(j);
                        }
                    }
                }
            }
        }

        match best {
            Some(j) => representative[i] = j,
            None => grid.entry(cell).or_default().push(i),
        }
    }
    representative
}
