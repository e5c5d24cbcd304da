//! Mesh store for incremental decimation
//!
//! Flat vertex, face and texture-coordinate buffers with tombstones, plus a
//! vertex-to-face adjacency kept up to date by every mutation. Indices stay
//! stable for the whole session; [`MeshStore::compact`] renumbers them.

use crate::quadric_error::{self, Quadric};
use decicrate_core::{
    to_f64, Error, Point3d, Point3f, Result, TexCoord, TriangleMesh, Vector3d, Vector3f,
};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub position: Point3f,
    pub normal: Option<Vector3f>,
    pub quadric: Quadric,
    /// Lies on an edge with exactly one face
    pub boundary: bool,
    /// Its face corners reference more than one texture coordinate
    pub seam: bool,
    pub alive: bool,
    pub generation: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub vertices: [usize; 3],
    /// Per-corner indices into the texture-coordinate buffer
    pub tex: Option<[usize; 3]>,
    pub alive: bool,
}

impl Face {
    /// Corner slot (0..3) holding vertex `v`
    pub fn corner_of(&self, v: usize) -> Option<usize> {
        self.vertices.iter().position(|&x| x == v)
    }

    pub fn contains(&self, v: usize) -> bool {
        self.vertices.contains(&v)
    }

    /// The corner that is neither `a` nor `b`
    pub fn opposite(&self, a: usize, b: usize) -> Option<usize> {
        self.vertices.iter().copied().find(|&x| x != a && x != b)
    }
}

/// Corner positions of a surviving face before and after a tentative collapse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceChange {
    pub face: usize,
    pub before: [Point3d; 3],
    pub after: [Point3d; 3],
}

/// The two faces on an interior edge `(a, b)`, oriented so that the first
/// runs `a -> b` and the second `b -> a`, with their apices `c` and `d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeWing {
    pub left: usize,
    pub right: usize,
    pub c: usize,
    pub d: usize,
}

#[derive(Debug, Clone)]
pub struct MeshStore {
    vertices: Vec<Vertex>,
    faces: Vec<Face>,
    tex_coords: Vec<TexCoord>,
    textured: bool,
    vertex_faces: Vec<Vec<usize>>,
    live_vertices: usize,
    live_faces: usize,
}

impl MeshStore {
    /// Build a store from an exchange mesh.
    ///
    /// Vertex indices and attribute counts are checked; texture index values
    /// are not. Faces repeating a vertex are tombstoned immediately.
    pub fn from_triangle_mesh(mesh: &TriangleMesh) -> Result<Self> {
        mesh.validate()?;

        let textured = mesh.has_texture();
        let normals = mesh.normals.as_ref();
        let vertices = mesh
            .vertices
            .iter()
            .enumerate()
            .map(|(i, &position)| Vertex {
                position,
                normal: normals.map(|n| n[i]),
                quadric: Quadric::zero(),
                boundary: false,
                seam: false,
                alive: true,
                generation: 0,
            })
            .collect();

        let face_tex = if textured { mesh.face_tex.as_ref() } else { None };
        let mut collapsed = 0usize;
        let faces = mesh
            .faces
            .iter()
            .enumerate()
            .map(|(fi, f)| {
                let alive = f[0] != f[1] && f[1] != f[2] && f[0] != f[2];
                if !alive {
                    collapsed += 1;
                }
                Face {
                    vertices: *f,
                    tex: face_tex.map(|t| t[fi]),
                    alive,
                }
            })
            .collect();

        if collapsed > 0 {
            debug!(faces = collapsed, "Ignoring faces with repeated vertices");
        }

        let mut store = Self {
            vertices,
            faces,
            tex_coords: if textured {
                mesh.tex_coords.clone().unwrap_or_default()
            } else {
                Vec::new()
            },
            textured,
            vertex_faces: Vec::new(),
            live_vertices: 0,
            live_faces: 0,
        };
        store.rebuild_adjacency();
        Ok(store)
    }

    fn rebuild_adjacency(&mut self) {
        self.vertex_faces = vec![Vec::new(); self.vertices.len()];
        self.live_faces = 0;
        for (fi, face) in self.faces.iter().enumerate() {
            if !face.alive {
                continue;
            }
            self.live_faces += 1;
            for &v in &face.vertices {
                self.vertex_faces[v].push(fi);
            }
        }
        self.live_vertices = self.vertices.iter().filter(|v| v.alive).count();
        for v in 0..self.vertices.len() {
            self.refresh_flags(v);
        }
    }

    /// Recompute the boundary and seam flags of one vertex from topology
    fn refresh_flags(&mut self, v: usize) {
        let boundary = self
            .neighbors(v)
            .into_iter()
            .any(|n| self.edge_faces(v, n).len() == 1);

        let seam = self.textured && {
            let mut seen: Option<usize> = None;
            let mut multiple = false;
            for &f in &self.vertex_faces[v] {
                if let Some(t) = self.tex_at(f, v) {
                    match seen {
                        None => seen = Some(t),
                        Some(s) if s != t => multiple = true,
                        Some(_) => {}
                    }
                }
            }
            multiple
        };

        let vertex = &mut self.vertices[v];
        vertex.boundary = boundary;
        vertex.seam = seam;
    }

    // ---- Queries ----

    pub fn vertex(&self, v: usize) -> &Vertex {
        &self.vertices[v]
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn face(&self, f: usize) -> &Face {
        &self.faces[f]
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn tex_coords(&self) -> &[TexCoord] {
        &self.tex_coords
    }

    pub fn is_textured(&self) -> bool {
        self.textured
    }

    pub fn live_vertex_count(&self) -> usize {
        self.live_vertices
    }

    pub fn live_face_count(&self) -> usize {
        self.live_faces
    }

    /// Indices of the live faces, ascending
    pub fn live_faces(&self) -> impl Iterator<Item = usize> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, f)| f.alive)
            .map(|(i, _)| i)
    }

    /// Live faces incident to `v`, ascending
    pub fn faces_around(&self, v: usize) -> &[usize] {
        &self.vertex_faces[v]
    }

    /// One-ring neighbours of `v`, sorted and deduplicated
    pub fn neighbors(&self, v: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self.vertex_faces[v]
            .iter()
            .flat_map(|&f| self.faces[f].vertices)
            .filter(|&n| n != v)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn valence(&self, v: usize) -> usize {
        self.neighbors(v).len()
    }

    /// Live faces containing both `a` and `b`, ascending
    pub fn edge_faces(&self, a: usize, b: usize) -> Vec<usize> {
        self.vertex_faces[a]
            .iter()
            .copied()
            .filter(|&f| self.faces[f].contains(b))
            .collect()
    }

    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        self.vertex_faces[a].iter().any(|&f| self.faces[f].contains(b))
    }

    pub fn is_boundary_edge(&self, a: usize, b: usize) -> bool {
        self.edge_faces(a, b).len() == 1
    }

    /// Interior edge whose endpoints use different texture coordinates on
    /// its two sides
    pub fn is_seam_edge(&self, a: usize, b: usize) -> bool {
        if !self.textured {
            return false;
        }
        let faces = self.edge_faces(a, b);
        if faces.len() != 2 {
            return false;
        }
        self.tex_at(faces[0], a) != self.tex_at(faces[1], a)
            || self.tex_at(faces[0], b) != self.tex_at(faces[1], b)
    }

    /// Every live edge once, as `(min, max)` pairs in ascending order
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::with_capacity(self.live_faces * 3 / 2 + 1);
        for (v, faces) in self.vertex_faces.iter().enumerate() {
            if faces.is_empty() {
                continue;
            }
            for n in self.neighbors(v) {
                if n > v {
                    out.push((v, n));
                }
            }
        }
        out
    }

    /// Texture index used by face `f` at vertex `v`
    pub fn tex_at(&self, f: usize, v: usize) -> Option<usize> {
        let face = &self.faces[f];
        let corner = face.corner_of(v)?;
        face.tex.map(|t| t[corner])
    }

    pub fn position_f64(&self, v: usize) -> Point3d {
        to_f64(&self.vertices[v].position)
    }

    pub fn face_positions(&self, f: usize) -> [Point3d; 3] {
        self.faces[f].vertices.map(|v| self.position_f64(v))
    }

    /// Unit normal of a face, `None` for a degenerate one
    pub fn face_normal(&self, f: usize) -> Option<Vector3d> {
        let [p0, p1, p2] = self.face_positions(f);
        quadric_error::triangle_normal(&p0, &p1, &p2)
    }

    /// Diagonal of the bounding box of the live vertices
    pub fn bounding_diagonal(&self) -> f64 {
        let mut live = self.vertices.iter().filter(|v| v.alive).map(|v| v.position);
        let Some(first) = live.next() else {
            return 0.0;
        };
        let (min, max) = live.fold((first, first), |(mut lo, mut hi), p| {
            lo.x = lo.x.min(p.x);
            lo.y = lo.y.min(p.y);
            lo.z = lo.z.min(p.z);
            hi.x = hi.x.max(p.x);
            hi.y = hi.y.max(p.y);
            hi.z = hi.z.max(p.z);
            (lo, hi)
        });
        (to_f64(&max) - to_f64(&min)).norm()
    }

    /// Oriented wing of an interior edge. `None` unless the edge has exactly
    /// two faces traversing it in opposite directions.
    pub fn edge_wing(&self, a: usize, b: usize) -> Option<EdgeWing> {
        let faces = self.edge_faces(a, b);
        if faces.len() != 2 {
            return None;
        }
        let runs_forward = |f: usize| {
            let face = &self.faces[f];
            face.corner_of(a)
                .map(|i| face.vertices[(i + 1) % 3] == b)
                .unwrap_or(false)
        };
        let (left, right) = match (runs_forward(faces[0]), runs_forward(faces[1])) {
            (true, false) => (faces[0], faces[1]),
            (false, true) => (faces[1], faces[0]),
            _ => return None,
        };
        Some(EdgeWing {
            left,
            right,
            c: self.faces[left].opposite(a, b)?,
            d: self.faces[right].opposite(a, b)?,
        })
    }

    /// Surviving faces around `keep` and `remove` with their corner positions
    /// before and after collapsing the edge onto `position`.
    pub fn collapse_preview(&self, keep: usize, remove: usize, position: &Point3d) -> Vec<FaceChange> {
        let mut faces: Vec<usize> = self.vertex_faces[keep]
            .iter()
            .chain(self.vertex_faces[remove].iter())
            .copied()
            .filter(|&f| !(self.faces[f].contains(keep) && self.faces[f].contains(remove)))
            .collect();
        faces.sort_unstable();
        faces.dedup();

        faces
            .into_iter()
            .map(|f| {
                let before = self.face_positions(f);
                let mut after = before;
                for (slot, &v) in after.iter_mut().zip(self.faces[f].vertices.iter()) {
                    if v == keep || v == remove {
                        *slot = *position;
                    }
                }
                FaceChange { face: f, before, after }
            })
            .collect()
    }

    // ---- Mutations ----

    pub(crate) fn reset_quadrics(&mut self) {
        for v in &mut self.vertices {
            v.quadric = Quadric::zero();
        }
    }

    pub(crate) fn add_quadric(&mut self, v: usize, q: &Quadric) {
        self.vertices[v].quadric += *q;
    }

    fn kill_face(&mut self, f: usize) {
        if !self.faces[f].alive {
            return;
        }
        self.faces[f].alive = false;
        self.live_faces -= 1;
        for v in self.faces[f].vertices {
            self.vertex_faces[v].retain(|&x| x != f);
        }
    }

    /// Merge `remove` into `keep`, placing the survivor at `position`.
    ///
    /// The faces shared by the edge are tombstoned and the remaining faces of
    /// `remove` are reassigned to `keep`. Quadrics are summed, normals
    /// averaged, and both generations bumped. In textured stores each dying
    /// face contributes a new texture coordinate interpolated along the edge,
    /// which replaces the old coordinates at the survivor's corners.
    /// Returns the number of faces removed.
    pub fn collapse(&mut self, keep: usize, remove: usize, position: Point3f) -> Result<usize> {
        if keep == remove || !self.vertices[keep].alive || !self.vertices[remove].alive {
            return Err(Error::InvalidData(format!(
                "Cannot collapse vertex {} into {}",
                remove, keep
            )));
        }
        let dying = self.edge_faces(keep, remove);
        if dying.is_empty() {
            return Err(Error::InvalidData(format!(
                "Vertices {} and {} do not share an edge",
                keep, remove
            )));
        }

        let mut remap: Vec<(usize, usize)> = Vec::new();
        if self.textured {
            let pk = to_f64(&self.vertices[keep].position);
            let pr = to_f64(&self.vertices[remove].position);
            let t = edge_parameter(&pk, &pr, &to_f64(&position)) as f32;
            for &f in &dying {
                if let (Some(tk), Some(tr)) = (self.tex_at(f, keep), self.tex_at(f, remove)) {
                    let (uk, ur) = match (self.tex_coords.get(tk), self.tex_coords.get(tr)) {
                        (Some(&uk), Some(&ur)) => (uk, ur),
                        _ => {
                            return Err(Error::InvalidData(format!(
                                "Texture index out of range on face {}",
                                f
                            )))
                        }
                    };
                    // Both sides of an interior edge may share the same wedge pair
                    if let (Some(x), Some(y)) = (lookup(&remap, tk), lookup(&remap, tr)) {
                        if x == y {
                            continue;
                        }
                    }
                    let fresh = self.tex_coords.len();
                    self.tex_coords
                        .push([uk[0] + (ur[0] - uk[0]) * t, uk[1] + (ur[1] - uk[1]) * t]);
                    for old in [tk, tr] {
                        if lookup(&remap, old).is_none() {
                            remap.push((old, fresh));
                        }
                    }
                }
            }
        }

        for &f in &dying {
            self.kill_face(f);
        }

        let moved = std::mem::take(&mut self.vertex_faces[remove]);
        for f in moved {
            for v in self.faces[f].vertices.iter_mut() {
                if *v == remove {
                    *v = keep;
                }
            }
            self.vertex_faces[keep].push(f);
        }
        self.vertex_faces[keep].sort_unstable();

        if !remap.is_empty() {
            for &f in &self.vertex_faces[keep] {
                let face = &mut self.faces[f];
                let Some(corner) = face.corner_of(keep) else {
                    continue;
                };
                if let Some(tex) = face.tex.as_mut() {
                    if let Some(fresh) = lookup(&remap, tex[corner]) {
                        tex[corner] = fresh;
                    }
                }
            }
        }

        let (removed_quadric, removed_normal) = {
            let r = &mut self.vertices[remove];
            r.alive = false;
            r.generation = r.generation.wrapping_add(1);
            (r.quadric, r.normal)
        };
        self.live_vertices -= 1;

        let k = &mut self.vertices[keep];
        k.position = position;
        k.quadric += removed_quadric;
        if let (Some(nk), Some(nr)) = (k.normal, removed_normal) {
            if let Some(n) = (nk + nr).try_normalize(f32::EPSILON) {
                k.normal = Some(n);
            }
        }
        k.generation = k.generation.wrapping_add(1);

        self.refresh_flags(keep);
        for n in self.neighbors(keep) {
            self.refresh_flags(n);
        }

        Ok(dying.len())
    }

    /// Replace the two faces `(a, b, c)` and `(b, a, d)` on an interior edge
    /// with `(c, a, d)` and `(d, b, c)`.
    pub fn flip_edge(&mut self, a: usize, b: usize) -> Result<()> {
        let wing = self.edge_wing(a, b).ok_or_else(|| {
            Error::InvalidData(format!("Edge ({}, {}) is not an interior manifold edge", a, b))
        })?;
        let EdgeWing { left, right, c, d } = wing;

        let left_tex = self.faces[left].tex;
        let right_tex = self.faces[right].tex;
        let tex_of = |tex: Option<[usize; 3]>, face: &Face, v: usize| {
            tex.zip(face.corner_of(v)).map(|(t, i)| t[i])
        };
        let (lf, rf) = (self.faces[left].clone(), self.faces[right].clone());
        let new_left_tex = match (
            tex_of(left_tex, &lf, c),
            tex_of(left_tex, &lf, a),
            tex_of(right_tex, &rf, d),
        ) {
            (Some(tc), Some(ta), Some(td)) => Some([tc, ta, td]),
            _ => None,
        };
        let new_right_tex = match (
            tex_of(right_tex, &rf, d),
            tex_of(left_tex, &lf, b),
            tex_of(left_tex, &lf, c),
        ) {
            (Some(td), Some(tb), Some(tc)) => Some([td, tb, tc]),
            _ => None,
        };

        self.faces[left].vertices = [c, a, d];
        self.faces[left].tex = new_left_tex;
        self.faces[right].vertices = [d, b, c];
        self.faces[right].tex = new_right_tex;

        self.vertex_faces[a].retain(|&f| f != right);
        self.vertex_faces[b].retain(|&f| f != left);
        self.vertex_faces[c].push(right);
        self.vertex_faces[c].sort_unstable();
        self.vertex_faces[d].push(left);
        self.vertex_faces[d].sort_unstable();

        for v in [a, b, c, d] {
            let vertex = &mut self.vertices[v];
            vertex.generation = vertex.generation.wrapping_add(1);
            self.refresh_flags(v);
        }
        Ok(())
    }

    /// Drop all texture data; seam flags are cleared with it.
    pub fn strip_texture(&mut self) {
        self.textured = false;
        self.tex_coords.clear();
        for face in &mut self.faces {
            face.tex = None;
        }
        for v in &mut self.vertices {
            v.seam = false;
        }
    }

    /// Index of the first texture index that points outside the buffer
    pub fn find_invalid_tex_index(&self) -> Option<(usize, usize)> {
        self.live_faces().find_map(|f| {
            self.faces[f]
                .tex
                .and_then(|t| t.into_iter().find(|&i| i >= self.tex_coords.len()))
                .map(|i| (f, i))
        })
    }

    /// Remove tombstoned vertices and faces and unreferenced texture
    /// coordinates, renumbering everything that remains.
    pub fn compact(&mut self) -> Result<()> {
        let mut vertex_map: Vec<Option<usize>> = vec![None; self.vertices.len()];
        let mut vertices = Vec::with_capacity(self.live_vertices);
        for (i, v) in self.vertices.iter().enumerate() {
            if v.alive {
                vertex_map[i] = Some(vertices.len());
                let mut v = v.clone();
                v.generation = 0;
                vertices.push(v);
            }
        }

        let mut tex_map: Vec<Option<usize>> = vec![None; self.tex_coords.len()];
        let mut tex_coords = Vec::new();
        let mut faces = Vec::with_capacity(self.live_faces);

        for face in self.faces.iter().filter(|f| f.alive) {
            let mut remapped = [0usize; 3];
            for (slot, &v) in remapped.iter_mut().zip(face.vertices.iter()) {
                *slot = vertex_map[v].ok_or_else(|| {
                    Error::InvalidData(format!("Live face references removed vertex {}", v))
                })?;
            }

            let tex = match face.tex {
                Some(t) => {
                    let mut out = [0usize; 3];
                    for (slot, &ti) in out.iter_mut().zip(t.iter()) {
                        let entry = tex_map.get_mut(ti).ok_or_else(|| {
                            Error::InvalidData(format!(
                                "Texture index {} out of range ({} texture coordinates)",
                                ti,
                                self.tex_coords.len()
                            ))
                        })?;
                        *slot = match *entry {
                            Some(n) => n,
                            None => {
                                let n = tex_coords.len();
                                tex_coords.push(self.tex_coords[ti]);
                                *entry = Some(n);
                                n
                            }
                        };
                    }
                    Some(out)
                }
                None => None,
            };

            faces.push(Face {
                vertices: remapped,
                tex,
                alive: true,
            });
        }

        self.vertices = vertices;
        self.faces = faces;
        self.tex_coords = tex_coords;
        self.rebuild_adjacency();
        Ok(())
    }

    /// Export the live part of the store as an exchange mesh.
    pub fn to_triangle_mesh(&self) -> Result<TriangleMesh> {
        let mut compacted = self.clone();
        compacted.compact()?;

        let positions = compacted.vertices.iter().map(|v| v.position).collect();
        let faces = compacted.faces.iter().map(|f| f.vertices).collect();
        let mut mesh = TriangleMesh::from_vertices_and_faces(positions, faces);

        let normals: Option<Vec<Vector3f>> = compacted.vertices.iter().map(|v| v.normal).collect();
        if let Some(normals) = normals.filter(|n| !n.is_empty()) {
            mesh.set_normals(normals);
        }

        if compacted.textured {
            let face_tex: Option<Vec<[usize; 3]>> = compacted.faces.iter().map(|f| f.tex).collect();
            if let Some(face_tex) = face_tex {
                mesh.set_texture(compacted.tex_coords, face_tex);
            }
        }
        Ok(mesh)
    }
}

fn lookup(remap: &[(usize, usize)], old: usize) -> Option<usize> {
    remap.iter().find(|&&(o, _)| o == old).map(|&(_, n)| n)
}

/// Parameter of the projection of `p` onto segment `a -> b`, clamped to [0, 1]
fn edge_parameter(a: &Point3d, b: &Point3d, p: &Point3d) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if !(len2 > 0.0) {
        return 0.0;
    }
    ((p - a).dot(&ab) / len2).clamp(0.0, 1.0)
}
