//! Decimation strategies
//!
//! A strategy decides how vertex quadrics are initialised and which vertices
//! are pinned. [`TexturedStrategy`] adds texture-coordinate terms and keeps
//! seams in place; [`GeometryStrategy`] uses geometry alone.

use crate::params::DecimationParams;
use crate::quadric_error::{
    self, boundary_quadric, face_plane, normal_deviation_deg, Quadric, BOUNDARY_SCALE,
    PLANAR_ANGLE_DEG, PLANAR_WEIGHT,
};
use crate::store::MeshStore;
use decicrate_core::{Error, Result};
use tracing::debug;

pub trait DecimationStrategy {
    fn name(&self) -> &'static str;

    /// Whether texture seams constrain collapses
    fn uses_texture(&self) -> bool;

    /// Compute every live vertex's quadric from scratch.
    fn initialize_quadrics(&self, store: &mut MeshStore, params: &DecimationParams) -> Result<()>;

    /// Pinned vertices may only be collapsed onto their own position.
    fn is_pinned(&self, store: &MeshStore, v: usize, params: &DecimationParams) -> bool {
        let vertex = store.vertex(v);
        (params.preserve_boundary && vertex.boundary) || (self.uses_texture() && vertex.seam)
    }

    /// Constrained-vertex rules for collapsing `remove` into `keep`: a
    /// removed boundary (seam) vertex needs a boundary (seam) survivor, and
    /// two boundary (seam) endpoints must share a boundary (seam) edge.
    fn allows_collapse(
        &self,
        store: &MeshStore,
        keep: usize,
        remove: usize,
        params: &DecimationParams,
    ) -> bool {
        let (k, r) = (store.vertex(keep), store.vertex(remove));

        if params.preserve_boundary {
            if r.boundary && !k.boundary {
                return false;
            }
            if r.boundary && k.boundary && !store.is_boundary_edge(keep, remove) {
                return false;
            }
        }

        if self.uses_texture() {
            if r.seam && !k.seam {
                return false;
            }
            if r.seam && k.seam && !store.is_seam_edge(keep, remove) {
                return false;
            }
        }
        true
    }
}

/// Geometry-only quadrics
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryStrategy;

/// Geometry plus texture-coordinate quadrics, with seams pinned
#[derive(Debug, Clone, Copy, Default)]
pub struct TexturedStrategy;

impl DecimationStrategy for GeometryStrategy {
    fn name(&self) -> &'static str {
        "geometry"
    }

    fn uses_texture(&self) -> bool {
        false
    }

    fn initialize_quadrics(&self, store: &mut MeshStore, params: &DecimationParams) -> Result<()> {
        accumulate_geometric_quadrics(store, params);
        Ok(())
    }
}

impl DecimationStrategy for TexturedStrategy {
    fn name(&self) -> &'static str {
        "textured"
    }

    fn uses_texture(&self) -> bool {
        true
    }

    fn initialize_quadrics(&self, store: &mut MeshStore, params: &DecimationParams) -> Result<()> {
        if let Some((face, index)) = store.find_invalid_tex_index() {
            return Err(Error::DegenerateQuadric(format!(
                "face {} references texture coordinate {} of {}",
                face,
                index,
                store.tex_coords().len()
            )));
        }

        accumulate_geometric_quadrics(store, params);

        if params.texture_weight <= 0.0 {
            return Ok(());
        }

        // Texture error is unitless; scale it to the mesh so the weight does
        // not depend on model units
        let diagonal = store.bounding_diagonal();
        let weight = params.texture_weight * diagonal * diagonal;

        let mut contributions = Vec::new();
        for f in store.live_faces() {
            let face = store.face(f);
            let Some(tex) = face.tex else {
                continue;
            };
            let corners = store.face_positions(f);
            let uvs = tex.map(|t| store.tex_coords()[t]);
            let quadrics = quadric_error::texture_quadrics(&corners, &uvs, weight)
                .map_err(|e| Error::DegenerateQuadric(format!("face {}: {}", f, e)))?;
            if let Some(qs) = quadrics {
                for (v, q) in face.vertices.into_iter().zip(qs) {
                    contributions.push((v, q));
                }
            }
        }

        for (v, q) in &contributions {
            store.add_quadric(*v, q);
        }
        if store.vertices().iter().any(|v| v.alive && !v.quadric.is_finite()) {
            return Err(Error::DegenerateQuadric(
                "texture quadric is not finite".to_string(),
            ));
        }

        debug!(terms = contributions.len(), "Added texture quadrics");
        Ok(())
    }
}

/// Pick the strategy matching the store's attributes.
pub fn select_strategy(store: &MeshStore) -> Box<dyn DecimationStrategy> {
    if store.is_textured() {
        Box::new(TexturedStrategy)
    } else {
        Box::new(GeometryStrategy)
    }
}

/// Face plane quadrics (down-weighted in flat regions) plus boundary
/// constraint planes.
fn accumulate_geometric_quadrics(store: &mut MeshStore, params: &DecimationParams) {
    store.reset_quadrics();

    let mut contributions: Vec<(usize, Quadric)> = Vec::new();
    let mut planar_faces = 0usize;

    for f in store.live_faces() {
        let [p0, p1, p2] = store.face_positions(f);
        let Some(plane) = face_plane(&p0, &p1, &p2) else {
            continue;
        };
        let mut q = Quadric::from_plane(&plane);
        if params.planar_simplification && is_planar_face(store, f) {
            q = q.scaled(PLANAR_WEIGHT);
            planar_faces += 1;
        }
        for v in store.face(f).vertices {
            contributions.push((v, q));
        }
    }

    let boundary_weight = params.boundary_weight * BOUNDARY_SCALE;
    let mut boundary_edges = 0usize;
    if params.preserve_boundary && boundary_weight > 0.0 {
        for (a, b) in store.edges() {
            let faces = store.edge_faces(a, b);
            if faces.len() != 1 {
                continue;
            }
            let Some(normal) = store.face_normal(faces[0]) else {
                continue;
            };
            let pa = store.position_f64(a);
            let pb = store.position_f64(b);
            if let Some(q) = boundary_quadric(&pa, &pb, &normal, boundary_weight) {
                contributions.push((a, q));
                contributions.push((b, q));
                boundary_edges += 1;
            }
        }
    }

    for (v, q) in &contributions {
        store.add_quadric(*v, q);
    }

    debug!(planar_faces, boundary_edges, "Initialised geometric quadrics");
}

/// Every edge-adjacent neighbour lies within `PLANAR_ANGLE_DEG` of the face
fn is_planar_face(store: &MeshStore, f: usize) -> bool {
    let Some(n) = store.face_normal(f) else {
        return false;
    };
    let [a, b, c] = store.face(f).vertices;
    [(a, b), (b, c), (c, a)].into_iter().all(|(u, v)| {
        store
            .edge_faces(u, v)
            .into_iter()
            .filter(|&g| g != f)
            .all(|g| {
                store
                    .face_normal(g)
                    .map(|m| normal_deviation_deg(&n, &m) <= PLANAR_ANGLE_DEG)
                    .unwrap_or(false)
            })
    })
}
