//! Post-decimation edge flipping
//!
//! Collapses leave long thin triangles in flat regions. A bounded number of
//! passes flips the diagonal of nearly coplanar face pairs when that makes
//! the worse of the two triangles better shaped.

use crate::quadric_error::{is_degenerate, normal_deviation_deg};
use crate::store::{EdgeWing, MeshStore};
use decicrate_core::{Point3d, Result};
use tracing::debug;

/// Minimum gain in pair quality for a flip to be applied
pub const FLIP_IMPROVEMENT: f64 = 1e-4;

/// Area over squared longest side. 0.433 for an equilateral triangle.
pub fn flip_quality(p0: &Point3d, p1: &Point3d, p2: &Point3d) -> f64 {
    let area = (p1 - p0).cross(&(p2 - p0)).norm() * 0.5;
    let longest = (p1 - p0)
        .norm_squared()
        .max((p2 - p1).norm_squared())
        .max((p0 - p2).norm_squared());
    if longest > 0.0 {
        area / longest
    } else {
        0.0
    }
}

#[derive(Debug, Clone)]
pub struct EdgeFlipOptimizer {
    pub iterations: usize,
    /// Largest dihedral angle, in degrees, of a face pair that may be flipped
    pub planar_threshold_deg: f64,
}

impl Default for EdgeFlipOptimizer {
    fn default() -> Self {
        Self {
            iterations: 2,
            planar_threshold_deg: 1.0,
        }
    }
}

impl EdgeFlipOptimizer {
    pub fn new(iterations: usize, planar_threshold_deg: f64) -> Self {
        Self {
            iterations,
            planar_threshold_deg,
        }
    }

    /// Run the flip passes, stopping early once a pass changes nothing.
    /// Returns the number of flips performed.
    pub fn optimize(&self, store: &mut MeshStore) -> Result<usize> {
        let mut total = 0;
        for pass in 0..self.iterations {
            let mut flips = 0;
            for (a, b) in store.edges() {
                if self.should_flip(store, a, b) {
                    store.flip_edge(a, b)?;
                    flips += 1;
                }
            }
            debug!(pass, flips, "Edge flip pass");
            total += flips;
            if flips == 0 {
                break;
            }
        }
        Ok(total)
    }

    fn should_flip(&self, store: &MeshStore, a: usize, b: usize) -> bool {
        let Some(EdgeWing { left, right, c, d }) = store.edge_wing(a, b) else {
            return false;
        };
        if c == d || store.has_edge(c, d) || store.is_seam_edge(a, b) {
            return false;
        }

        let (Some(n1), Some(n2)) = (store.face_normal(left), store.face_normal(right)) else {
            return false;
        };
        if normal_deviation_deg(&n1, &n2) > self.planar_threshold_deg {
            return false;
        }

        let [pa, pb, pc, pd] = [a, b, c, d].map(|v| store.position_f64(v));
        if is_degenerate(&pc, &pa, &pd) || is_degenerate(&pd, &pb, &pc) {
            return false;
        }
        let reference = n1 + n2;
        let facing = |p0: &Point3d, p1: &Point3d, p2: &Point3d| {
            (p1 - p0).cross(&(p2 - p0)).dot(&reference) > 0.0
        };
        if !facing(&pc, &pa, &pd) || !facing(&pd, &pb, &pc) {
            return false;
        }

        let before = flip_quality(&pa, &pb, &pc).min(flip_quality(&pb, &pa, &pd));
        let after = flip_quality(&pc, &pa, &pd).min(flip_quality(&pd, &pb, &pc));
        after > before + FLIP_IMPROVEMENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use decicrate_core::{Point3f, TriangleMesh};

    fn make_thin_pair(lift: f32) -> MeshStore {
        // Long shared diagonal 0-1 with apices close to it
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(-2.0, 0.0, 0.0),
                Point3f::new(2.0, 0.0, 0.0),
                Point3f::new(0.0, 0.5, lift),
                Point3f::new(0.0, -0.5, lift),
            ],
            vec![[0, 1, 2], [1, 0, 3]],
        );
        MeshStore::from_triangle_mesh(&mesh).unwrap()
    }

    #[test]
    fn test_flip_quality() {
        let h = 3.0f64.sqrt() / 2.0;
        let q = flip_quality(
            &Point3d::new(0.0, 0.0, 0.0),
            &Point3d::new(1.0, 0.0, 0.0),
            &Point3d::new(0.5, h, 0.0),
        );
        assert_relative_eq!(q, h / 2.0, epsilon = 1e-12);
        let p = Point3d::new(1.0, 1.0, 1.0);
        assert_eq!(flip_quality(&p, &p, &p), 0.0);
    }

    #[test]
    fn test_flips_thin_pair() {
        let mut store = make_thin_pair(0.0);
        let flips = EdgeFlipOptimizer::default().optimize(&mut store).unwrap();
        assert_eq!(flips, 1);
        assert!(store.has_edge(2, 3));
        assert!(!store.has_edge(0, 1));
        assert_eq!(store.live_face_count(), 2);
        assert_eq!(store.live_vertex_count(), 4);
        for f in store.live_faces() {
            assert!(store.face_normal(f).unwrap().z > 0.0);
        }
    }

    #[test]
    fn test_skips_folded_pair() {
        // Apices raised out of the plane of the diagonal
        let mut store = make_thin_pair(0.5);
        let flips = EdgeFlipOptimizer::default().optimize(&mut store).unwrap();
        assert_eq!(flips, 0);
        assert!(store.has_edge(0, 1));
    }

    #[test]
    fn test_zero_iterations() {
        let mut store = make_thin_pair(0.0);
        assert_eq!(EdgeFlipOptimizer::new(0, 1.0).optimize(&mut store).unwrap(), 0);
    }

    #[test]
    fn test_skips_seam_edge() {
        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(-2.0, 0.0, 0.0),
                Point3f::new(2.0, 0.0, 0.0),
                Point3f::new(0.0, 0.5, 0.0),
                Point3f::new(0.0, -0.5, 0.0),
            ],
            vec![[0, 1, 2], [1, 0, 3]],
        );
        mesh.set_texture(
            vec![[0.0, 0.0], [1.0, 0.0], [0.5, 1.0], [0.2, 0.2], [0.8, 0.2], [0.5, 0.0]],
            vec![[0, 1, 2], [4, 3, 5]],
        );
        let mut store = MeshStore::from_triangle_mesh(&mesh).unwrap();
        assert!(store.is_seam_edge(0, 1));
        assert_eq!(EdgeFlipOptimizer::default().optimize(&mut store).unwrap(), 0);
    }
}
