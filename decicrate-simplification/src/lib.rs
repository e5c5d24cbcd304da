//! Mesh decimation
//!
//! Quadric error metric edge collapse with texture seam preservation:
//! - Mesh store with tombstones and incremental adjacency
//! - Geometric, boundary, planar and texture quadric terms
//! - Lazily invalidated collapse queue
//! - Session driver with geometry-only fallback
//! - Edge flip post-pass

pub mod params;
pub mod quadric_error;
pub mod store;
pub mod queue;
pub mod strategy;
pub mod cleanup;
pub mod edge_collapse;
pub mod edge_flip;
pub mod report;

pub use params::*;
pub use quadric_error::Quadric;
pub use store::MeshStore;
pub use strategy::{select_strategy, DecimationStrategy, GeometryStrategy, TexturedStrategy};
pub use cleanup::{clean_mesh, CleanReport};
pub use edge_collapse::*;
pub use edge_flip::EdgeFlipOptimizer;
pub use report::DecimationReport;

use decicrate_core::{TriangleMesh, Result};

/// Simplify a mesh by reducing the number of faces/vertices
pub trait MeshSimplifier {
    /// Simplify mesh, removing `reduction_ratio` of its faces.
    /// The ratio lies strictly between 0 and 1.
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh>;
}

/// Run one decimation session with `params`.
pub fn decimate(mesh: &TriangleMesh, params: &DecimationParams) -> Result<DecimationOutcome> {
    QuadricDecimator::new(params.clone()).decimate(mesh)
}
