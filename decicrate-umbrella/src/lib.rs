//! # decicrate
//!
//! Quadric error metric mesh decimation with texture-seam preservation.
//!
//! This is the umbrella crate that provides convenient access to all decicrate functionality.
//! You can use this crate to get everything in one place, or use individual crates for
//! more granular control over dependencies.
//!
//! ## Features
//!
//! - **Core**: Triangle mesh exchange type, error type, point aliases
//! - **I/O**: Wavefront OBJ reading and writing
//! - **Simplification**: Quadric edge collapse decimation, cleanup and edge flips
//!
//! ## Quick Start
//!
//! ```rust
//! use decicrate::prelude::*;
//!
//! let mesh = TriangleMesh::from_vertices_and_faces(
//!     vec![
//!         Point3f::new(0.0, 0.0, 0.0),
//!         Point3f::new(1.0, 0.0, 0.0),
//!         Point3f::new(1.0, 1.0, 0.0),
//!         Point3f::new(0.0, 1.0, 0.0),
//!     ],
//!     vec![[0, 1, 2], [0, 2, 3]],
//! );
//! let outcome = decimate(&mesh, &DecimationParams::new().with_target_faces(2)).unwrap();
//! assert_eq!(outcome.mesh.face_count(), 2);
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables core, io, and simplification
//! - `io`: OBJ file support
//! - `simplification`: Decimation engine and the `host` adapter
//! - `all`: Enables all features

// Re-export core functionality
pub use decicrate_core::*;

// Re-export sub-crates
#[cfg(feature = "io")]
pub use decicrate_io as io;

#[cfg(feature = "simplification")]
pub use decicrate_simplification as simplification;

#[cfg(feature = "simplification")]
pub mod host;

/// Convenient imports for common use cases
pub mod prelude {
    pub use decicrate_core::*;

    #[cfg(feature = "io")]
    pub use decicrate_io::{read_mesh, write_mesh, MeshReader, MeshWriter, ObjReader, ObjWriter};

    #[cfg(feature = "simplification")]
    pub use decicrate_simplification::{
        decimate, DecimationOutcome, DecimationParams, DecimationReport, MeshSimplifier,
        QuadricDecimator, TargetSpec,
    };
}
