//! Core data structures and traits for decicrate
//!
//! This crate provides the exchange mesh type shared by the I/O and
//! simplification crates, the common error type, and the bounding-box trait.

pub mod point;
pub mod mesh;
pub mod traits;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use traits::*;
pub use error::*;

