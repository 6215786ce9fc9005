//! Core resource definitions
//!
//! CPU-side data consumed by the draw pipeline, independent of any GPU backend:
//! - Vertex: the packed 64-byte vertex layout
//! - Mesh: vertex/index arrays plus one material
//! - Material: shading technique tag and Phong terms

pub mod geometry;
pub mod material;
pub mod mesh;

pub use geometry::Vertex;
pub use material::{Material, MaterialType};
pub use mesh::Mesh;
