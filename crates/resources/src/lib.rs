//! Procedural geometry and material records.
//!
//! - [`geometry`]: box, grid, geosphere and cylinder generators
//! - [`mesh`]: packing of generated shapes into one 16-bit indexed mesh with
//!   named submeshes
//! - [`material`]: surface material records

pub mod error;
pub mod geometry;
pub mod material;
pub mod mesh;

pub use error::{ResourceError, ResourceResult};
pub use geometry::{GeometryVertex, MeshData};
pub use material::{Material, shapes_materials};
pub use mesh::{MeshGeometry, SubmeshGeometry};
