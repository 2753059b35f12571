//! Mesh topology: identifiers, element types, the mesh store and element
//! adjacency.

pub mod adjacency;
pub mod element_type;
pub mod ids;
pub mod mesh;
