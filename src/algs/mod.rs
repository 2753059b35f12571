//! Spatial search over node clouds.

pub mod cad_distance;
pub mod point_grid;

pub use cad_distance::{CancelToken, DistanceOpts, NodeDistances, compute_node_distances};
