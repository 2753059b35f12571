//! Geometry utilities for mesh-triage.
//!
//! Vector helpers on `[f64; 3]` and the per-element intrinsic quality
//! metrics.

pub mod quality;
pub mod vector;
