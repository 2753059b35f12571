//! Rule engine: intrinsic (geometry/topology) and CAD-deviation rule sets.
//!
//! Both sets emit [`TagMap`](error_tag::TagMap)s keyed by element id; use
//! [`merge_tags`](error_tag::merge_tags) to combine them.

pub mod cad;
pub mod error_tag;
pub mod intrinsic;
