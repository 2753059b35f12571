//! Risk scoring: feature records, the external model interface and the
//! rule/hybrid scorer.

pub mod features;
pub mod model;
pub mod scorer;
