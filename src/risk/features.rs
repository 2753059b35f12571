//! Per-element feature records consumed by the risk scorer and by external
//! models.

use std::collections::BTreeMap;

use crate::geometry::quality::{AspectRatio, QualityMap};
use crate::rules::error_tag::{ErrorTag, TagMap, TagSet};
use crate::rules::intrinsic::area_transition_ratio;
use crate::topology::adjacency::Adjacency;
use crate::topology::ids::ElementId;

/// Finite stand-in for a degenerate aspect ratio in numeric feature vectors.
pub const DEGENERATE_ASPECT_FEATURE: f64 = 1.0e6;

/// Fixed feature record of one element.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ElementFeatures {
    pub area: f64,
    pub aspect_ratio: AspectRatio,
    pub skewness_proxy: AspectRatio,
    pub min_edge: f64,
    pub max_edge: f64,
    pub neighbor_count: usize,
    /// Max/min neighbor area, when defined.
    pub area_transition: Option<f64>,
    /// Intrinsic and CAD tags combined.
    pub tags: TagSet,
}

/// Feature records keyed by element id.
pub type FeatureMap = BTreeMap<ElementId, ElementFeatures>;

impl ElementFeatures {
    /// Length of [`ElementFeatures::to_vector`].
    pub const VECTOR_LEN: usize = 11;

    #[inline]
    pub fn has(&self, tag: ErrorTag) -> bool {
        self.tags.contains(&tag)
    }

    #[inline]
    pub fn error_count(&self) -> usize {
        self.tags.len()
    }

    /// Numeric form for external models:
    /// `[area, aspect, skew, min_edge, max_edge, neighbors, BAD_TRANSITION,
    /// MISSING_NEIGHBOR, SMALL_AREA, CAD_DEVIATION_HIGH, CAD_COVERAGE_WEAK]`.
    pub fn to_vector(&self) -> Vec<f64> {
        let ratio = |r: AspectRatio| r.finite().unwrap_or(DEGENERATE_ASPECT_FEATURE);
        let flag = |t: ErrorTag| if self.has(t) { 1.0 } else { 0.0 };
        vec![
            self.area,
            ratio(self.aspect_ratio),
            ratio(self.skewness_proxy),
            self.min_edge,
            self.max_edge,
            self.neighbor_count as f64,
            flag(ErrorTag::BadTransition),
            flag(ErrorTag::MissingNeighbor),
            flag(ErrorTag::SmallArea),
            flag(ErrorTag::CadDeviationHigh),
            flag(ErrorTag::CadCoverageWeak),
        ]
    }
}

/// Assemble feature records for every element with quality metrics.
pub fn build_features(quality: &QualityMap, adjacency: &Adjacency, tags: &TagMap) -> FeatureMap {
    quality
        .iter()
        .map(|(&id, q)| {
            let features = ElementFeatures {
                area: q.area,
                aspect_ratio: q.aspect_ratio,
                skewness_proxy: q.skewness_proxy,
                min_edge: q.min_edge,
                max_edge: q.max_edge,
                neighbor_count: adjacency.neighbor_count(id),
                area_transition: area_transition_ratio(id, quality, adjacency),
                tags: tags.get(&id).cloned().unwrap_or_default(),
            };
            (id, features)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_encodes_degenerate_as_finite() {
        let f = ElementFeatures {
            area: 0.0,
            aspect_ratio: AspectRatio::Degenerate,
            skewness_proxy: AspectRatio::Degenerate,
            min_edge: 0.0,
            max_edge: 1.0,
            neighbor_count: 2,
            area_transition: None,
            tags: TagSet::from([ErrorTag::SmallArea, ErrorTag::BadAspectRatio]),
        };
        let v = f.to_vector();
        assert_eq!(v.len(), ElementFeatures::VECTOR_LEN);
        assert!(v.iter().all(|x| x.is_finite()));
        assert_eq!(v[1], DEGENERATE_ASPECT_FEATURE);
        assert_eq!(v[8], 1.0);
        assert_eq!(f.error_count(), 2);
    }
}
