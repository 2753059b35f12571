//! Intrinsic rule set: geometry and topology predicates.
//!
//! Each predicate is evaluated independently; an element can carry any
//! combination of the resulting tags.
//!
//! | Predicate | Default | Tag |
//! |---|---|---|
//! | `area < min_area` | 1.0 | `SMALL_AREA` |
//! | `aspect_ratio > max_aspect_ratio` | 3.0 | `BAD_ASPECT_RATIO` |
//! | `skewness_proxy > max_skewness` | 3.0 | `HIGH_SKEWNESS` |
//! | `neighbor_count <= min_neighbors` | 1 | `MISSING_NEIGHBOR` |
//! | `max/min neighbor area > max_area_transition` | 3.0 | `BAD_TRANSITION` |
//!
//! Degenerate aspect ratios exceed every threshold.

use crate::geometry::quality::{ElementQuality, QualityMap};
use crate::mesh_error::{MeshTriageError, TriageResult};
use crate::par::map_keys;
use crate::rules::error_tag::{ErrorTag, TagMap, TagSet};
use crate::topology::adjacency::Adjacency;
use crate::topology::ids::ElementId;

/// Thresholds for the intrinsic rule set.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct IntrinsicThresholds {
    /// Tag `SMALL_AREA` when the area is strictly below this value.
    pub min_area: f64,
    /// Tag `BAD_ASPECT_RATIO` when the aspect ratio exceeds this value.
    pub max_aspect_ratio: f64,
    /// Tag `HIGH_SKEWNESS` when the skewness proxy exceeds this value.
    pub max_skewness: f64,
    /// Tag `MISSING_NEIGHBOR` when the neighbor count is at most this value.
    pub min_neighbors: usize,
    /// Tag `BAD_TRANSITION` when the neighbor area ratio exceeds this value.
    pub max_area_transition: f64,
}

impl Default for IntrinsicThresholds {
    fn default() -> Self {
        Self {
            min_area: 1.0,
            max_aspect_ratio: 3.0,
            max_skewness: 3.0,
            min_neighbors: 1,
            max_area_transition: 3.0,
        }
    }
}

impl IntrinsicThresholds {
    pub fn validate(&self) -> TriageResult<()> {
        let limits = [
            ("min_area", self.min_area),
            ("max_aspect_ratio", self.max_aspect_ratio),
            ("max_skewness", self.max_skewness),
            ("max_area_transition", self.max_area_transition),
        ];
        for (name, value) in limits {
            if !value.is_finite() || value < 0.0 {
                return Err(MeshTriageError::InvalidConfig(format!(
                    "intrinsic {name} must be finite and >= 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Ratio of the largest to the smallest neighbor area.
///
/// Only neighbors with known metrics take part. `None` when the element has
/// no such neighbors or the smallest neighbor area is zero.
pub fn area_transition_ratio(
    id: ElementId,
    quality: &QualityMap,
    adjacency: &Adjacency,
) -> Option<f64> {
    let areas = adjacency
        .neighbors(id)?
        .iter()
        .filter_map(|n| quality.get(n).map(|q| q.area));
    let (min, max) = areas.fold(None, |acc: Option<(f64, f64)>, a| match acc {
        None => Some((a, a)),
        Some((lo, hi)) => Some((lo.min(a), hi.max(a))),
    })?;
    (min > 0.0).then(|| max / min)
}

/// Evaluate the intrinsic predicates for one element.
pub fn evaluate_element(
    id: ElementId,
    metrics: &ElementQuality,
    quality: &QualityMap,
    adjacency: &Adjacency,
    thresholds: &IntrinsicThresholds,
) -> TagSet {
    let mut tags = TagSet::new();
    if metrics.area < thresholds.min_area {
        tags.insert(ErrorTag::SmallArea);
    }
    if metrics.aspect_ratio.exceeds(thresholds.max_aspect_ratio) {
        tags.insert(ErrorTag::BadAspectRatio);
    }
    if metrics.skewness_proxy.exceeds(thresholds.max_skewness) {
        tags.insert(ErrorTag::HighSkewness);
    }
    if adjacency.neighbor_count(id) <= thresholds.min_neighbors {
        tags.insert(ErrorTag::MissingNeighbor);
    }
    if area_transition_ratio(id, quality, adjacency)
        .is_some_and(|ratio| ratio > thresholds.max_area_transition)
    {
        tags.insert(ErrorTag::BadTransition);
    }
    tags
}

/// Run the intrinsic rule set over every element with metrics.
///
/// Every element in `quality` gets an entry, possibly empty.
pub fn detect_intrinsic_errors(
    quality: &QualityMap,
    adjacency: &Adjacency,
    thresholds: &IntrinsicThresholds,
) -> TagMap {
    let ids: Vec<ElementId> = quality.keys().copied().collect();
    let tags = map_keys(&ids, |id| {
        let metrics = quality.get(&id)?;
        Some(evaluate_element(id, metrics, quality, adjacency, thresholds))
    });
    log::debug!(
        "intrinsic rules: {} of {} elements tagged",
        tags.values().filter(|t| !t.is_empty()).count(),
        tags.len()
    );
    tags
}
