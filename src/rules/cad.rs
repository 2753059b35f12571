//! CAD-deviation rule set.
//!
//! Per-node distances to the reference geometry are aggregated per element
//! (mean, max, and coverage = fraction of incident nodes within
//! `coverage_tolerance`), then compared against thresholds:
//!
//! | Predicate | Default | Tag |
//! |---|---|---|
//! | `mean > max_mean_distance` | 2.5 | `CAD_DEVIATION_HIGH` |
//! | `max > max_node_distance` | 4.0 | `CAD_OUTLIER_NODE` |
//! | `coverage < min_coverage` | 0.7 | `CAD_COVERAGE_WEAK` |
//!
//! A node without a measured distance is "no data", never zero. What an
//! element with unmeasured nodes gets is decided by
//! [`MissingDistancePolicy`].

use std::collections::BTreeMap;

use crate::algs::cad_distance::NodeDistances;
use crate::mesh_error::{MeshTriageError, TriageResult};
use crate::par::map_keys;
use crate::rules::error_tag::{ErrorTag, TagMap, TagSet};
use crate::topology::ids::ElementId;
use crate::topology::mesh::{Element, Mesh};

/// Handling of nodes that have no measured distance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDistancePolicy {
    /// Elements with any unmeasured node get no aggregate and no CAD tag.
    #[default]
    Abstain,
    /// Unmeasured nodes count as distance `0.0`.
    TreatAsZero,
}

/// Thresholds for the CAD rule set.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CadThresholds {
    pub max_mean_distance: f64,
    pub max_node_distance: f64,
    pub min_coverage: f64,
    /// A node is "covered" when its distance is at most this value.
    pub coverage_tolerance: f64,
    pub missing: MissingDistancePolicy,
}

impl Default for CadThresholds {
    fn default() -> Self {
        Self {
            max_mean_distance: 2.5,
            max_node_distance: 4.0,
            min_coverage: 0.7,
            coverage_tolerance: 2.5,
            missing: MissingDistancePolicy::Abstain,
        }
    }
}

impl CadThresholds {
    pub fn validate(&self) -> TriageResult<()> {
        let limits = [
            ("max_mean_distance", self.max_mean_distance),
            ("max_node_distance", self.max_node_distance),
            ("coverage_tolerance", self.coverage_tolerance),
        ];
        for (name, value) in limits {
            if !value.is_finite() || value < 0.0 {
                return Err(MeshTriageError::InvalidConfig(format!(
                    "cad {name} must be finite and >= 0, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.min_coverage) {
            return Err(MeshTriageError::InvalidConfig(format!(
                "cad min_coverage must lie in [0, 1], got {}",
                self.min_coverage
            )));
        }
        Ok(())
    }
}

/// Per-element aggregate of node-to-reference distances.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CadAggregate {
    pub mean: f64,
    pub max: f64,
    /// Fraction of incident nodes within the coverage tolerance.
    pub coverage: f64,
    /// Nodes with a measured distance.
    pub measured: usize,
    /// Nodes without one (only non-zero under `TreatAsZero`).
    pub missing: usize,
}

/// Aggregates and tags produced by the CAD rule set.
#[derive(Clone, Debug, Default)]
pub struct CadDeviation {
    pub aggregates: BTreeMap<ElementId, CadAggregate>,
    /// Every element of the mesh has an entry, possibly empty.
    pub tags: TagMap,
}

impl CadDeviation {
    /// Elements that received no aggregate because of missing data.
    pub fn abstained(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.tags
            .keys()
            .copied()
            .filter(|id| !self.aggregates.contains_key(id))
    }
}

/// Aggregate distances over the corners of `element`.
pub fn aggregate_element(
    element: &Element,
    distances: &NodeDistances,
    thresholds: &CadThresholds,
) -> Option<CadAggregate> {
    let mut values = Vec::with_capacity(element.nodes().len());
    let mut missing = 0;
    for &nid in element.nodes() {
        match (distances.get(nid), thresholds.missing) {
            (Some(d), _) => values.push(d),
            (None, MissingDistancePolicy::Abstain) => return None,
            (None, MissingDistancePolicy::TreatAsZero) => {
                missing += 1;
                values.push(0.0);
            }
        }
    }
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let max = values.iter().copied().fold(0.0, f64::max);
    let covered = values
        .iter()
        .filter(|&&d| d <= thresholds.coverage_tolerance)
        .count();
    Some(CadAggregate {
        mean,
        max,
        coverage: covered as f64 / n,
        measured: values.len() - missing,
        missing,
    })
}

/// Apply the CAD predicates to an aggregate.
pub fn evaluate_aggregate(aggregate: &CadAggregate, thresholds: &CadThresholds) -> TagSet {
    let mut tags = TagSet::new();
    if aggregate.mean > thresholds.max_mean_distance {
        tags.insert(ErrorTag::CadDeviationHigh);
    }
    if aggregate.max > thresholds.max_node_distance {
        tags.insert(ErrorTag::CadOutlierNode);
    }
    if aggregate.coverage < thresholds.min_coverage {
        tags.insert(ErrorTag::CadCoverageWeak);
    }
    tags
}

/// Run the CAD rule set over every element of `mesh`.
pub fn detect_cad_errors(
    mesh: &Mesh,
    distances: &NodeDistances,
    thresholds: &CadThresholds,
) -> CadDeviation {
    let ids = mesh.element_ids();
    let aggregates = map_keys(&ids, |id| {
        aggregate_element(mesh.element(id)?, distances, thresholds)
    });
    let tags: TagMap = ids
        .iter()
        .map(|id| {
            let tags = aggregates
                .get(id)
                .map(|agg| evaluate_aggregate(agg, thresholds))
                .unwrap_or_default();
            (*id, tags)
        })
        .collect();
    let abstained = ids.len() - aggregates.len();
    if abstained > 0 {
        log::warn!("CAD rules abstained on {abstained} elements without distance data");
    }
    log::debug!(
        "CAD rules: {} of {} elements tagged",
        tags.values().filter(|t| !t.is_empty()).count(),
        tags.len()
    );
    CadDeviation { aggregates, tags }
}
