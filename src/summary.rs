//! Aggregate figures for downstream consumers: the recommendation scorecard
//! and a per-mesh summary that can be compared before and after remediation.

use std::collections::BTreeMap;

use crate::geometry::quality::QualityMap;
use crate::mesh_error::{MeshTriageError, TriageResult};
use crate::remediation::{Action, Recommendation};
use crate::risk::scorer::{RiskAssessment, RiskCategory};
use crate::rules::error_tag::TagMap;
use crate::topology::ids::ElementId;
use crate::topology::mesh::Mesh;

/// Health penalty per element of each severity.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HealthWeights {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            high: 5.0,
            medium: 2.0,
            low: 1.0,
        }
    }
}

impl HealthWeights {
    pub fn validate(&self) -> TriageResult<()> {
        if [self.high, self.medium, self.low]
            .iter()
            .all(|w| w.is_finite() && *w >= 0.0)
        {
            Ok(())
        } else {
            Err(MeshTriageError::InvalidConfig(format!(
                "health weights must be finite and >= 0, got {self:?}"
            )))
        }
    }

    fn weight(&self, category: RiskCategory) -> f64 {
        match category {
            RiskCategory::High => self.high,
            RiskCategory::Medium => self.medium,
            RiskCategory::Low => self.low,
        }
    }
}

fn empty_distribution() -> BTreeMap<RiskCategory, usize> {
    RiskCategory::ALL.into_iter().map(|c| (c, 0)).collect()
}

/// `100 - sum(weight * count)`, clamped to `[0, 100]`.
pub fn health_score(severity: &BTreeMap<RiskCategory, usize>, weights: &HealthWeights) -> f64 {
    let penalty: f64 = severity
        .iter()
        .map(|(&c, &n)| weights.weight(c) * n as f64)
        .sum();
    (100.0 - penalty).clamp(0.0, 100.0)
}

/// Severity and action distributions of a recommendation list.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Scorecard {
    /// Every category is present, possibly with a zero count.
    pub severity: BTreeMap<RiskCategory, usize>,
    /// Every action is present, possibly with a zero count.
    pub actions: BTreeMap<Action, usize>,
    pub health_score: f64,
}

impl Scorecard {
    pub fn from_recommendations(recommendations: &[Recommendation], weights: &HealthWeights) -> Self {
        let mut severity = empty_distribution();
        let mut actions: BTreeMap<Action, usize> = Action::ALL.into_iter().map(|a| (a, 0)).collect();
        for rec in recommendations {
            *severity.entry(rec.category).or_default() += 1;
            *actions.entry(rec.action).or_default() += 1;
        }
        let health_score = health_score(&severity, weights);
        Self {
            severity,
            actions,
            health_score,
        }
    }

    pub fn count(&self, category: RiskCategory) -> usize {
        self.severity.get(&category).copied().unwrap_or(0)
    }

    pub fn action_count(&self, action: Action) -> usize {
        self.actions.get(&action).copied().unwrap_or(0)
    }
}

/// Headline figures of one analyzed mesh.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeshSummary {
    pub total_elements: usize,
    /// Elements carrying at least one error tag.
    pub error_elements: usize,
    pub risk_distribution: BTreeMap<RiskCategory, usize>,
    /// Mean over finite aspect ratios; `None` if there are none.
    pub avg_aspect_ratio: Option<f64>,
    pub degenerate_elements: usize,
    pub orphan_nodes: usize,
}

impl MeshSummary {
    pub fn new(
        mesh: &Mesh,
        quality: &QualityMap,
        tags: &TagMap,
        risk: &BTreeMap<ElementId, RiskAssessment>,
    ) -> Self {
        let mut risk_distribution = empty_distribution();
        for assessment in risk.values() {
            *risk_distribution.entry(assessment.category).or_default() += 1;
        }
        let finite: Vec<f64> = quality
            .values()
            .filter_map(|q| q.aspect_ratio.finite())
            .collect();
        let avg_aspect_ratio = if finite.is_empty() {
            None
        } else {
            Some(finite.iter().sum::<f64>() / finite.len() as f64)
        };
        Self {
            total_elements: mesh.element_count(),
            error_elements: tags.values().filter(|t| !t.is_empty()).count(),
            risk_distribution,
            avg_aspect_ratio,
            degenerate_elements: quality.len() - finite.len(),
            orphan_nodes: mesh.orphan_nodes().len(),
        }
    }

    /// `remediated - self`, field by field.
    pub fn compare(&self, remediated: &MeshSummary) -> SummaryDelta {
        let diff = |a: usize, b: usize| b as i64 - a as i64;
        let risk_distribution = RiskCategory::ALL
            .into_iter()
            .map(|c| {
                let before = self.risk_distribution.get(&c).copied().unwrap_or(0);
                let after = remediated.risk_distribution.get(&c).copied().unwrap_or(0);
                (c, diff(before, after))
            })
            .collect();
        SummaryDelta {
            total_elements: diff(self.total_elements, remediated.total_elements),
            error_elements: diff(self.error_elements, remediated.error_elements),
            risk_distribution,
            avg_aspect_ratio: self
                .avg_aspect_ratio
                .zip(remediated.avg_aspect_ratio)
                .map(|(a, b)| b - a),
            degenerate_elements: diff(self.degenerate_elements, remediated.degenerate_elements),
            orphan_nodes: diff(self.orphan_nodes, remediated.orphan_nodes),
        }
    }
}

/// Signed change between two [`MeshSummary`] values.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SummaryDelta {
    pub total_elements: i64,
    pub error_elements: i64,
    pub risk_distribution: BTreeMap<RiskCategory, i64>,
    /// `None` unless both summaries have an average.
    pub avg_aspect_ratio: Option<f64>,
    pub degenerate_elements: i64,
    pub orphan_nodes: i64,
}
