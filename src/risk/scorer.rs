//! Rule-based and hybrid risk scoring.
//!
//! The rule score is a bounded weighted sum:
//!
//! | Signal | Contribution |
//! |---|---|
//! | aspect ratio `> 3` (or degenerate) / `> 2` | `0.4` / `0.2` |
//! | neighbor area transition `> 3` / `> 2` | `0.3` / `0.15` |
//! | fewer than 2 neighbors | `0.2` |
//! | error tags | `0.1` each, at most `0.3` |
//!
//! clamped to `[0, 1]`. With a model present the hybrid score is
//! `0.6 * rule + 0.4 * model`, clamped to `[0, 1]`.
//!
//! Categories come from two deliberately different threshold tables:
//! [`HYBRID_THRESHOLDS`] (0.65 / 0.35) when a model score is fused in, and
//! [`RULE_ONLY_THRESHOLDS`] (0.6 / 0.3) when the rule score stands alone.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::mesh_error::MeshTriageError;
use crate::par::map_keys;
use crate::risk::features::{ElementFeatures, FeatureMap};
use crate::risk::model::ModelScores;
use crate::topology::ids::ElementId;

/// Weight of the rule score in the hybrid fusion.
pub const RULE_WEIGHT: f64 = 0.6;
/// Weight of the model score in the hybrid fusion.
pub const MODEL_WEIGHT: f64 = 0.4;

/// Severity bucket of a risk score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 3] = [RiskCategory::Low, RiskCategory::Medium, RiskCategory::High];

    pub const fn as_str(self) -> &'static str {
        match self {
            RiskCategory::Low => "LOW",
            RiskCategory::Medium => "MEDIUM",
            RiskCategory::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskCategory {
    type Err = MeshTriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        RiskCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MeshTriageError::MeshIoParse(format!("unknown risk category: {s}")))
    }
}

/// Lower bounds (inclusive) of the HIGH and MEDIUM categories.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CategoryThresholds {
    pub high: f64,
    pub medium: f64,
}

impl CategoryThresholds {
    pub fn categorize(&self, score: f64) -> RiskCategory {
        if score >= self.high {
            RiskCategory::High
        } else if score >= self.medium {
            RiskCategory::Medium
        } else {
            RiskCategory::Low
        }
    }
}

/// Category cutoffs for the rule score alone (no model available).
pub const RULE_ONLY_THRESHOLDS: CategoryThresholds = CategoryThresholds {
    high: 0.6,
    medium: 0.3,
};

/// Category cutoffs for the fused rule + model score.
pub const HYBRID_THRESHOLDS: CategoryThresholds = CategoryThresholds {
    high: 0.65,
    medium: 0.35,
};

/// Rule-derived risk in `[0, 1]`.
pub fn rule_score(features: &ElementFeatures) -> f64 {
    let mut risk = 0.0;

    if features.aspect_ratio.exceeds(3.0) {
        risk += 0.4;
    } else if features.aspect_ratio.exceeds(2.0) {
        risk += 0.2;
    }

    match features.area_transition {
        Some(t) if t > 3.0 => risk += 0.3,
        Some(t) if t > 2.0 => risk += 0.15,
        _ => {}
    }

    if features.neighbor_count < 2 {
        risk += 0.2;
    }

    risk += (features.error_count() as f64 * 0.1).min(0.3);

    risk.clamp(0.0, 1.0)
}

/// `0.6 * rule + 0.4 * model`, clamped to `[0, 1]`.
#[inline]
pub fn hybrid_score(rule: f64, model: f64) -> f64 {
    (RULE_WEIGHT * rule + MODEL_WEIGHT * model).clamp(0.0, 1.0)
}

/// Risk of one element.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RiskAssessment {
    pub rule_score: f64,
    /// Normalized model score; `None` when no model took part in the run.
    pub model_score: Option<f64>,
    /// Final score the category was derived from.
    pub score: f64,
    pub category: RiskCategory,
}

impl RiskAssessment {
    /// The model signal used as anomaly input to action mapping.
    pub fn anomaly_score(&self) -> f64 {
        self.model_score.unwrap_or(0.0)
    }
}

/// Assess one element. `model_score` switches between the hybrid and the
/// rule-only threshold table.
pub fn assess(features: &ElementFeatures, model_score: Option<f64>) -> RiskAssessment {
    let rule = rule_score(features);
    match model_score {
        Some(model) => {
            let score = hybrid_score(rule, model);
            RiskAssessment {
                rule_score: rule,
                model_score: Some(model),
                score,
                category: HYBRID_THRESHOLDS.categorize(score),
            }
        }
        None => RiskAssessment {
            rule_score: rule,
            model_score: None,
            score: rule,
            category: RULE_ONLY_THRESHOLDS.categorize(rule),
        },
    }
}

/// Assess every element. With a model, elements it did not score get the
/// neutral model score `0.0`.
pub fn assess_all(
    features: &FeatureMap,
    model: Option<&ModelScores>,
) -> BTreeMap<ElementId, RiskAssessment> {
    let ids: Vec<ElementId> = features.keys().copied().collect();
    map_keys(&ids, |id| {
        let f = features.get(&id)?;
        Some(assess(f, model.map(|m| m.score_or_neutral(id))))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::quality::AspectRatio;
    use crate::rules::error_tag::{ErrorTag, TagSet};

    fn features(aspect: f64, transition: Option<f64>, neighbors: usize, tags: &[ErrorTag]) -> ElementFeatures {
        ElementFeatures {
            area: 1.0,
            aspect_ratio: AspectRatio::Finite(aspect),
            skewness_proxy: AspectRatio::Finite(aspect),
            min_edge: 1.0,
            max_edge: aspect,
            neighbor_count: neighbors,
            area_transition: transition,
            tags: tags.iter().copied().collect::<TagSet>(),
        }
    }

    #[test]
    fn clean_element_scores_zero() {
        assert_eq!(rule_score(&features(1.0, Some(1.0), 3, &[])), 0.0);
    }

    #[test]
    fn contributions_add_up_and_clamp() {
        let f = features(
            5.0,
            Some(4.0),
            0,
            &[ErrorTag::BadAspectRatio, ErrorTag::HighSkewness, ErrorTag::MissingNeighbor, ErrorTag::SmallArea],
        );
        // 0.4 + 0.3 + 0.2 + 0.3 = 1.2 -> 1.0
        assert_eq!(rule_score(&f), 1.0);

        let f = features(2.5, Some(2.5), 2, &[]);
        assert!((rule_score(&f) - 0.35).abs() < 1e-12);
    }

    #[test]
    fn degenerate_aspect_counts_as_severe() {
        let mut f = features(1.0, None, 5, &[]);
        f.aspect_ratio = AspectRatio::Degenerate;
        assert!((rule_score(&f) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn threshold_tables_differ() {
        // 0.62 is HIGH alone but MEDIUM in the hybrid table
        assert_eq!(RULE_ONLY_THRESHOLDS.categorize(0.62), RiskCategory::High);
        assert_eq!(HYBRID_THRESHOLDS.categorize(0.62), RiskCategory::Medium);
        assert_eq!(RULE_ONLY_THRESHOLDS.categorize(0.32), RiskCategory::Medium);
        assert_eq!(HYBRID_THRESHOLDS.categorize(0.32), RiskCategory::Low);
    }

    #[test]
    fn missing_model_falls_back_to_rule_table() {
        let f = features(5.0, None, 3, &[ErrorTag::BadAspectRatio, ErrorTag::HighSkewness]);
        // 0.4 + 0.2 = 0.6
        let rule_only = assess(&f, None);
        assert_eq!(rule_only.category, RiskCategory::High);
        let hybrid = assess(&f, Some(0.0));
        assert!((hybrid.score - 0.36).abs() < 1e-12);
        assert_eq!(hybrid.category, RiskCategory::Medium);
    }
}
