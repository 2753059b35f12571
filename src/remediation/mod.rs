//! Deterministic remediation planning.
//!
//! [`map_action`] turns an element's error tags, risk category and anomaly
//! score into exactly one [`Recommendation`]. The cascade is evaluated top to
//! bottom and the first matching branch wins:
//!
//! 1. `MISSING_NEIGHBOR` or `ORPHAN_NODE` -> `REMESH_REGION` (0.95). A
//!    connectivity failure overrides every risk signal.
//! 2. HIGH risk:
//!    - `BAD_ASPECT_RATIO` / `HIGH_SKEWNESS`, or anomaly `> 0.15` ->
//!      `MOVE_NODES`, `min(0.95, 0.6 + a)`
//!    - `CAD_DEVIATION_HIGH` -> `PROJECT_TO_CAD`, `min(0.9, 0.55 + a)`
//!    - otherwise -> `LOCAL_REMESH`, `min(0.9, 0.55 + a)`
//! 3. MEDIUM risk:
//!    - `BAD_TRANSITION` / `SMALL_AREA` -> `SMOOTH_MESH`, `min(0.8, 0.5 + a)`
//!    - `CAD_DEVIATION_HIGH` -> `PROJECT_TO_CAD`, `min(0.8, 0.5 + a)`
//!    - otherwise -> `CHECK_GEOMETRY`, `min(0.75, 0.45 + a)`
//! 4. LOW risk -> `NO_ACTION`, `0.4 + a` rounded to two decimals.
//!
//! Confidences are finally clamped to `[0, 1]`; a non-finite anomaly score
//! reads as `0.0`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::mesh_error::MeshTriageError;
use crate::risk::scorer::{RiskAssessment, RiskCategory};
use crate::rules::error_tag::{ErrorTag, TagMap, TagSet};
use crate::topology::ids::ElementId;

/// Anomaly score above which a HIGH-risk element gets its nodes moved even
/// without a shape tag.
pub const ANOMALY_MOVE_THRESHOLD: f64 = 0.15;

/// Prescribed remediation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    RemeshRegion,
    MoveNodes,
    ProjectToCad,
    LocalRemesh,
    SmoothMesh,
    CheckGeometry,
    NoAction,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::RemeshRegion,
        Action::MoveNodes,
        Action::ProjectToCad,
        Action::LocalRemesh,
        Action::SmoothMesh,
        Action::CheckGeometry,
        Action::NoAction,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Action::RemeshRegion => "REMESH_REGION",
            Action::MoveNodes => "MOVE_NODES",
            Action::ProjectToCad => "PROJECT_TO_CAD",
            Action::LocalRemesh => "LOCAL_REMESH",
            Action::SmoothMesh => "SMOOTH_MESH",
            Action::CheckGeometry => "CHECK_GEOMETRY",
            Action::NoAction => "NO_ACTION",
        }
    }

    /// Whether the action asks for a mesh change.
    pub const fn is_actionable(self) -> bool {
        !matches!(self, Action::NoAction)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = MeshTriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Action::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MeshTriageError::MeshIoParse(format!("unknown action: {s}")))
    }
}

/// Granularity at which an action applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionScope {
    Node,
    Element,
    Region,
    None,
}

impl ActionScope {
    pub const ALL: [ActionScope; 4] = [
        ActionScope::Node,
        ActionScope::Element,
        ActionScope::Region,
        ActionScope::None,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ActionScope::Node => "NODE",
            ActionScope::Element => "ELEMENT",
            ActionScope::Region => "REGION",
            ActionScope::None => "NONE",
        }
    }
}

impl fmt::Display for ActionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionScope {
    type Err = MeshTriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ActionScope::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MeshTriageError::MeshIoParse(format!("unknown action scope: {s}")))
    }
}

/// One remediation prescription for one element.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Recommendation {
    pub element: ElementId,
    pub category: RiskCategory,
    pub action: Action,
    pub scope: ActionScope,
    pub reason: String,
    /// In `[0, 1]`.
    pub confidence: f64,
    /// Tags that led to this recommendation.
    pub tags: TagSet,
}

impl Recommendation {
    /// Per-tag remediation advice, in tag order.
    pub fn hints(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tags.iter().map(|t| t.hint())
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

/// Map one element to its remediation. Pure and total.
pub fn map_action(
    element: ElementId,
    tags: &TagSet,
    category: RiskCategory,
    anomaly_score: f64,
) -> Recommendation {
    let a = if anomaly_score.is_finite() { anomaly_score } else { 0.0 };
    let has = |t: ErrorTag| tags.contains(&t);

    let (action, scope, confidence, reason) = if tags.iter().any(|t| t.is_connectivity()) {
        (
            Action::RemeshRegion,
            ActionScope::Region,
            0.95,
            "Connectivity failure: missing neighbors or orphan nodes",
        )
    } else {
        match category {
            RiskCategory::High => {
                if has(ErrorTag::BadAspectRatio)
                    || has(ErrorTag::HighSkewness)
                    || a > ANOMALY_MOVE_THRESHOLD
                {
                    (
                        Action::MoveNodes,
                        ActionScope::Node,
                        (0.6 + a).min(0.95),
                        "Severe shape distortion or strong anomaly at high risk",
                    )
                } else if has(ErrorTag::CadDeviationHigh) {
                    (
                        Action::ProjectToCad,
                        ActionScope::Node,
                        (0.55 + a).min(0.9),
                        "High-risk element deviates from the CAD surface",
                    )
                } else {
                    (
                        Action::LocalRemesh,
                        ActionScope::Element,
                        (0.55 + a).min(0.9),
                        "High risk without a dominant defect",
                    )
                }
            }
            RiskCategory::Medium => {
                if has(ErrorTag::BadTransition) || has(ErrorTag::SmallArea) {
                    (
                        Action::SmoothMesh,
                        ActionScope::Node,
                        (0.5 + a).min(0.8),
                        "Poor size transition or undersized element",
                    )
                } else if has(ErrorTag::CadDeviationHigh) {
                    (
                        Action::ProjectToCad,
                        ActionScope::Node,
                        (0.5 + a).min(0.8),
                        "Moderate-risk element deviates from the CAD surface",
                    )
                } else {
                    (
                        Action::CheckGeometry,
                        ActionScope::Element,
                        (0.45 + a).min(0.75),
                        "Moderate risk; geometry should be reviewed",
                    )
                }
            }
            RiskCategory::Low => (
                Action::NoAction,
                ActionScope::None,
                round2(0.4 + a),
                "Within acceptable quality limits",
            ),
        }
    };

    Recommendation {
        element,
        category,
        action,
        scope,
        reason: reason.to_string(),
        confidence: confidence.clamp(0.0, 1.0),
        tags: tags.clone(),
    }
}

/// One recommendation per assessed element, ordered by element id.
pub fn plan_remediation(
    risk: &BTreeMap<ElementId, RiskAssessment>,
    tags: &TagMap,
) -> Vec<Recommendation> {
    let empty = TagSet::new();
    let plan: Vec<Recommendation> = risk
        .iter()
        .map(|(&id, assessment)| {
            let element_tags = tags.get(&id).unwrap_or(&empty);
            map_action(id, element_tags, assessment.category, assessment.anomaly_score())
        })
        .collect();
    log::debug!(
        "remediation plan: {} recommendations, {} actionable",
        plan.len(),
        plan.iter().filter(|r| r.action.is_actionable()).count()
    );
    plan
}
