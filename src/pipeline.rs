//! End-to-end triage run.
//!
//! Stages run in data-dependency order:
//!
//! 1. adjacency (reused from the mesh when it matches the configured policy)
//! 2. quality metrics
//! 3. intrinsic rules
//! 4. node-to-reference distances and CAD rules, when a reference is given
//! 5. feature records and, when a scorer is given, normalized model scores
//! 6. risk assessment
//! 7. action mapping, scorecard and summary
//!
//! Each per-element stage is pure over read-only maps, so with the `rayon`
//! feature the stages fan out across the thread pool.

use std::collections::BTreeMap;

use crate::algs::cad_distance::{CancelToken, DistanceOpts, compute_node_distances};
use crate::geometry::quality::{QualityMap, analyze_quality};
use crate::mesh_error::TriageResult;
use crate::remediation::{Recommendation, plan_remediation};
use crate::risk::features::{FeatureMap, build_features};
use crate::risk::model::{AnomalyCalibration, ModelScorer, ModelScores};
use crate::risk::scorer::{RiskAssessment, assess_all};
use crate::rules::cad::{CadDeviation, CadThresholds, detect_cad_errors};
use crate::rules::error_tag::{TagMap, merge_tags};
use crate::rules::intrinsic::{IntrinsicThresholds, detect_intrinsic_errors};
use crate::summary::{HealthWeights, MeshSummary, Scorecard};
use crate::topology::adjacency::{Adjacency, AdjacencyPolicy, build_adjacency};
use crate::topology::ids::ElementId;
use crate::topology::mesh::Mesh;
use crate::validation::{ValidationOpts, ValidationReport, validate_remediation};

/// Every tunable of a run. Missing fields take their defaults when
/// deserialized.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub adjacency: AdjacencyPolicy,
    pub intrinsic: IntrinsicThresholds,
    pub cad: CadThresholds,
    pub distance: DistanceOpts,
    pub calibration: AnomalyCalibration,
    pub validation: ValidationOpts,
    pub health: HealthWeights,
}

impl PipelineConfig {
    pub fn validate(&self) -> TriageResult<()> {
        self.intrinsic.validate()?;
        self.cad.validate()?;
        self.distance.validate()?;
        self.calibration.validate()?;
        self.validation.validate()?;
        self.health.validate()
    }
}

/// CAD stage output.
#[derive(Clone, Debug)]
pub struct CadStage {
    pub deviation: CadDeviation,
    /// `false` when the distance search was cancelled part way.
    pub distances_complete: bool,
    pub measured_nodes: usize,
}

/// Everything a run produced.
#[derive(Clone, Debug)]
pub struct AnalysisReport {
    pub adjacency: Adjacency,
    pub quality: QualityMap,
    pub intrinsic_tags: TagMap,
    /// `None` when no reference mesh was supplied.
    pub cad: Option<CadStage>,
    /// Intrinsic and CAD tags combined.
    pub tags: TagMap,
    pub features: FeatureMap,
    /// `None` when no scorer was supplied.
    pub model_scores: Option<ModelScores>,
    pub risk: BTreeMap<ElementId, RiskAssessment>,
    /// One per element, ordered by element id.
    pub recommendations: Vec<Recommendation>,
    pub scorecard: Scorecard,
    pub summary: MeshSummary,
}

impl AnalysisReport {
    /// Recommendations asking for a mesh change.
    pub fn actionable(&self) -> impl Iterator<Item = &Recommendation> + '_ {
        self.recommendations.iter().filter(|r| r.action.is_actionable())
    }
}

/// Configured triage pipeline.
#[derive(Clone, Debug, Default)]
pub struct AnalysisPipeline {
    config: PipelineConfig,
}

impl AnalysisPipeline {
    /// Validate `config` and wrap it.
    pub fn new(config: PipelineConfig) -> TriageResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Analyze `mesh`, optionally against a `reference` geometry and with an
    /// external `scorer`. `cancel` interrupts the distance search; the run
    /// then continues with the distances measured so far.
    pub fn run(
        &self,
        mesh: &Mesh,
        reference: Option<&Mesh>,
        scorer: Option<&dyn ModelScorer>,
        cancel: Option<&CancelToken>,
    ) -> TriageResult<AnalysisReport> {
        let cfg = &self.config;

        let adjacency = match mesh.adjacency() {
            Some(adj) if adj.policy() == cfg.adjacency => adj.clone(),
            _ => build_adjacency(mesh, cfg.adjacency),
        };
        log::debug!("adjacency: {} elements ({:?})", adjacency.len(), cfg.adjacency);

        let quality = analyze_quality(mesh);
        log::debug!("quality: {} elements measured", quality.len());

        let intrinsic_tags = detect_intrinsic_errors(&quality, &adjacency, &cfg.intrinsic);

        let cad = reference.map(|reference| {
            let distances = compute_node_distances(mesh, reference, &cfg.distance, cancel);
            CadStage {
                deviation: detect_cad_errors(mesh, &distances, &cfg.cad),
                distances_complete: distances.is_complete(),
                measured_nodes: distances.len(),
            }
        });
        let tags = match &cad {
            Some(stage) => merge_tags(&intrinsic_tags, &stage.deviation.tags),
            None => intrinsic_tags.clone(),
        };

        let features = build_features(&quality, &adjacency, &tags);
        let model_scores = scorer
            .map(|s| ModelScores::evaluate(s, &features, &cfg.calibration))
            .transpose()?;

        let risk = assess_all(&features, model_scores.as_ref());
        let recommendations = plan_remediation(&risk, &tags);
        let scorecard = Scorecard::from_recommendations(&recommendations, &cfg.health);
        let summary = MeshSummary::new(mesh, &quality, &tags, &risk);

        log::info!(
            "triage: {} elements, {} actionable, health {:.1}",
            recommendations.len(),
            recommendations.iter().filter(|r| r.action.is_actionable()).count(),
            scorecard.health_score
        );

        Ok(AnalysisReport {
            adjacency,
            quality,
            intrinsic_tags,
            cad,
            tags,
            features,
            model_scores,
            risk,
            recommendations,
            scorecard,
            summary,
        })
    }

    /// Compare a remediated mesh against the initial one around `recommendations`.
    pub fn validate(
        &self,
        initial: &Mesh,
        remediated: &Mesh,
        recommendations: &[Recommendation],
    ) -> ValidationReport {
        validate_remediation(initial, remediated, recommendations, &self.config.validation)
    }
}
