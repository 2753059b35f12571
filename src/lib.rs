#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-triage
//!
//! mesh-triage analyzes surface meshes of TRI and QUAD elements, flags
//! quality defects, fuses rule-based and model-based risk, and prescribes
//! one remediation per element. A second pass validates a remediated mesh
//! against the original.
//!
//! ## Features
//! - Element adjacency by shared edge or shared node
//! - Intrinsic quality metrics with an explicit degenerate sentinel
//! - Intrinsic and CAD-deviation rule sets producing closed error tags
//! - Grid-accelerated, cancellable node-to-reference distance search
//! - Hybrid risk scoring against an injected [`ModelScorer`](crate::risk::model::ModelScorer)
//! - Deterministic action mapping, scorecard and region-based validation
//! - Lenient CSV loading of node/element tables
//!
//! ## Determinism
//!
//! Every per-element map is a `BTreeMap` keyed by id. With the `rayon`
//! feature enabled the per-element stages run on the thread pool, and the
//! output is identical to the serial run.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-triage = "0.3"
//! # features = ["rayon"]
//! ```
//!
//! ```no_run
//! use mesh_triage::prelude::*;
//!
//! # fn main() -> Result<(), MeshTriageError> {
//! let mesh = load_mesh("first_mesh_NODE.csv", "first_mesh_ELEMENT.csv")?.mesh;
//! let cad = load_mesh("cad_NODE.csv", "cad_ELEMENT.csv")?.mesh;
//! let report = AnalysisPipeline::default().run(&mesh, Some(&cad), None, None)?;
//! for rec in report.actionable() {
//!     println!("{} {} {:.2}", rec.element, rec.action, rec.confidence);
//! }
//! # Ok(())
//! # }
//! ```

pub mod algs;
pub mod geometry;
pub mod io;
pub mod mesh_error;
pub(crate) mod par;
pub mod pipeline;
pub mod remediation;
pub mod risk;
pub mod rules;
pub mod summary;
pub mod topology;
pub mod validation;

/// A convenient prelude to import the most-used types:
pub mod prelude {
    pub use crate::algs::cad_distance::{
        CancelToken, DistanceOpts, NodeDistances, SearchStrategy, compute_node_distances,
    };
    pub use crate::geometry::quality::{AspectRatio, ElementQuality, QualityMap, analyze_quality};
    pub use crate::io::csv::load_mesh;
    pub use crate::io::{CsvMeshReader, LoadReport, LoadedMesh};
    pub use crate::mesh_error::{MeshTriageError, TriageResult};
    pub use crate::pipeline::{AnalysisPipeline, AnalysisReport, PipelineConfig};
    pub use crate::remediation::{Action, ActionScope, Recommendation, map_action};
    pub use crate::risk::features::{ElementFeatures, FeatureMap};
    pub use crate::risk::model::{
        AnomalyCalibration, FnScorer, ModelScorer, ModelScores, ScoreKind, ScoreTable,
    };
    pub use crate::risk::scorer::{RiskAssessment, RiskCategory};
    pub use crate::rules::cad::{CadThresholds, MissingDistancePolicy};
    pub use crate::rules::error_tag::{ErrorTag, TagMap, TagSet};
    pub use crate::rules::intrinsic::IntrinsicThresholds;
    pub use crate::summary::{HealthWeights, MeshSummary, Scorecard, SummaryDelta};
    pub use crate::topology::adjacency::{Adjacency, AdjacencyPolicy};
    pub use crate::topology::element_type::ElementType;
    pub use crate::topology::ids::{ElementId, NodeId};
    pub use crate::topology::mesh::{Element, Mesh, MeshBuilder, Node};
    pub use crate::validation::{ValidationOpts, ValidationReport, element_changed};
}
