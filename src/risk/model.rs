//! External model interface.
//!
//! A statistical model is an injected [`ModelScorer`]: it receives the
//! feature records of a run and returns one raw score per element. Two
//! output shapes are accepted:
//!
//! - [`ScoreKind::Probability`]: a calibrated failure probability. Values are
//!   clamped to `[0, 1]`.
//! - [`ScoreKind::Anomaly`]: an unbounded score, larger = more anomalous.
//!   Scores are mapped to `[0, 1]` through the percentile knots of
//!   [`AnomalyCalibration`]: `min -> 0`, `p_medium -> 0.35`,
//!   `p_high -> 0.65`, `max -> 1`, linear in between. The knots line up with
//!   the hybrid category thresholds, so the 85th/95th percentiles become the
//!   MEDIUM/HIGH boundaries of the model signal.
//!
//! [`ModelScores`] is the normalized result. Elements without model output
//! read as the neutral score `0.0`.
//!
//! [`ScoreTable`] is a precomputed scorer with an explicit initialization
//! step; scoring before [`ScoreTable::load`] fails with
//! [`MeshTriageError::ModelNotInitialized`], and a missing artifact fails
//! with [`MeshTriageError::ModelArtifactMissing`].

use std::collections::BTreeMap;
use std::path::Path;

use crate::io::scores::read_score_table_file;
use crate::mesh_error::{MeshTriageError, TriageResult};
use crate::risk::features::{ElementFeatures, FeatureMap};
use crate::topology::ids::ElementId;

/// Shape of a model's raw output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    Probability,
    Anomaly,
}

/// An externally supplied per-element scorer.
pub trait ModelScorer: Send + Sync {
    fn kind(&self) -> ScoreKind;

    /// Raw scores for the elements in `features`. Elements the model has no
    /// output for may be omitted.
    fn score(&self, features: &FeatureMap) -> TriageResult<BTreeMap<ElementId, f64>>;
}

/// Percentiles that anchor anomaly-score normalization.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnomalyCalibration {
    pub medium_percentile: f64,
    pub high_percentile: f64,
}

impl Default for AnomalyCalibration {
    fn default() -> Self {
        Self {
            medium_percentile: 85.0,
            high_percentile: 95.0,
        }
    }
}

impl AnomalyCalibration {
    pub fn validate(&self) -> TriageResult<()> {
        let ok = (0.0..=100.0).contains(&self.medium_percentile)
            && (0.0..=100.0).contains(&self.high_percentile)
            && self.medium_percentile <= self.high_percentile;
        if ok {
            Ok(())
        } else {
            Err(MeshTriageError::InvalidConfig(format!(
                "anomaly percentiles must satisfy 0 <= medium ({}) <= high ({}) <= 100",
                self.medium_percentile, self.high_percentile
            )))
        }
    }
}

/// Normalized model scores in `[0, 1]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelScores {
    scores: BTreeMap<ElementId, f64>,
}

impl ModelScores {
    /// Run `scorer` over `features` and normalize its output.
    pub fn evaluate(
        scorer: &dyn ModelScorer,
        features: &FeatureMap,
        calibration: &AnomalyCalibration,
    ) -> TriageResult<Self> {
        let raw = scorer.score(features)?;
        let missing = features.keys().filter(|id| !raw.contains_key(id)).count();
        if missing > 0 {
            log::warn!("model produced no score for {missing} elements; using 0.0");
        }
        Ok(Self::from_raw(scorer.kind(), raw, calibration))
    }

    /// Normalize raw scores of the given shape. Non-finite values are
    /// dropped and read as neutral.
    pub fn from_raw(
        kind: ScoreKind,
        raw: BTreeMap<ElementId, f64>,
        calibration: &AnomalyCalibration,
    ) -> Self {
        let finite: BTreeMap<ElementId, f64> =
            raw.into_iter().filter(|(_, v)| v.is_finite()).collect();
        let scores = match kind {
            ScoreKind::Probability => finite
                .into_iter()
                .map(|(id, v)| (id, v.clamp(0.0, 1.0)))
                .collect(),
            ScoreKind::Anomaly => {
                let mut sorted: Vec<f64> = finite.values().copied().collect();
                sorted.sort_by(f64::total_cmp);
                match AnomalyKnots::fit(&sorted, calibration) {
                    Some(knots) => finite
                        .into_iter()
                        .map(|(id, v)| (id, knots.normalize(v)))
                        .collect(),
                    None => finite.into_keys().map(|id| (id, 0.0)).collect(),
                }
            }
        };
        Self { scores }
    }

    /// Normalized score, if the model produced one.
    pub fn get(&self, id: ElementId) -> Option<f64> {
        self.scores.get(&id).copied()
    }

    /// Normalized score, or the neutral `0.0`.
    pub fn score_or_neutral(&self, id: ElementId) -> f64 {
        self.get(id).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Linear-interpolated percentile (`p` in `[0, 100]`) of sorted data.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let pos = (p.clamp(0.0, 100.0) / 100.0) * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

struct AnomalyKnots {
    xs: [f64; 4],
}

impl AnomalyKnots {
    const YS: [f64; 4] = [0.0, 0.35, 0.65, 1.0];

    /// `None` when the distribution is empty or has no spread.
    fn fit(sorted: &[f64], calibration: &AnomalyCalibration) -> Option<Self> {
        let min = *sorted.first()?;
        let max = *sorted.last()?;
        if max - min <= f64::EPSILON * max.abs().max(1.0) {
            return None;
        }
        let medium = percentile(sorted, calibration.medium_percentile)?;
        let high = percentile(sorted, calibration.high_percentile)?.max(medium);
        Some(Self {
            xs: [min, medium, high, max],
        })
    }

    fn normalize(&self, v: f64) -> f64 {
        let xs = &self.xs;
        if v <= xs[0] {
            return Self::YS[0];
        }
        if v >= xs[3] {
            return Self::YS[3];
        }
        // largest knot at or below v; v < xs[3] guarantees i < 3
        let i = (0..3).rev().find(|&i| xs[i] <= v).unwrap_or(0);
        let (x0, x1) = (xs[i], xs[i + 1]);
        let (y0, y1) = (Self::YS[i], Self::YS[i + 1]);
        let t = if x1 > x0 { (v - x0) / (x1 - x0) } else { 0.0 };
        (y0 + t * (y1 - y0)).clamp(0.0, 1.0)
    }
}

/// Adapts a closure `(element, features) -> Option<raw score>` into a
/// [`ModelScorer`].
pub struct FnScorer<F> {
    kind: ScoreKind,
    f: F,
}

impl<F> FnScorer<F>
where
    F: Fn(ElementId, &ElementFeatures) -> Option<f64> + Send + Sync,
{
    pub fn new(kind: ScoreKind, f: F) -> Self {
        Self { kind, f }
    }
}

impl<F> ModelScorer for FnScorer<F>
where
    F: Fn(ElementId, &ElementFeatures) -> Option<f64> + Send + Sync,
{
    fn kind(&self) -> ScoreKind {
        self.kind
    }

    fn score(&self, features: &FeatureMap) -> TriageResult<BTreeMap<ElementId, f64>> {
        Ok(features
            .iter()
            .filter_map(|(&id, f)| (self.f)(id, f).map(|s| (id, s)))
            .collect())
    }
}

/// Precomputed scores loaded from an `element_id,score` table.
#[derive(Clone, Debug)]
pub struct ScoreTable {
    kind: ScoreKind,
    scores: Option<BTreeMap<ElementId, f64>>,
}

impl ScoreTable {
    /// An uninitialized table; call [`ScoreTable::load`] before scoring.
    pub fn new(kind: ScoreKind) -> Self {
        Self { kind, scores: None }
    }

    /// An initialized table from in-memory scores.
    pub fn with_scores(kind: ScoreKind, scores: BTreeMap<ElementId, f64>) -> Self {
        Self {
            kind,
            scores: Some(scores),
        }
    }

    /// Load the score artifact at `path`.
    pub fn load(&mut self, path: impl AsRef<Path>) -> TriageResult<()> {
        let (scores, skipped) = read_score_table_file(path.as_ref())?;
        log::info!(
            "loaded {} model scores from {} ({} rows skipped)",
            scores.len(),
            path.as_ref().display(),
            skipped
        );
        self.scores = Some(scores);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.scores.is_some()
    }
}

impl ModelScorer for ScoreTable {
    fn kind(&self) -> ScoreKind {
        self.kind
    }

    fn score(&self, features: &FeatureMap) -> TriageResult<BTreeMap<ElementId, f64>> {
        let scores = self
            .scores
            .as_ref()
            .ok_or(MeshTriageError::ModelNotInitialized)?;
        Ok(features
            .keys()
            .filter_map(|id| scores.get(id).map(|s| (*id, *s)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(values: &[f64]) -> BTreeMap<ElementId, f64> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (ElementId::new(i as u64 + 1), *v))
            .collect()
    }

    #[test]
    fn percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&data, 0.0), Some(1.0));
        assert_eq!(percentile(&data, 50.0), Some(3.0));
        assert_eq!(percentile(&data, 100.0), Some(5.0));
        assert_eq!(percentile(&data, 87.5), Some(4.5));
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn probabilities_are_clamped() {
        let s = ModelScores::from_raw(
            ScoreKind::Probability,
            raw(&[-0.2, 0.4, 1.7, f64::NAN]),
            &AnomalyCalibration::default(),
        );
        assert_eq!(s.get(ElementId::new(1)), Some(0.0));
        assert_eq!(s.get(ElementId::new(2)), Some(0.4));
        assert_eq!(s.get(ElementId::new(3)), Some(1.0));
        assert_eq!(s.get(ElementId::new(4)), None);
        assert_eq!(s.score_or_neutral(ElementId::new(4)), 0.0);
    }

    #[test]
    fn anomaly_percentiles_map_to_category_knots() {
        // 0..=100: p85 = 85, p95 = 95
        let values: Vec<f64> = (0..=100).map(f64::from).collect();
        let s = ModelScores::from_raw(
            ScoreKind::Anomaly,
            raw(&values),
            &AnomalyCalibration::default(),
        );
        let at = |v: u64| s.get(ElementId::new(v + 1)).unwrap();
        assert_eq!(at(0), 0.0);
        assert!((at(85) - 0.35).abs() < 1e-12);
        assert!((at(95) - 0.65).abs() < 1e-12);
        assert_eq!(at(100), 1.0);
        assert!(at(90) > 0.35 && at(90) < 0.65);
    }

    #[test]
    fn flat_anomaly_distribution_is_neutral() {
        let s = ModelScores::from_raw(
            ScoreKind::Anomaly,
            raw(&[0.2, 0.2, 0.2]),
            &AnomalyCalibration::default(),
        );
        assert_eq!(s.len(), 3);
        assert!((1..=3).all(|i| s.get(ElementId::new(i)) == Some(0.0)));
    }

    #[test]
    fn uninitialized_table_refuses_to_score() {
        let table = ScoreTable::new(ScoreKind::Probability);
        assert_eq!(
            table.score(&FeatureMap::new()).unwrap_err(),
            MeshTriageError::ModelNotInitialized
        );
    }
}
