//! Before/after comparison of a remediated mesh.
//!
//! Element ids are only comparable across mesh versions as long as the
//! remeshing tool preserves them, so quality is judged per *region*: all
//! elements whose centroid lies within [`ValidationOpts::region_radius`] of
//! the recommended element's initial centroid, gathered in each mesh
//! independently.
//!
//! Actionable recommendations feed the change-hit, quality-improvement and
//! displacement figures. `NO_ACTION` recommendations feed the stability
//! check instead: untouched elements should stay untouched.

use std::collections::BTreeMap;

use crate::geometry::quality::{QualityMap, analyze_quality};
use crate::geometry::vector::{centroid, distance};
use crate::mesh_error::{MeshTriageError, TriageResult};
use crate::par::map_slice;
use crate::remediation::Recommendation;
use crate::topology::ids::ElementId;
use crate::topology::mesh::Mesh;

/// Tolerances for [`validate_remediation`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ValidationOpts {
    /// A node moved farther than this counts as a change.
    pub displacement_tolerance: f64,
    /// Radius of the region gathered around each recommended element.
    pub region_radius: f64,
}

impl Default for ValidationOpts {
    fn default() -> Self {
        Self {
            displacement_tolerance: 1e-3,
            region_radius: 5.0,
        }
    }
}

impl ValidationOpts {
    pub fn validate(&self) -> TriageResult<()> {
        if !self.displacement_tolerance.is_finite() || self.displacement_tolerance < 0.0 {
            return Err(MeshTriageError::InvalidConfig(format!(
                "displacement_tolerance must be finite and >= 0, got {}",
                self.displacement_tolerance
            )));
        }
        if !self.region_radius.is_finite() || self.region_radius < 0.0 {
            return Err(MeshTriageError::InvalidConfig(format!(
                "region_radius must be finite and >= 0, got {}",
                self.region_radius
            )));
        }
        Ok(())
    }
}

/// How an element differs between two mesh versions.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementChange {
    /// Same node set, every node within tolerance.
    Unchanged,
    /// Not present in the initial mesh; nothing to compare.
    Unknown,
    /// Gone from the final mesh.
    Removed,
    /// Node set differs.
    Reconnected,
    /// A node of the element no longer exists in the final mesh.
    NodeRemoved,
    /// Same nodes, at least one moved beyond tolerance.
    Moved,
}

impl ElementChange {
    pub fn is_changed(self) -> bool {
        !matches!(self, ElementChange::Unchanged | ElementChange::Unknown)
    }
}

/// Classify the change of element `id` from `initial` to `remediated`.
pub fn classify_change(
    id: ElementId,
    initial: &Mesh,
    remediated: &Mesh,
    tolerance: f64,
) -> ElementChange {
    let Some(before) = initial.element(id) else {
        return ElementChange::Unknown;
    };
    let Some(after) = remediated.element(id) else {
        return ElementChange::Removed;
    };
    if before.node_set() != after.node_set() {
        return ElementChange::Reconnected;
    }
    for &nid in before.nodes() {
        let (Some(p0), Some(p1)) = (initial.node(nid), remediated.node(nid)) else {
            return ElementChange::NodeRemoved;
        };
        if distance(p0.position(), p1.position()) > tolerance {
            return ElementChange::Moved;
        }
    }
    ElementChange::Unchanged
}

/// `true` if element `id` was removed, reconnected or moved.
pub fn element_changed(id: ElementId, initial: &Mesh, remediated: &Mesh, tolerance: f64) -> bool {
    classify_change(id, initial, remediated, tolerance).is_changed()
}

/// Distance between the centroid of the element's initial nodes in both
/// meshes. `None` when the element is unknown initially or one of its nodes
/// vanished (the element was remeshed).
pub fn centroid_displacement(id: ElementId, initial: &Mesh, remediated: &Mesh) -> Option<f64> {
    let element = initial.element(id)?;
    let before = initial.element_positions(element)?;
    let after = remediated.element_positions(element)?;
    Some(distance(centroid(&before)?, centroid(&after)?))
}

/// Element centroids of one mesh, in id order.
fn centroids(mesh: &Mesh) -> Vec<(ElementId, [f64; 3])> {
    mesh.elements()
        .filter_map(|e| Some((e.id(), centroid(&mesh.element_positions(e)?)?)))
        .collect()
}

/// Elements whose centroid lies within `radius` of `center` (inclusive).
pub fn region_elements(mesh: &Mesh, center: [f64; 3], radius: f64) -> Vec<ElementId> {
    centroids(mesh)
        .into_iter()
        .filter(|&(_, c)| distance(c, center) <= radius)
        .map(|(id, _)| id)
        .collect()
}

/// Mean finite aspect ratio over `ids`. Degenerate and unmeasured elements
/// are left out; `None` if nothing remains.
pub fn region_average_aspect(ids: &[ElementId], quality: &QualityMap) -> Option<f64> {
    let values: Vec<f64> = ids
        .iter()
        .filter_map(|id| quality.get(id)?.aspect_ratio.finite())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Non-regression of elements that were not meant to change.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StabilityReport {
    pub checked: usize,
    pub stable: usize,
    /// `stable / checked`, `0.0` if nothing was checked.
    pub rate: f64,
}

/// Outcome of [`validate_remediation`].
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ValidationReport {
    /// Actionable recommendations checked.
    pub total: usize,
    pub changed: usize,
    /// Regions whose mean aspect ratio dropped.
    pub improved: usize,
    /// Regions with a defined average in both meshes.
    pub regions_compared: usize,
    /// Changed elements with a measurable centroid displacement.
    pub displaced: usize,
    pub change_hit_rate: f64,
    pub quality_improvement_rate: f64,
    pub avg_displacement: f64,
    pub stability: StabilityReport,
    /// Per-element classification of the actionable recommendations.
    pub changes: BTreeMap<ElementId, ElementChange>,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

struct RegionIndex {
    centroids: Vec<(ElementId, [f64; 3])>,
    quality: QualityMap,
}

impl RegionIndex {
    fn new(mesh: &Mesh) -> Self {
        Self {
            centroids: centroids(mesh),
            quality: analyze_quality(mesh),
        }
    }

    fn average_around(&self, center: [f64; 3], radius: f64) -> Option<f64> {
        let ids: Vec<ElementId> = self
            .centroids
            .iter()
            .filter(|&&(_, c)| distance(c, center) <= radius)
            .map(|&(id, _)| id)
            .collect();
        region_average_aspect(&ids, &self.quality)
    }
}

/// Compare `initial` and `remediated` around every recommendation.
pub fn validate_remediation(
    initial: &Mesh,
    remediated: &Mesh,
    recommendations: &[Recommendation],
    opts: &ValidationOpts,
) -> ValidationReport {
    let (actionable, untouched): (Vec<&Recommendation>, Vec<&Recommendation>) = recommendations
        .iter()
        .partition(|r| r.action.is_actionable());

    let before = RegionIndex::new(initial);
    let after = RegionIndex::new(remediated);

    let per_element = map_slice(&actionable, |rec| {
        let id = rec.element;
        let change = classify_change(id, initial, remediated, opts.displacement_tolerance);
        let displacement = if change.is_changed() {
            centroid_displacement(id, initial, remediated)
        } else {
            None
        };
        let improved = initial.element_centroid(id).and_then(|center| {
            let q0 = before.average_around(center, opts.region_radius)?;
            let q1 = after.average_around(center, opts.region_radius)?;
            Some(q1 < q0)
        });
        (id, change, displacement, improved)
    });

    let mut report = ValidationReport {
        total: actionable.len(),
        ..ValidationReport::default()
    };
    let mut displacement_sum = 0.0;
    for (id, change, displacement, improved) in per_element {
        if change.is_changed() {
            report.changed += 1;
        }
        if let Some(d) = displacement {
            report.displaced += 1;
            displacement_sum += d;
        }
        if let Some(better) = improved {
            report.regions_compared += 1;
            if better {
                report.improved += 1;
            }
        }
        report.changes.insert(id, change);
    }
    report.change_hit_rate = ratio(report.changed, report.total);
    report.quality_improvement_rate = ratio(report.improved, report.total);
    report.avg_displacement = if report.displaced == 0 {
        0.0
    } else {
        displacement_sum / report.displaced as f64
    };

    let stable = untouched
        .iter()
        .filter(|r| !element_changed(r.element, initial, remediated, opts.displacement_tolerance))
        .count();
    report.stability = StabilityReport {
        checked: untouched.len(),
        stable,
        rate: ratio(stable, untouched.len()),
    };

    log::info!(
        "validation: {}/{} changed, {} improved, stability {}/{}",
        report.changed,
        report.total,
        report.improved,
        stable,
        untouched.len()
    );
    report
}
