//! Intrinsic element quality metrics.
//!
//! # Metrics
//! - **Edge lengths**: 3-D Euclidean distance between consecutive corners,
//!   including the wrap-around edge (last -> first), in element order.
//! - **Aspect ratio**: `max_edge / min_edge`. A zero-length minimum edge
//!   makes the ratio undefined; it is reported as
//!   [`AspectRatio::Degenerate`] instead of an infinity so averages and
//!   comparisons downstream never see a non-finite value.
//! - **Area**: TRI uses half the cross-product magnitude of the two edge
//!   vectors leaving `v0`. QUAD is split from `v0` into `(v0, v1, v2)` and
//!   `(v0, v2, v3)` and the two areas are summed.
//! - **Skewness proxy**: currently identical to the aspect ratio. It is a
//!   placeholder heuristic, not an angle-based skew measure.
//!
//! # Limitations
//! The QUAD split is exact only for planar, convex quads. Warped or concave
//! quads get the area of the two-triangle fan from `v0`, which depends on the
//! choice of diagonal. This is flagged here rather than corrected.

use std::collections::BTreeMap;

use crate::geometry::vector::{distance, triangle_area};
use crate::mesh_error::{MeshTriageError, TriageResult};
use crate::par::map_keys;
use crate::topology::element_type::ElementType;
use crate::topology::ids::ElementId;
use crate::topology::mesh::{Element, Mesh};

/// Aspect ratio with an explicit sentinel for zero-length minimum edges.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum AspectRatio {
    /// `max_edge / min_edge` with `min_edge > 0`; always `>= 1`.
    Finite(f64),
    /// Minimum edge length is zero (collapsed edge).
    Degenerate,
}

impl AspectRatio {
    /// Ratio of the extreme edge lengths. Anything but a strictly positive
    /// minimum edge is degenerate.
    pub fn from_edges(min_edge: f64, max_edge: f64) -> Self {
        if min_edge > 0.0 && max_edge.is_finite() {
            AspectRatio::Finite(max_edge / min_edge)
        } else {
            AspectRatio::Degenerate
        }
    }

    /// `true` when the ratio is above `threshold`. Degenerate elements
    /// exceed every threshold.
    #[inline]
    pub fn exceeds(self, threshold: f64) -> bool {
        match self {
            AspectRatio::Finite(v) => v > threshold,
            AspectRatio::Degenerate => true,
        }
    }

    #[inline]
    pub fn finite(self) -> Option<f64> {
        match self {
            AspectRatio::Finite(v) => Some(v),
            AspectRatio::Degenerate => None,
        }
    }

    #[inline]
    pub fn is_degenerate(self) -> bool {
        matches!(self, AspectRatio::Degenerate)
    }
}

/// Intrinsic metrics of one element.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ElementQuality {
    /// Element area (`>= 0`).
    pub area: f64,
    /// Edge lengths in element order, wrap-around edge last.
    pub edge_lengths: Vec<f64>,
    pub min_edge: f64,
    pub max_edge: f64,
    pub aspect_ratio: AspectRatio,
    /// Placeholder: equal to `aspect_ratio`.
    pub skewness_proxy: AspectRatio,
}

/// Quality metrics keyed by element id.
pub type QualityMap = BTreeMap<ElementId, ElementQuality>;

/// Compute metrics from an element and its corner coordinates.
pub fn element_quality(element: &Element, positions: &[[f64; 3]]) -> TriageResult<ElementQuality> {
    let area = match (element.element_type(), positions) {
        (ElementType::Tri, &[a, b, c]) => triangle_area(a, b, c),
        (ElementType::Quad, &[a, b, c, d]) => triangle_area(a, b, c) + triangle_area(a, c, d),
        (element_type, _) => {
            return Err(MeshTriageError::NodeCountMismatch {
                element: element.id(),
                element_type,
                expected: element_type.node_count(),
                found: positions.len(),
            });
        }
    };

    let n = positions.len();
    let edge_lengths: Vec<f64> = (0..n)
        .map(|i| distance(positions[i], positions[(i + 1) % n]))
        .collect();
    let min_edge = edge_lengths.iter().copied().fold(f64::INFINITY, f64::min);
    let max_edge = edge_lengths.iter().copied().fold(0.0, f64::max);
    let aspect_ratio = AspectRatio::from_edges(min_edge, max_edge);

    Ok(ElementQuality {
        area,
        edge_lengths,
        min_edge,
        max_edge,
        aspect_ratio,
        skewness_proxy: aspect_ratio,
    })
}

/// Compute metrics for every element of `mesh`.
///
/// Elements whose nodes cannot be resolved are skipped; a mesh built through
/// [`Mesh::try_from_parts`] or the loaders never has any.
pub fn analyze_quality(mesh: &Mesh) -> QualityMap {
    let ids = mesh.element_ids();
    let metrics = map_keys(&ids, |id| {
        let element = mesh.element(id)?;
        let Some(positions) = mesh.element_positions(element) else {
            log::warn!("element {id}: unresolved node, skipping quality");
            return None;
        };
        match element_quality(element, &positions) {
            Ok(q) => Some(q),
            Err(err) => {
                log::warn!("element {id}: {err}");
                None
            }
        }
    });
    log::debug!("quality metrics computed for {} elements", metrics.len());
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::ids::NodeId;

    fn element(kind: ElementType) -> Element {
        let nodes = (1..=kind.node_count() as u64).map(NodeId::new).collect();
        Element::try_new(ElementId::new(1), kind, nodes).unwrap()
    }

    #[test]
    fn unit_square_quad() {
        let q = element_quality(
            &element(ElementType::Quad),
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        )
        .unwrap();
        assert_eq!(q.area, 1.0);
        assert_eq!(q.edge_lengths, vec![1.0, 1.0, 1.0, 1.0]);
        assert_eq!(q.aspect_ratio, AspectRatio::Finite(1.0));
        assert_eq!(q.skewness_proxy, q.aspect_ratio);
    }

    #[test]
    fn right_triangle_3_4_5() {
        let q = element_quality(
            &element(ElementType::Tri),
            &[[0.0, 0.0, 0.0], [3.0, 0.0, 0.0], [3.0, 4.0, 0.0]],
        )
        .unwrap();
        assert_eq!(q.area, 6.0);
        assert_eq!(q.edge_lengths, vec![3.0, 4.0, 5.0]);
        assert_eq!(q.aspect_ratio, AspectRatio::Finite(5.0 / 3.0));
    }

    #[test]
    fn collapsed_edge_is_degenerate() {
        let q = element_quality(
            &element(ElementType::Tri),
            &[[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
        )
        .unwrap();
        assert!(q.aspect_ratio.is_degenerate());
        assert!(q.aspect_ratio.exceeds(f64::MAX));
        assert_eq!(q.aspect_ratio.finite(), None);
        assert_eq!(q.area, 0.0);
    }

    #[test]
    fn wrong_position_count_is_an_error() {
        let err = element_quality(&element(ElementType::Tri), &[[0.0; 3], [1.0, 0.0, 0.0]]);
        assert!(matches!(err, Err(MeshTriageError::NodeCountMismatch { .. })));
    }
}
