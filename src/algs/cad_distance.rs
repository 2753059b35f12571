//! Node-to-reference distance search.
//!
//! For every node of the analyzed mesh, find the Euclidean distance to the
//! nearest node of the reference (CAD) mesh. This is the dominant cost of a
//! triage run (`O(N * M)` brute force), so the default strategy uses a
//! [`PointGrid`] over the reference points. Both strategies return identical
//! distances.
//!
//! Queries are processed in batches. Between batches a [`CancelToken`] is
//! checked; a cancelled search returns the batches finished so far with
//! [`NodeDistances::is_complete`] set to `false`. Nodes that were not reached
//! are absent, i.e. "no data", which is distinct from a zero distance.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::algs::point_grid::PointGrid;
use crate::geometry::vector::distance;
use crate::mesh_error::{MeshTriageError, TriageResult};
use crate::par::map_slice;
use crate::topology::ids::NodeId;
use crate::topology::mesh::{Mesh, Node};

/// Cooperative cancellation flag shared between a caller and a search.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Nearest-point search strategy.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Scan every reference node for every query.
    BruteForce,
    /// Bucket grid over the reference nodes; `None` picks a cell size from
    /// the reference bounding box.
    Grid { cell_size: Option<f64> },
}

impl Default for SearchStrategy {
    fn default() -> Self {
        SearchStrategy::Grid { cell_size: None }
    }
}

/// Options for [`compute_node_distances`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DistanceOpts {
    pub strategy: SearchStrategy,
    /// Queries per batch; cancellation is checked between batches.
    pub batch_size: usize,
}

impl Default for DistanceOpts {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::default(),
            batch_size: 1024,
        }
    }
}

impl DistanceOpts {
    pub fn validate(&self) -> TriageResult<()> {
        if self.batch_size == 0 {
            return Err(MeshTriageError::InvalidConfig("batch_size must be > 0".into()));
        }
        if let SearchStrategy::Grid {
            cell_size: Some(size),
        } = self.strategy
        {
            if !size.is_finite() || size <= 0.0 {
                return Err(MeshTriageError::InvalidConfig(format!(
                    "grid cell_size must be finite and > 0, got {size}"
                )));
            }
        }
        Ok(())
    }
}

/// Per-node distance to the reference geometry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeDistances {
    distances: BTreeMap<NodeId, f64>,
    complete: bool,
}

impl NodeDistances {
    /// Wrap precomputed distances.
    pub fn from_map(distances: BTreeMap<NodeId, f64>, complete: bool) -> Self {
        Self {
            distances,
            complete,
        }
    }

    /// Distance of `node`, or `None` when it was never measured.
    #[inline]
    pub fn get(&self, node: NodeId) -> Option<f64> {
        self.distances.get(&node).copied()
    }

    /// `false` when the search was cancelled before every node was visited.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.distances.iter().map(|(id, d)| (*id, *d))
    }
}

enum Index {
    Brute(Vec<[f64; 3]>),
    Grid(PointGrid),
}

impl Index {
    fn nearest_distance(&self, q: [f64; 3]) -> Option<f64> {
        match self {
            Index::Brute(points) => points
                .iter()
                .map(|p| distance(q, *p))
                .reduce(f64::min),
            Index::Grid(grid) => grid.nearest(q).map(|(_, d)| d),
        }
    }
}

/// Distance from every node of `mesh` to the nearest node of `reference`.
///
/// An empty reference yields no data for any node.
pub fn compute_node_distances(
    mesh: &Mesh,
    reference: &Mesh,
    opts: &DistanceOpts,
    cancel: Option<&CancelToken>,
) -> NodeDistances {
    let ref_points: Vec<[f64; 3]> = reference.nodes().map(Node::position).collect();
    let index = match opts.strategy {
        SearchStrategy::BruteForce => Index::Brute(ref_points),
        SearchStrategy::Grid { cell_size } => match PointGrid::new(ref_points, cell_size) {
            Some(grid) => Index::Grid(grid),
            None => Index::Brute(Vec::new()),
        },
    };
    if reference.node_count() == 0 {
        log::warn!("reference mesh has no nodes; no CAD distances measured");
    }

    let queries: Vec<(NodeId, [f64; 3])> = mesh.nodes().map(|n| (n.id(), n.position())).collect();
    let mut distances = BTreeMap::new();
    let mut complete = true;
    for batch in queries.chunks(opts.batch_size.max(1)) {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            complete = false;
            log::warn!(
                "distance search cancelled after {} of {} nodes",
                distances.len(),
                queries.len()
            );
            break;
        }
        let found = map_slice(batch, |&(id, p)| (id, index.nearest_distance(p)));
        distances.extend(found.into_iter().filter_map(|(id, d)| d.map(|d| (id, d))));
    }
    log::debug!("CAD distances measured for {} nodes", distances.len());
    NodeDistances {
        distances,
        complete,
    }
}
