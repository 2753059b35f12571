//! Element-to-element adjacency.
//!
//! Two notions are supported:
//! - [`AdjacencyPolicy::SharedEdge`] (default): elements are neighbors when
//!   they share a boundary edge. This is the canonical notion used by the
//!   transition and connectivity rules.
//! - [`AdjacencyPolicy::SharedNode`]: elements are neighbors when they share
//!   any corner node. Looser; useful for proximity queries.
//!
//! Edges are canonicalized as sorted node-id pairs, including the wrap-around
//! edge (last -> first). The resulting map is **symmetric** and
//! **self-free**, and every element of the mesh has an entry (possibly
//! empty). Building is linear in the total number of edges.

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::HashMap;

use crate::topology::ids::{ElementId, NodeId};
use crate::topology::mesh::{Element, Mesh};

/// Which shared entity makes two elements neighbors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjacencyPolicy {
    /// Share a boundary edge.
    #[default]
    SharedEdge,
    /// Share at least one node.
    SharedNode,
}

/// Symmetric element adjacency, keyed and ordered by element id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Adjacency {
    policy: AdjacencyPolicy,
    neighbors: BTreeMap<ElementId, BTreeSet<ElementId>>,
}

impl Adjacency {
    pub fn policy(&self) -> AdjacencyPolicy {
        self.policy
    }

    /// Neighbor set of `id`; `None` if `id` was not part of the mesh.
    pub fn neighbors(&self, id: ElementId) -> Option<&BTreeSet<ElementId>> {
        self.neighbors.get(&id)
    }

    /// Number of neighbors; unknown elements count as zero.
    pub fn neighbor_count(&self, id: ElementId) -> usize {
        self.neighbors.get(&id).map_or(0, BTreeSet::len)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &BTreeSet<ElementId>)> + '_ {
        self.neighbors.iter().map(|(id, set)| (*id, set))
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Check the structural invariants: symmetry and no self-membership.
    pub fn is_consistent(&self) -> bool {
        self.neighbors.iter().all(|(a, set)| {
            !set.contains(a)
                && set
                    .iter()
                    .all(|b| self.neighbors.get(b).is_some_and(|back| back.contains(a)))
        })
    }
}

/// Canonical (sorted) form of an undirected edge.
#[inline]
pub fn canonical_edge(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Boundary edges of an element, wrap-around included, deduplicated.
pub fn element_edges(element: &Element) -> Vec<(NodeId, NodeId)> {
    let nodes = element.nodes();
    let n = nodes.len();
    let mut edges: Vec<_> = (0..n)
        .map(|i| canonical_edge(nodes[i], nodes[(i + 1) % n]))
        .collect();
    edges.sort_unstable();
    edges.dedup();
    edges
}

/// Build the adjacency map of `mesh` under `policy`.
pub fn build_adjacency(mesh: &Mesh, policy: AdjacencyPolicy) -> Adjacency {
    let adjacency = match policy {
        AdjacencyPolicy::SharedEdge => shared_key_adjacency(mesh, policy, element_edges),
        AdjacencyPolicy::SharedNode => shared_key_adjacency(mesh, policy, |e: &Element| {
            let mut nodes = e.nodes().to_vec();
            nodes.sort_unstable();
            nodes.dedup();
            nodes
        }),
    };
    log::debug!(
        "adjacency built: policy={:?} elements={}",
        policy,
        adjacency.len()
    );
    adjacency
}

/// Group elements by every key they expose, then connect all elements that
/// share a key.
fn shared_key_adjacency<K, F>(mesh: &Mesh, policy: AdjacencyPolicy, keys_of: F) -> Adjacency
where
    K: std::hash::Hash + Eq,
    F: Fn(&Element) -> Vec<K>,
{
    let mut owners: HashMap<K, Vec<ElementId>> = HashMap::new();
    for element in mesh.elements() {
        for key in keys_of(element) {
            owners.entry(key).or_default().push(element.id());
        }
    }

    let mut neighbors: BTreeMap<ElementId, BTreeSet<ElementId>> = mesh
        .elements()
        .map(|e| (e.id(), BTreeSet::new()))
        .collect();

    for elems in owners.values().filter(|elems| elems.len() > 1) {
        for &a in elems {
            let set = neighbors.entry(a).or_default();
            set.extend(elems.iter().copied().filter(|&b| b != a));
        }
    }

    Adjacency { policy, neighbors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::element_type::ElementType;
    use crate::topology::mesh::Node;

    fn strip_mesh() -> Mesh {
        // 1 - 2 - 3
        // | / | / |
        // 4 - 5 - 6
        let pts = [
            (1, [0.0, 1.0, 0.0]),
            (2, [1.0, 1.0, 0.0]),
            (3, [2.0, 1.0, 0.0]),
            (4, [0.0, 0.0, 0.0]),
            (5, [1.0, 0.0, 0.0]),
            (6, [2.0, 0.0, 0.0]),
        ];
        let tris = [(10, [1, 4, 2]), (11, [2, 4, 5]), (12, [2, 5, 3]), (13, [3, 5, 6])];
        Mesh::try_from_parts(
            pts.iter().map(|&(id, p)| Node::new(NodeId::new(id), p)),
            tris.iter().map(|&(id, ns)| {
                Element::try_new(
                    ElementId::new(id),
                    ElementType::Tri,
                    ns.iter().map(|&n| NodeId::new(n)).collect(),
                )
                .unwrap()
            }),
        )
        .unwrap()
    }

    fn ids(v: &[u64]) -> BTreeSet<ElementId> {
        v.iter().map(|&i| ElementId::new(i)).collect()
    }

    #[test]
    fn shared_edge_strip() {
        let adj = build_adjacency(&strip_mesh(), AdjacencyPolicy::SharedEdge);
        assert_eq!(adj.neighbors(ElementId::new(10)), Some(&ids(&[11])));
        assert_eq!(adj.neighbors(ElementId::new(11)), Some(&ids(&[10, 12])));
        assert_eq!(adj.neighbors(ElementId::new(12)), Some(&ids(&[11, 13])));
        assert_eq!(adj.neighbors(ElementId::new(13)), Some(&ids(&[12])));
        assert!(adj.is_consistent());
    }

    #[test]
    fn shared_node_is_looser() {
        let adj = build_adjacency(&strip_mesh(), AdjacencyPolicy::SharedNode);
        // 10 and 12 share node 2 but no edge.
        assert!(adj.neighbors(ElementId::new(10)).unwrap().contains(&ElementId::new(12)));
        assert!(adj.is_consistent());
    }

    #[test]
    fn canonical_edges_wrap_around() {
        let e = Element::try_new(
            ElementId::new(1),
            ElementType::Quad,
            [4, 3, 2, 1].map(NodeId::new).to_vec(),
        )
        .unwrap();
        let edges = element_edges(&e);
        assert_eq!(edges.len(), 4);
        assert!(edges.contains(&(NodeId::new(1), NodeId::new(4))));
    }
}
