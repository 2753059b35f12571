//! Mesh store: nodes, elements and the derived element adjacency.
//!
//! A [`Mesh`] is immutable once built. The only state that may be attached
//! afterwards is the derived [`Adjacency`], which is a pure function of the
//! element definitions and can be rebuilt at any time.
//!
//! Storage uses `BTreeMap`s so every iteration order (and therefore every
//! report produced downstream) is deterministic and sorted by id.

use std::collections::{BTreeMap, BTreeSet};

use crate::geometry::vector::centroid;
use crate::mesh_error::{MeshTriageError, TriageResult};
use crate::topology::adjacency::{Adjacency, AdjacencyPolicy, build_adjacency};
use crate::topology::element_type::ElementType;
use crate::topology::ids::{ElementId, NodeId};

/// A 3-D point with an integer identifier.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    id: NodeId,
    position: [f64; 3],
}

impl Node {
    pub fn new(id: NodeId, position: [f64; 3]) -> Self {
        Self { id, position }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn position(&self) -> [f64; 3] {
        self.position
    }
}

/// A TRI or QUAD element referencing an ordered list of node ids.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Element {
    id: ElementId,
    element_type: ElementType,
    nodes: Vec<NodeId>,
}

impl Element {
    /// Build an element, checking the node count against the type.
    pub fn try_new(
        id: ElementId,
        element_type: ElementType,
        nodes: Vec<NodeId>,
    ) -> TriageResult<Self> {
        let expected = element_type.node_count();
        if nodes.len() != expected {
            return Err(MeshTriageError::NodeCountMismatch {
                element: id,
                element_type,
                expected,
                found: nodes.len(),
            });
        }
        Ok(Self {
            id,
            element_type,
            nodes,
        })
    }

    #[inline]
    pub fn id(&self) -> ElementId {
        self.id
    }

    #[inline]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Corner node ids in element order.
    #[inline]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Corner node ids as a set (orientation and start vertex ignored).
    pub fn node_set(&self) -> BTreeSet<NodeId> {
        self.nodes.iter().copied().collect()
    }
}

/// Nodes, elements and an optional derived adjacency map.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    nodes: BTreeMap<NodeId, Node>,
    elements: BTreeMap<ElementId, Element>,
    adjacency: Option<Adjacency>,
}

impl Mesh {
    /// An empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> MeshBuilder {
        MeshBuilder::default()
    }

    /// Strict construction: duplicate ids and dangling node references are
    /// errors.
    pub fn try_from_parts(
        nodes: impl IntoIterator<Item = Node>,
        elements: impl IntoIterator<Item = Element>,
    ) -> TriageResult<Self> {
        let mut builder = MeshBuilder::default();
        for node in nodes {
            let id = node.id();
            if builder.insert_node(node).is_some() {
                return Err(MeshTriageError::DuplicateNode(id));
            }
        }
        for element in elements {
            let id = element.id();
            if builder.insert_element(element).is_some() {
                return Err(MeshTriageError::DuplicateElement(id));
            }
        }
        builder.build()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    #[inline]
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn contains_element(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    /// Elements in ascending id order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.elements.values()
    }

    pub fn element_ids(&self) -> Vec<ElementId> {
        self.elements.keys().copied().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// `true` when the mesh has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Corner coordinates of `element`, or `None` if a node is missing from
    /// this mesh.
    pub fn element_positions(&self, element: &Element) -> Option<Vec<[f64; 3]>> {
        element
            .nodes()
            .iter()
            .map(|nid| self.nodes.get(nid).map(Node::position))
            .collect()
    }

    /// Arithmetic mean of an element's corner coordinates.
    pub fn element_centroid(&self, id: ElementId) -> Option<[f64; 3]> {
        let element = self.elements.get(&id)?;
        let positions = self.element_positions(element)?;
        centroid(&positions)
    }

    /// Nodes referenced by no element, in ascending order.
    pub fn orphan_nodes(&self) -> Vec<NodeId> {
        let used: BTreeSet<NodeId> = self
            .elements
            .values()
            .flat_map(|e| e.nodes().iter().copied())
            .collect();
        self.nodes
            .keys()
            .copied()
            .filter(|nid| !used.contains(nid))
            .collect()
    }

    /// Derived adjacency, if one has been attached.
    pub fn adjacency(&self) -> Option<&Adjacency> {
        self.adjacency.as_ref()
    }

    /// Attach a derived adjacency map. Nodes and elements are untouched.
    pub fn attach_adjacency(&mut self, adjacency: Adjacency) {
        self.adjacency = Some(adjacency);
    }

    /// Build (or rebuild) adjacency under `policy` and attach it.
    pub fn build_adjacency(&mut self, policy: AdjacencyPolicy) -> &Adjacency {
        let adjacency = build_adjacency(self, policy);
        self.adjacency.insert(adjacency)
    }
}

/// Incremental mesh construction.
///
/// Later inserts with an existing id replace the earlier entry (the
/// replaced value is returned), which matches how row tables are usually
/// consumed. Node references are only checked in [`MeshBuilder::build`] /
/// [`MeshBuilder::build_lenient`].
#[derive(Clone, Debug, Default)]
pub struct MeshBuilder {
    nodes: BTreeMap<NodeId, Node>,
    elements: BTreeMap<ElementId, Element>,
}

impl MeshBuilder {
    pub fn insert_node(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.id(), node)
    }

    pub fn insert_element(&mut self, element: Element) -> Option<Element> {
        self.elements.insert(element.id(), element)
    }

    fn first_dangling(&self, element: &Element) -> Option<NodeId> {
        element
            .nodes()
            .iter()
            .copied()
            .find(|nid| !self.nodes.contains_key(nid))
    }

    /// Fails on the first element that references a missing node.
    pub fn build(self) -> TriageResult<Mesh> {
        for element in self.elements.values() {
            if let Some(node) = self.first_dangling(element) {
                return Err(MeshTriageError::UnknownNode {
                    element: element.id(),
                    node,
                });
            }
        }
        Ok(Mesh {
            nodes: self.nodes,
            elements: self.elements,
            adjacency: None,
        })
    }

    /// Drops elements with dangling node references and returns their ids.
    pub fn build_lenient(self) -> (Mesh, Vec<ElementId>) {
        let mut dropped = Vec::new();
        let mut kept = BTreeMap::new();
        for (id, element) in &self.elements {
            match self.first_dangling(element) {
                Some(node) => {
                    log::warn!("dropping element {id}: unknown node {node}");
                    dropped.push(*id);
                }
                None => {
                    kept.insert(*id, element.clone());
                }
            }
        }
        let mesh = Mesh {
            nodes: self.nodes,
            elements: kept,
            adjacency: None,
        };
        (mesh, dropped)
    }
}
