#![allow(dead_code)]
use mesh_triage::{
    rules::error_tag::{ErrorTag, TagSet},
    topology::element_type::ElementType,
    topology::ids::{ElementId, NodeId},
    topology::mesh::{Element, Mesh, Node},
};

pub fn nid(u: u64) -> NodeId {
    NodeId::new(u)
}

pub fn eid(u: u64) -> ElementId {
    ElementId::new(u)
}

pub fn node(id: u64, p: [f64; 3]) -> Node {
    Node::new(nid(id), p)
}

pub fn tri(id: u64, n: [u64; 3]) -> Element {
    Element::try_new(eid(id), ElementType::Tri, n.map(nid).to_vec()).unwrap()
}

pub fn quad(id: u64, n: [u64; 4]) -> Element {
    Element::try_new(eid(id), ElementType::Quad, n.map(nid).to_vec()).unwrap()
}

/// Strict mesh from node positions (ids 1..) and elements.
pub fn mesh_from(points: &[[f64; 3]], elements: Vec<Element>) -> Mesh {
    let nodes = points
        .iter()
        .enumerate()
        .map(|(i, p)| node(i as u64 + 1, *p));
    Mesh::try_from_parts(nodes, elements).unwrap()
}

/// `nx * ny` unit-spaced QUAD grid in the z = 0 plane, scaled by `h`.
/// Node `(i, j)` has id `j * (nx + 1) + i + 1`; quad `(i, j)` has id
/// `j * nx + i + 1`.
pub fn quad_grid(nx: u64, ny: u64, h: f64) -> Mesh {
    quad_grid_with(nx, ny, h, |_, _| [0.0; 3])
}

/// Like [`quad_grid`], with `offset(i, j)` added to each node position.
pub fn quad_grid_with(nx: u64, ny: u64, h: f64, offset: impl Fn(u64, u64) -> [f64; 3]) -> Mesh {
    let node_id = |i: u64, j: u64| j * (nx + 1) + i + 1;
    let mut nodes = Vec::new();
    for j in 0..=ny {
        for i in 0..=nx {
            let o = offset(i, j);
            nodes.push(node(node_id(i, j), [i as f64 * h + o[0], j as f64 * h + o[1], o[2]]));
        }
    }
    let mut elements = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            elements.push(quad(
                j * nx + i + 1,
                [node_id(i, j), node_id(i + 1, j), node_id(i + 1, j + 1), node_id(i, j + 1)],
            ));
        }
    }
    Mesh::try_from_parts(nodes, elements).unwrap()
}

pub fn tags(list: &[ErrorTag]) -> TagSet {
    list.iter().copied().collect()
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
