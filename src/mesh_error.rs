//! MeshTriageError: unified error type for mesh-triage public APIs.
//!
//! Row-level problems in source tables are *not* errors; loaders count and
//! skip them (see [`crate::io::LoadReport`]). This enum covers everything a
//! caller must handle explicitly.

use crate::topology::element_type::ElementType;
use crate::topology::ids::{ElementId, NodeId};
use thiserror::Error;

/// Crate-wide result alias.
pub type TriageResult<T> = Result<T, MeshTriageError>;

/// Unified error type for mesh-triage operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshTriageError {
    /// An element references a node id that does not exist in the same mesh.
    #[error("element {element} references unknown node {node}")]
    UnknownNode { element: ElementId, node: NodeId },
    /// A node id was inserted twice during strict construction.
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),
    /// An element id was inserted twice during strict construction.
    #[error("duplicate element id {0}")]
    DuplicateElement(ElementId),
    /// The number of node ids does not match the element type.
    #[error("element {element}: {element_type} expects {expected} nodes, found {found}")]
    NodeCountMismatch {
        element: ElementId,
        element_type: ElementType,
        expected: usize,
        found: usize,
    },
    /// Element type tag is not TRI or QUAD.
    #[error("unsupported element type: {0}")]
    UnsupportedElementType(String),
    /// An identifier could not be coerced to a non-negative integer.
    #[error("invalid id: {0:?}")]
    InvalidId(String),
    /// A table could not be parsed at all (e.g. missing header).
    #[error("mesh I/O parse error: {0}")]
    MeshIoParse(String),
    /// Underlying I/O failure, kept as a message so the enum stays `Clone`.
    #[error("I/O error: {0}")]
    Io(String),
    /// An external model artifact (score table) is missing.
    #[error("model artifact not found: {0}")]
    ModelArtifactMissing(String),
    /// Model scores were requested before the scorer produced any output.
    #[error("model scorer has not been initialized")]
    ModelNotInitialized,
    /// A configuration value is out of its valid domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<std::io::Error> for MeshTriageError {
    fn from(err: std::io::Error) -> Self {
        MeshTriageError::Io(err.to_string())
    }
}
