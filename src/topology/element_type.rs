//! Element type metadata for surface mesh elements.

use crate::mesh_error::MeshTriageError;
use std::fmt;
use std::str::FromStr;

/// Supported surface element types.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ElementType {
    /// Three-node triangle.
    Tri,
    /// Four-node quadrilateral.
    Quad,
}

impl ElementType {
    /// Number of corner nodes for this type.
    #[inline]
    pub const fn node_count(self) -> usize {
        match self {
            ElementType::Tri => 3,
            ElementType::Quad => 4,
        }
    }

    /// Upper-case tag as used in element tables.
    pub const fn as_str(self) -> &'static str {
        match self {
            ElementType::Tri => "TRI",
            ElementType::Quad => "QUAD",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = MeshTriageError;

    /// Case-insensitive, whitespace-trimmed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRI" => Ok(ElementType::Tri),
            "QUAD" => Ok(ElementType::Quad),
            other => Err(MeshTriageError::UnsupportedElementType(other.to_string())),
        }
    }
}
