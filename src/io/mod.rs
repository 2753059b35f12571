//! Row-oriented table I/O.
//!
//! Meshes arrive as a node table and an element table, model scores as an
//! `element_id,score` table, and recommendations leave (and come back for
//! validation) as one row per element. Tables are comma separated, the
//! first row is a header, and cells are trimmed. Quoting is not supported.
//!
//! Malformed rows are skipped and counted; they never fail a load.

pub mod csv;
pub mod scores;

use crate::topology::ids::ElementId;
use crate::topology::mesh::Mesh;

pub use csv::{
    CsvMeshReader, load_mesh, read_recommendations, read_recommendations_file,
    write_recommendations, write_recommendations_file,
};
pub use scores::{read_score_table, read_score_table_file};

/// What a mesh load kept and what it threw away.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LoadReport {
    /// Data rows seen in the node table (header excluded).
    pub node_rows: usize,
    /// Data rows seen in the element table (header excluded).
    pub element_rows: usize,
    pub skipped_node_rows: usize,
    pub skipped_element_rows: usize,
    /// Rows that repeated an earlier id; the later row wins.
    pub duplicate_nodes: usize,
    pub duplicate_elements: usize,
    /// Elements dropped because they reference a node that does not exist.
    pub dropped_elements: Vec<ElementId>,
}

impl LoadReport {
    /// Rows that did not make it into the mesh for any reason.
    pub fn total_skipped(&self) -> usize {
        self.skipped_node_rows + self.skipped_element_rows + self.dropped_elements.len()
    }

    pub fn is_clean(&self) -> bool {
        self.total_skipped() == 0 && self.duplicate_nodes == 0 && self.duplicate_elements == 0
    }
}

/// A loaded mesh with its load report.
#[derive(Clone, Debug)]
pub struct LoadedMesh {
    pub mesh: Mesh,
    pub report: LoadReport,
}

/// Lines of a raw table with any `\r` line ending removed. A line that is
/// not valid UTF-8 comes back as `None` so the caller can skip and count it.
pub(crate) fn table_lines(bytes: &[u8]) -> impl Iterator<Item = Option<&str>> {
    bytes.split(|&b| b == b'\n').map(|line| {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        std::str::from_utf8(line).ok()
    })
}

/// Trimmed cells of one table line; `None` for blank lines.
pub(crate) fn split_row(line: &str) -> Option<Vec<&str>> {
    if line.trim().is_empty() {
        return None;
    }
    Some(line.split(',').map(str::trim).collect())
}
