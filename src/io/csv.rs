//! Node, element and recommendation tables.
//!
//! # Node table
//! `id,x,y,z` with extra columns ignored. Ids may be decimal formatted
//! (`19640.0`). Rows with fewer than four cells, an invalid id or a
//! non-finite coordinate are skipped.
//!
//! # Element table
//! `id,type,n1,n2,n3[,n4,...]`. `type` is `TRI` or `QUAD`, case-insensitive.
//! Empty node cells are ignored and surplus node ids are truncated to the
//! type's node count. Rows with fewer than five cells, an unknown type,
//! too few node ids or an invalid id are skipped. Elements referencing a
//! node that is not in the node table are dropped after loading.
//!
//! # Recommendation table
//! `element_id,category,action,scope,confidence,tags,reason`. Tags are
//! `|`-separated; the reason is the last column and may contain commas.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use itertools::Itertools;

use crate::io::{LoadReport, LoadedMesh, split_row, table_lines};
use crate::mesh_error::{MeshTriageError, TriageResult};
use crate::remediation::Recommendation;
use crate::rules::error_tag::{ErrorTag, TagSet};
use crate::topology::element_type::ElementType;
use crate::topology::ids::{ElementId, NodeId};
use crate::topology::mesh::{Element, Mesh, MeshBuilder, Node};

/// Header written by [`write_recommendations`].
pub const RECOMMENDATION_HEADER: &str = "element_id,category,action,scope,confidence,tags,reason";

const TAG_SEPARATOR: &str = "|";

/// Lenient reader for the two mesh tables.
#[derive(Clone, Copy, Debug)]
pub struct CsvMeshReader {
    /// Skip the first line of each table.
    pub has_header: bool,
}

impl Default for CsvMeshReader {
    fn default() -> Self {
        Self { has_header: true }
    }
}

impl CsvMeshReader {
    fn data_lines(self, bytes: &[u8]) -> impl Iterator<Item = Option<&str>> {
        table_lines(bytes).skip(usize::from(self.has_header))
    }

    fn parse_node(cells: &[&str]) -> TriageResult<Node> {
        let [id, x, y, z, ..] = cells else {
            return Err(MeshTriageError::MeshIoParse(format!(
                "node row needs 4 cells, found {}",
                cells.len()
            )));
        };
        let position = [
            Self::parse_coord(x)?,
            Self::parse_coord(y)?,
            Self::parse_coord(z)?,
        ];
        Ok(Node::new(id.parse::<NodeId>()?, position))
    }

    fn parse_coord(raw: &str) -> TriageResult<f64> {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| MeshTriageError::MeshIoParse(format!("invalid coordinate: {raw}")))
    }

    fn parse_element(cells: &[&str]) -> TriageResult<Element> {
        if cells.len() < 5 {
            return Err(MeshTriageError::MeshIoParse(format!(
                "element row needs at least 5 cells, found {}",
                cells.len()
            )));
        }
        let id = cells[0].parse::<ElementId>()?;
        let element_type = cells[1].parse::<ElementType>()?;
        let nodes = cells[2..]
            .iter()
            .filter(|c| !c.is_empty())
            .take(element_type.node_count())
            .map(|c| c.parse::<NodeId>())
            .collect::<TriageResult<Vec<_>>>()?;
        Element::try_new(id, element_type, nodes)
    }

    /// Parse node rows into `builder`.
    pub fn read_nodes<R: Read>(
        &self,
        mut reader: R,
        builder: &mut MeshBuilder,
        report: &mut LoadReport,
    ) -> TriageResult<()> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        for (line_no, line) in self.data_lines(&bytes).enumerate() {
            let Some(line) = line else {
                log::debug!("node row {}: not valid UTF-8", line_no + 1);
                report.node_rows += 1;
                report.skipped_node_rows += 1;
                continue;
            };
            let Some(cells) = split_row(line) else {
                continue;
            };
            report.node_rows += 1;
            match Self::parse_node(&cells) {
                Ok(node) => {
                    if let Some(prev) = builder.insert_node(node) {
                        log::warn!("duplicate node {}; keeping the later row", prev.id());
                        report.duplicate_nodes += 1;
                    }
                }
                Err(err) => {
                    log::debug!("node row {}: {err}", line_no + 1);
                    report.skipped_node_rows += 1;
                }
            }
        }
        Ok(())
    }

    /// Parse element rows into `builder`.
    pub fn read_elements<R: Read>(
        &self,
        mut reader: R,
        builder: &mut MeshBuilder,
        report: &mut LoadReport,
    ) -> TriageResult<()> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        for (line_no, line) in self.data_lines(&bytes).enumerate() {
            let Some(line) = line else {
                log::debug!("element row {}: not valid UTF-8", line_no + 1);
                report.element_rows += 1;
                report.skipped_element_rows += 1;
                continue;
            };
            let Some(cells) = split_row(line) else {
                continue;
            };
            report.element_rows += 1;
            match Self::parse_element(&cells) {
                Ok(element) => {
                    if let Some(prev) = builder.insert_element(element) {
                        log::warn!("duplicate element {}; keeping the later row", prev.id());
                        report.duplicate_elements += 1;
                    }
                }
                Err(err) => {
                    log::debug!("element row {}: {err}", line_no + 1);
                    report.skipped_element_rows += 1;
                }
            }
        }
        Ok(())
    }

    /// Read both tables and build the mesh leniently.
    pub fn read<N: Read, E: Read>(&self, nodes: N, elements: E) -> TriageResult<LoadedMesh> {
        let mut builder = Mesh::builder();
        let mut report = LoadReport::default();
        self.read_nodes(nodes, &mut builder, &mut report)?;
        self.read_elements(elements, &mut builder, &mut report)?;
        let (mesh, dropped) = builder.build_lenient();
        report.dropped_elements = dropped;
        log::info!(
            "loaded mesh: {} nodes, {} elements ({} rows skipped)",
            mesh.node_count(),
            mesh.element_count(),
            report.total_skipped()
        );
        Ok(LoadedMesh { mesh, report })
    }

    /// Open and read a node table and an element table.
    pub fn load(
        &self,
        nodes_path: impl AsRef<Path>,
        elements_path: impl AsRef<Path>,
    ) -> TriageResult<LoadedMesh> {
        let nodes = File::open(nodes_path.as_ref())?;
        let elements = File::open(elements_path.as_ref())?;
        self.read(nodes, elements)
    }
}

/// Load a mesh from a node table and an element table with headers.
pub fn load_mesh(
    nodes_path: impl AsRef<Path>,
    elements_path: impl AsRef<Path>,
) -> TriageResult<LoadedMesh> {
    CsvMeshReader::default().load(nodes_path, elements_path)
}

/// Write one row per recommendation, header first.
pub fn write_recommendations<W: Write>(
    mut writer: W,
    recommendations: &[Recommendation],
) -> TriageResult<()> {
    writeln!(writer, "{RECOMMENDATION_HEADER}")?;
    for rec in recommendations {
        writeln!(
            writer,
            "{},{},{},{},{},{},{}",
            rec.element,
            rec.category,
            rec.action,
            rec.scope,
            rec.confidence,
            rec.tags.iter().map(|t| t.as_str()).join(TAG_SEPARATOR),
            rec.reason
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write recommendations to a file at `path`.
pub fn write_recommendations_file(
    path: impl AsRef<Path>,
    recommendations: &[Recommendation],
) -> TriageResult<()> {
    let file = File::create(path.as_ref())?;
    write_recommendations(std::io::BufWriter::new(file), recommendations)
}

fn parse_tags(raw: &str) -> TriageResult<TagSet> {
    raw.split(TAG_SEPARATOR)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::parse::<ErrorTag>)
        .collect::<TriageResult<BTreeSet<_>>>()
}

fn parse_recommendation(cells: &[&str]) -> TriageResult<Recommendation> {
    let [element, category, action, scope, confidence, tags, reason @ ..] = cells else {
        return Err(MeshTriageError::MeshIoParse(format!(
            "recommendation row needs 7 cells, found {}",
            cells.len()
        )));
    };
    if reason.is_empty() {
        return Err(MeshTriageError::MeshIoParse("missing reason".into()));
    }
    let confidence = confidence
        .parse::<f64>()
        .ok()
        .filter(|c| (0.0..=1.0).contains(c))
        .ok_or_else(|| MeshTriageError::MeshIoParse(format!("invalid confidence: {confidence}")))?;
    Ok(Recommendation {
        element: element.parse()?,
        category: category.parse()?,
        action: action.parse()?,
        scope: scope.parse()?,
        reason: reason.join(","),
        confidence,
        tags: parse_tags(tags)?,
    })
}

/// Read a recommendation table. Returns the parsed rows and the number of
/// skipped rows.
pub fn read_recommendations<R: Read>(mut reader: R) -> TriageResult<(Vec<Recommendation>, usize)> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let mut rows = Vec::new();
    let mut skipped = 0;
    for line in table_lines(&bytes).skip(1) {
        let Some(line) = line else {
            log::debug!("recommendation row skipped: not valid UTF-8");
            skipped += 1;
            continue;
        };
        let Some(cells) = split_row(line) else {
            continue;
        };
        match parse_recommendation(&cells) {
            Ok(rec) => rows.push(rec),
            Err(err) => {
                log::debug!("recommendation row skipped: {err}");
                skipped += 1;
            }
        }
    }
    Ok((rows, skipped))
}

/// Read a recommendation table from a file at `path`.
pub fn read_recommendations_file(path: impl AsRef<Path>) -> TriageResult<(Vec<Recommendation>, usize)> {
    read_recommendations(File::open(path.as_ref())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remediation::{Action, map_action};
    use crate::risk::scorer::RiskCategory;

    const NODES: &str = "\
id,x,y,z
1.0,0,0,0
2,1,0,0
3,1,1,0
4,0,1,0
bad,0,0,0
5,nan,0,0
6,1,2
";

    const ELEMENTS: &str = "\
id,type,n1,n2,n3,n4
10, quad ,1,2,3,4
11,TRI,1,2,3,
12,TRI,1,2,3,4
13,HEX,1,2,3,4
14,QUAD,1,2,3,
15,TRI,1,2,99
";

    #[test]
    fn lenient_load_counts_skips() {
        let loaded = CsvMeshReader::default()
            .read(NODES.as_bytes(), ELEMENTS.as_bytes())
            .unwrap();
        let r = &loaded.report;
        assert_eq!(r.node_rows, 7);
        assert_eq!(r.skipped_node_rows, 3);
        assert_eq!(r.element_rows, 6);
        // HEX and the short QUAD
        assert_eq!(r.skipped_element_rows, 2);
        assert_eq!(r.dropped_elements, vec![ElementId::new(15)]);
        assert_eq!(loaded.mesh.node_count(), 4);
        let ids: Vec<u64> = loaded.mesh.element_ids().iter().map(|e| e.get()).collect();
        assert_eq!(ids, vec![10, 11, 12]);
        // surplus node id truncated
        let e12 = loaded.mesh.element(ElementId::new(12)).unwrap();
        assert_eq!(e12.nodes().len(), 3);
    }

    #[test]
    fn duplicate_rows_keep_the_later_one() {
        let nodes = "id,x,y,z\n1,0,0,0\n1,5,0,0\n";
        let loaded = CsvMeshReader::default()
            .read(nodes.as_bytes(), "id,type\n".as_bytes())
            .unwrap();
        assert_eq!(loaded.report.duplicate_nodes, 1);
        assert_eq!(
            loaded.mesh.node(NodeId::new(1)).unwrap().position(),
            [5.0, 0.0, 0.0]
        );
    }

    #[test]
    fn recommendations_survive_a_write_read_cycle() {
        let tags: TagSet = [ErrorTag::SmallArea, ErrorTag::BadTransition].into();
        let recs = vec![
            map_action(ElementId::new(3), &tags, RiskCategory::Medium, 0.123),
            map_action(ElementId::new(4), &TagSet::new(), RiskCategory::Low, 0.0),
        ];
        let mut buf = Vec::new();
        write_recommendations(&mut buf, &recs).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with(RECOMMENDATION_HEADER));
        assert!(text.contains("SMALL_AREA|BAD_TRANSITION"));

        let (back, skipped) = read_recommendations(buf.as_slice()).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(back, recs);
        assert_eq!(back[0].action, Action::SmoothMesh);
    }

    #[test]
    fn non_utf8_rows_are_skipped_not_fatal() {
        let nodes: &[u8] = b"id,x,y,z\n1,0,0,0\n2,1,0,0\n3,0,1,0\n4,\xff\xfe,0,0\n";
        let elements: &[u8] = b"id,type,n1,n2,n3\r\n10,TRI,1,2,3\r\n11,TRI,\xff,2,3\r\n";
        let loaded = CsvMeshReader::default().read(nodes, elements).unwrap();
        let r = &loaded.report;
        assert_eq!((r.node_rows, r.skipped_node_rows), (4, 1));
        assert_eq!((r.element_rows, r.skipped_element_rows), (2, 1));
        assert_eq!(loaded.mesh.node_count(), 3);
        assert_eq!(loaded.mesh.element_ids(), vec![ElementId::new(10)]);

        let table = format!("{RECOMMENDATION_HEADER}\n");
        let mut bytes = table.into_bytes();
        bytes.extend_from_slice(b"1,LOW,NO_ACTION,NONE,0.4,,\xff\n");
        let (rows, skipped) = read_recommendations(bytes.as_slice()).unwrap();
        assert!(rows.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn malformed_recommendation_rows_are_skipped() {
        let text = format!("{RECOMMENDATION_HEADER}\n1,HIGH,MOVE_NODES,NODE,1.5,,x\n2,LOW\n");
        let (rows, skipped) = read_recommendations(text.as_bytes()).unwrap();
        assert!(rows.is_empty());
        assert_eq!(skipped, 2);
    }
}
