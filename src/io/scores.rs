//! `element_id,score` tables of precomputed model output.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::io::{split_row, table_lines};
use crate::mesh_error::{MeshTriageError, TriageResult};
use crate::topology::ids::ElementId;

fn parse_score_row(cells: &[&str]) -> TriageResult<(ElementId, f64)> {
    let [id, score, ..] = cells else {
        return Err(MeshTriageError::MeshIoParse(format!(
            "score row needs 2 cells, found {}",
            cells.len()
        )));
    };
    let score = score
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite())
        .ok_or_else(|| MeshTriageError::MeshIoParse(format!("invalid score: {score}")))?;
    Ok((id.parse()?, score))
}

/// Read a score table with a header row. Returns the scores and the number
/// of skipped rows; a repeated id keeps the later score.
pub fn read_score_table<R: Read>(mut reader: R) -> TriageResult<(BTreeMap<ElementId, f64>, usize)> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let mut scores = BTreeMap::new();
    let mut skipped = 0;
    for line in table_lines(&bytes).skip(1) {
        let Some(line) = line else {
            log::debug!("score row skipped: not valid UTF-8");
            skipped += 1;
            continue;
        };
        let Some(cells) = split_row(line) else {
            continue;
        };
        match parse_score_row(&cells) {
            Ok((id, score)) => {
                scores.insert(id, score);
            }
            Err(err) => {
                log::debug!("score row skipped: {err}");
                skipped += 1;
            }
        }
    }
    Ok((scores, skipped))
}

/// Read a score artifact from disk. A file that does not exist is
/// [`MeshTriageError::ModelArtifactMissing`].
pub fn read_score_table_file(path: &Path) -> TriageResult<(BTreeMap<ElementId, f64>, usize)> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(MeshTriageError::ModelArtifactMissing(path.display().to_string()));
        }
        Err(err) => return Err(err.into()),
    };
    read_score_table(file)
}
