//! Closed set of mesh error tags.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::mesh_error::MeshTriageError;
use crate::topology::ids::ElementId;

/// A mesh defect detected by the rule engine. Tags are non-exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorTag {
    SmallArea,
    BadAspectRatio,
    HighSkewness,
    BadTransition,
    MissingNeighbor,
    OrphanNode,
    CadDeviationHigh,
    CadOutlierNode,
    CadCoverageWeak,
}

impl ErrorTag {
    pub const ALL: [ErrorTag; 9] = [
        ErrorTag::SmallArea,
        ErrorTag::BadAspectRatio,
        ErrorTag::HighSkewness,
        ErrorTag::BadTransition,
        ErrorTag::MissingNeighbor,
        ErrorTag::OrphanNode,
        ErrorTag::CadDeviationHigh,
        ErrorTag::CadOutlierNode,
        ErrorTag::CadCoverageWeak,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorTag::SmallArea => "SMALL_AREA",
            ErrorTag::BadAspectRatio => "BAD_ASPECT_RATIO",
            ErrorTag::HighSkewness => "HIGH_SKEWNESS",
            ErrorTag::BadTransition => "BAD_TRANSITION",
            ErrorTag::MissingNeighbor => "MISSING_NEIGHBOR",
            ErrorTag::OrphanNode => "ORPHAN_NODE",
            ErrorTag::CadDeviationHigh => "CAD_DEVIATION_HIGH",
            ErrorTag::CadOutlierNode => "CAD_OUTLIER_NODE",
            ErrorTag::CadCoverageWeak => "CAD_COVERAGE_WEAK",
        }
    }

    /// Tags produced by the CAD-deviation rule set.
    pub const fn is_cad(self) -> bool {
        matches!(
            self,
            ErrorTag::CadDeviationHigh | ErrorTag::CadOutlierNode | ErrorTag::CadCoverageWeak
        )
    }

    /// Connectivity failures; these override every risk signal when mapping
    /// actions.
    pub const fn is_connectivity(self) -> bool {
        matches!(self, ErrorTag::MissingNeighbor | ErrorTag::OrphanNode)
    }

    /// Human-readable remediation hint for this defect.
    pub const fn hint(self) -> &'static str {
        match self {
            ErrorTag::SmallArea => "Increase local element size or remesh the collapsed region.",
            ErrorTag::BadAspectRatio => "Improve element shape by smoothing or remeshing.",
            ErrorTag::HighSkewness => "Reduce skewness by adjusting the node distribution.",
            ErrorTag::BadTransition => "Apply a gradual size transition between adjacent regions.",
            ErrorTag::MissingNeighbor => "Check for holes or broken connectivity in the mesh.",
            ErrorTag::OrphanNode => "Merge or delete nodes not attached to the surface.",
            ErrorTag::CadDeviationHigh => "Project mesh nodes closer to the CAD surface.",
            ErrorTag::CadOutlierNode => "Move the outlying node back onto the CAD surface.",
            ErrorTag::CadCoverageWeak => "Increase mesh density to capture the CAD geometry.",
        }
    }
}

impl fmt::Display for ErrorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorTag {
    type Err = MeshTriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ErrorTag::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MeshTriageError::MeshIoParse(format!("unknown error tag: {s}")))
    }
}

/// Tags carried by one element, in declaration order.
pub type TagSet = BTreeSet<ErrorTag>;

/// Tag sets keyed by element id.
pub type TagMap = BTreeMap<ElementId, TagSet>;

/// Union of two tag maps; elements present in either map appear once.
pub fn merge_tags(a: &TagMap, b: &TagMap) -> TagMap {
    let mut out = a.clone();
    for (id, tags) in b {
        out.entry(*id).or_default().extend(tags.iter().copied());
    }
    out
}
