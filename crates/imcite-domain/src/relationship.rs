//! Directed paper relationships

use crate::ids::ShortUid;
use crate::paper::RelationshipTag;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a directed paper-to-paper edge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    Cites,
    Similar,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Cites => "cites",
            RelationshipType::Similar => "similar",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite dedup key for an edge: `(source, type, target)`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipKey {
    pub source: ShortUid,
    pub relationship_type: RelationshipType,
    pub target: ShortUid,
}

impl fmt::Display for RelationshipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.source, self.relationship_type, self.target
        )
    }
}

/// A directed edge between two papers, tagged with discovery provenance
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PaperRelationship {
    pub source_short_uid: ShortUid,
    pub target_short_uid: ShortUid,
    pub relationship_type: RelationshipType,
    pub tag: Option<RelationshipTag>,
}

impl PaperRelationship {
    pub fn cites(source: ShortUid, target: ShortUid) -> Self {
        Self {
            source_short_uid: source,
            target_short_uid: target,
            relationship_type: RelationshipType::Cites,
            tag: None,
        }
    }

    pub fn similar(source: ShortUid, target: ShortUid, tag: RelationshipTag) -> Self {
        Self {
            source_short_uid: source,
            target_short_uid: target,
            relationship_type: RelationshipType::Similar,
            tag: Some(tag),
        }
    }

    pub fn key(&self) -> RelationshipKey {
        RelationshipKey {
            source: self.source_short_uid.clone(),
            relationship_type: self.relationship_type,
            target: self.target_short_uid.clone(),
        }
    }
}
