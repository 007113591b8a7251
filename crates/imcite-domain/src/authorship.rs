//! Authorship join entity

use crate::ids::ShortUid;
use serde::{Deserialize, Serialize};

/// Credits an author on a paper.
///
/// Keyed by `(paper_short_uid, author_short_uid)`; re-ingesting the same
/// paper recreates authorships idempotently.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Authorship {
    pub paper_short_uid: ShortUid,
    pub author_short_uid: ShortUid,
    /// Rank within the paper's author list, starting at 0
    pub author_position: u32,
    pub is_corresponding: bool,
    pub raw_author_name: Option<String>,
    pub institution_uids: Vec<ShortUid>,
}

impl Authorship {
    /// Composite key of this authorship
    pub fn key(&self) -> (ShortUid, ShortUid) {
        (
            self.paper_short_uid.clone(),
            self.author_short_uid.clone(),
        )
    }
}
