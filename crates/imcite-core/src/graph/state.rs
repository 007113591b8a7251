//! Aggregate session state

use super::index::ExternalIdIndex;
use crate::stream::{EventSink, GraphEvent};
use imcite_domain::{
    Author, Authorship, IdNamespace, Institution, Paper, PaperRelationship, RelationshipKey,
    ShortUid,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Entity counts, used by progress reporting and the export round-trip
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub papers: usize,
    pub authors: usize,
    pub institutions: usize,
    pub authorships: usize,
    pub relationships: usize,
    pub external_ids: usize,
}

/// All entity maps for one analysis session.
///
/// Created empty at session start, mutated in place through every phase,
/// exported as a snapshot on demand, discarded on reset. Phase functions
/// take it as an explicit parameter; nothing in the engine closes over
/// shared mutable state.
#[derive(Debug, Default)]
pub struct GraphState {
    pub papers: HashMap<ShortUid, Paper>,
    pub authors: HashMap<ShortUid, Author>,
    pub institutions: HashMap<ShortUid, Institution>,
    /// Keyed by `(paper_short_uid, author_short_uid)`
    pub authorships: BTreeMap<(ShortUid, ShortUid), Authorship>,
    /// Keyed by `(source, type, target)`; the key set is the edge dedup guard
    pub relationships: BTreeMap<RelationshipKey, PaperRelationship>,
    pub index: ExternalIdIndex,
    pub master_paper: Option<ShortUid>,
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an external id and notify observers when a new entry landed
    pub fn record_external_id(
        &mut self,
        sink: &EventSink,
        namespace: IdNamespace,
        value: &str,
        uid: &ShortUid,
    ) -> bool {
        let recorded = self.index.record(namespace, value, uid);
        if recorded {
            sink.emit(GraphEvent::ExternalIdSet {
                namespace,
                value: value.to_string(),
                short_uid: uid.clone(),
            });
        }
        recorded
    }

    /// Insert an edge unless its `(source, type, target)` key already
    /// exists. Re-discovering an edge via a different path is a silent
    /// no-op. Returns true when the edge was inserted.
    pub fn add_relationship(&mut self, sink: &EventSink, relationship: PaperRelationship) -> bool {
        let key = relationship.key();
        if self.relationships.contains_key(&key) {
            return false;
        }
        sink.emit(GraphEvent::RelationshipAdded {
            relationship: relationship.clone(),
        });
        self.relationships.insert(key, relationship);
        true
    }

    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            papers: self.papers.len(),
            authors: self.authors.len(),
            institutions: self.institutions.len(),
            authorships: self.authorships.len(),
            relationships: self.relationships.len(),
            external_ids: self.index.len(),
        }
    }

    /// Uids of every paper still awaiting full hydration
    pub fn stub_paper_uids(&self) -> Vec<ShortUid> {
        let mut uids: Vec<ShortUid> = self
            .papers
            .values()
            .filter(|p| p.is_stub)
            .map(|p| p.short_uid.clone())
            .collect();
        uids.sort();
        uids
    }

    /// Uids of every stub author, sorted for deterministic processing
    pub fn stub_author_uids(&self) -> Vec<ShortUid> {
        let mut uids: Vec<ShortUid> = self
            .authors
            .values()
            .filter(|a| a.is_stub)
            .map(|a| a.short_uid.clone())
            .collect();
        uids.sort();
        uids
    }
}
