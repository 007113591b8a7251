//! Stream fold: rebuild graph state from the message sequence.
//!
//! Consumers on the other side of the stream keep one of these per session.
//! Folding every message from a `Reset` onward yields the same entity set
//! the engine holds in memory.

use super::events::{GraphEvent, StreamMessage};
use crate::graph::EntityCounts;
use imcite_domain::{
    Author, Authorship, Institution, Paper, PaperRelationship, RelationshipKey, ShortUid,
};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct GraphMirror {
    pub papers: HashMap<ShortUid, Paper>,
    pub authors: HashMap<ShortUid, Author>,
    pub institutions: HashMap<ShortUid, Institution>,
    pub authorships: BTreeMap<(ShortUid, ShortUid), Authorship>,
    pub relationships: BTreeMap<RelationshipKey, PaperRelationship>,
    pub external_ids: HashMap<String, ShortUid>,
    pub last_error: Option<String>,
}

impl GraphMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, message: &StreamMessage) {
        match message {
            StreamMessage::Reset => *self = Self::default(),
            StreamMessage::Delta { events } => {
                for event in events {
                    self.apply_event(event);
                }
            }
            StreamMessage::FatalError { message } => {
                self.last_error = Some(message.clone());
            }
            StreamMessage::Phase { .. }
            | StreamMessage::Progress { .. }
            | StreamMessage::Completed => {}
        }
    }

    fn apply_event(&mut self, event: &GraphEvent) {
        match event {
            GraphEvent::PaperAdded { paper } | GraphEvent::PaperUpdated { paper } => {
                self.papers.insert(paper.short_uid.clone(), paper.clone());
            }
            GraphEvent::AuthorAdded { author } | GraphEvent::AuthorUpdated { author } => {
                self.authors.insert(author.short_uid.clone(), author.clone());
            }
            GraphEvent::InstitutionAdded { institution } => {
                self.institutions
                    .insert(institution.short_uid.clone(), institution.clone());
            }
            GraphEvent::AuthorshipAdded { authorship } => {
                self.authorships.insert(authorship.key(), authorship.clone());
            }
            GraphEvent::RelationshipAdded { relationship } => {
                self.relationships
                    .insert(relationship.key(), relationship.clone());
            }
            GraphEvent::ExternalIdSet {
                namespace,
                value,
                short_uid,
            } => {
                self.external_ids
                    .insert(format!("{}:{}", namespace, value), short_uid.clone());
            }
            GraphEvent::AuthorsMerged { merges } => {
                for merge in merges {
                    for loser in &merge.loser_uids {
                        self.authors.remove(loser);
                        let stale: Vec<(ShortUid, ShortUid)> = self
                            .authorships
                            .keys()
                            .filter(|(_, author)| author == loser)
                            .cloned()
                            .collect();
                        for key in stale {
                            if let Some(mut authorship) = self.authorships.remove(&key) {
                                authorship.author_short_uid = merge.winner.short_uid.clone();
                                self.authorships
                                    .entry(authorship.key())
                                    .or_insert(authorship);
                            }
                        }
                        for uid in self.external_ids.values_mut() {
                            if uid == loser {
                                *uid = merge.winner.short_uid.clone();
                            }
                        }
                    }
                    self.authors
                        .insert(merge.winner.short_uid.clone(), merge.winner.clone());
                }
            }
        }
    }

    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            papers: self.papers.len(),
            authors: self.authors.len(),
            institutions: self.institutions.len(),
            authorships: self.authorships.len(),
            relationships: self.relationships.len(),
            external_ids: self.external_ids.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imcite_domain::{IdNamespace, PaperRecord};

    #[test]
    fn test_reset_clears_mirror() {
        let mut mirror = GraphMirror::new();
        let paper = Paper::from_record(
            ShortUid::from_string("p-1"),
            &PaperRecord {
                title: Some("T".to_string()),
                ..Default::default()
            },
            false,
        );
        mirror.apply(&StreamMessage::Delta {
            events: vec![GraphEvent::PaperAdded { paper }],
        });
        assert_eq!(mirror.counts().papers, 1);

        mirror.apply(&StreamMessage::Reset);
        assert_eq!(mirror.counts(), EntityCounts::default());
    }

    #[test]
    fn test_external_id_events_rebuild_index_mirror() {
        let mut mirror = GraphMirror::new();
        mirror.apply(&StreamMessage::Delta {
            events: vec![GraphEvent::ExternalIdSet {
                namespace: IdNamespace::Doi,
                value: "10.1/x".to_string(),
                short_uid: ShortUid::from_string("p-1"),
            }],
        });
        assert_eq!(
            mirror.external_ids.get("doi:10.1/x"),
            Some(&ShortUid::from_string("p-1"))
        );
    }
}
