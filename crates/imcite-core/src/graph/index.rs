//! External identifier index.
//!
//! The single source of truth for "have we seen this entity before". Every
//! entity processor consults it before minting a new internal id. Entries
//! are append-only for the life of a session; only an author merge may
//! re-point them.

use imcite_domain::{ExternalId, IdNamespace, ShortUid};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ExternalIdIndex {
    entries: HashMap<String, ShortUid>,
}

impl ExternalIdIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the internal id mapped to `(namespace, value)`
    pub fn find(&self, namespace: IdNamespace, value: &str) -> Option<&ShortUid> {
        let id = ExternalId::new(namespace, value)?;
        self.entries.get(&id.key())
    }

    /// Record a mapping. Idempotent: the first writer wins and later writes
    /// to the same key are no-ops. Returns true when a new entry was written.
    pub fn record(&mut self, namespace: IdNamespace, value: &str, uid: &ShortUid) -> bool {
        let Some(id) = ExternalId::new(namespace, value) else {
            return false;
        };
        let key = id.key();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, uid.clone());
        true
    }

    /// Re-point every entry mapped to `from` onto `to`. Only the author
    /// merge path calls this. Returns the number of entries moved.
    pub fn repoint(&mut self, from: &ShortUid, to: &ShortUid) -> usize {
        let mut moved = 0;
        for uid in self.entries.values_mut() {
            if uid == from {
                *uid = to.clone();
                moved += 1;
            }
        }
        moved
    }

    /// First recorded value in `namespace` that maps to `uid`
    pub fn value_for(&self, namespace: IdNamespace, uid: &ShortUid) -> Option<String> {
        let prefix = format!("{}:", namespace);
        self.entries
            .iter()
            .filter(|(key, mapped)| key.starts_with(&prefix) && *mapped == uid)
            .map(|(key, _)| key[prefix.len()..].to_string())
            .next()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(key, uid)` pairs; keys are in `namespace:value` form
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ShortUid)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_writer_wins() {
        let mut index = ExternalIdIndex::new();
        let first = ShortUid::from_string("p-1");
        let second = ShortUid::from_string("p-2");

        assert!(index.record(IdNamespace::Doi, "10.1/x", &first));
        assert!(!index.record(IdNamespace::Doi, "10.1/x", &second));
        assert_eq!(index.find(IdNamespace::Doi, "10.1/x"), Some(&first));
    }

    #[test]
    fn test_find_normalizes_value() {
        let mut index = ExternalIdIndex::new();
        let uid = ShortUid::from_string("p-1");
        index.record(IdNamespace::Doi, "https://doi.org/10.1/X", &uid);
        assert_eq!(index.find(IdNamespace::Doi, "10.1/x"), Some(&uid));

        index.record(IdNamespace::OpenAlex, "https://openalex.org/W42", &uid);
        assert_eq!(index.find(IdNamespace::OpenAlex, "W42"), Some(&uid));
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let mut index = ExternalIdIndex::new();
        let uid = ShortUid::from_string("p-1");
        assert!(!index.record(IdNamespace::Doi, "not-a-doi", &uid));
        assert!(index.is_empty());
    }

    #[test]
    fn test_repoint() {
        let mut index = ExternalIdIndex::new();
        let loser = ShortUid::from_string("a-1");
        let winner = ShortUid::from_string("a-2");
        index.record(IdNamespace::SemanticScholarAuthor, "144", &loser);
        index.record(IdNamespace::SemanticScholarAuthor, "145", &loser);

        assert_eq!(index.repoint(&loser, &winner), 2);
        assert_eq!(
            index.find(IdNamespace::SemanticScholarAuthor, "144"),
            Some(&winner)
        );
    }

    #[test]
    fn test_value_for() {
        let mut index = ExternalIdIndex::new();
        let uid = ShortUid::from_string("p-1");
        index.record(IdNamespace::OpenAlex, "W42", &uid);
        assert_eq!(
            index.value_for(IdNamespace::OpenAlex, &uid),
            Some("W42".to_string())
        );
        assert_eq!(index.value_for(IdNamespace::Doi, &uid), None);
    }
}
