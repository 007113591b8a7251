//! Paper domain model

use crate::ids::ShortUid;
use crate::records::PaperRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Open access availability status as reported by the primary provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OpenAccessStatus {
    Gold,
    Green,
    Bronze,
    Hybrid,
    Diamond,
    Closed,
    #[default]
    Unknown,
}

impl OpenAccessStatus {
    /// Parse a provider status string, falling back to Unknown
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "gold" => OpenAccessStatus::Gold,
            "green" => OpenAccessStatus::Green,
            "bronze" => OpenAccessStatus::Bronze,
            "hybrid" => OpenAccessStatus::Hybrid,
            "diamond" => OpenAccessStatus::Diamond,
            "closed" => OpenAccessStatus::Closed,
            _ => OpenAccessStatus::Unknown,
        }
    }
}

/// Provenance of a paper relative to the master paper
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationshipTag {
    #[serde(rename = "1st_degree")]
    FirstDegree,
    #[serde(rename = "2nd_degree")]
    SecondDegree,
    #[serde(rename = "referenced_by_1st_degree")]
    ReferencedByFirstDegree,
    #[serde(rename = "similar")]
    Similar,
}

impl RelationshipTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipTag::FirstDegree => "1st_degree",
            RelationshipTag::SecondDegree => "2nd_degree",
            RelationshipTag::ReferencedByFirstDegree => "referenced_by_1st_degree",
            RelationshipTag::Similar => "similar",
        }
    }
}

impl fmt::Display for RelationshipTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical paper entity.
///
/// Fields are populated monotonically: merging a record replaces a field only
/// with a non-empty value, and a paper that has been fully ingested never
/// regresses to a stub.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Paper {
    pub short_uid: ShortUid,
    pub title: String,
    pub publication_year: Option<i32>,
    pub publication_date: Option<String>,
    /// Venue name
    pub location: Option<String>,
    pub abstract_text: Option<String>,
    /// Field-weighted citation impact
    pub fwci: Option<f64>,
    pub cited_by_count: Option<i64>,
    pub work_type: Option<String>,
    pub language: Option<String>,
    pub keywords: Vec<String>,
    pub best_oa_url: Option<String>,
    pub oa_status: OpenAccessStatus,
    /// True until a full-fidelity record has been ingested
    pub is_stub: bool,
    pub relationship_tags: BTreeSet<RelationshipTag>,
}

impl Paper {
    /// Construct a paper from a source record
    pub fn from_record(short_uid: ShortUid, record: &PaperRecord, is_stub: bool) -> Self {
        let mut paper = Self {
            short_uid,
            title: String::new(),
            publication_year: None,
            publication_date: None,
            location: None,
            abstract_text: None,
            fwci: None,
            cited_by_count: None,
            work_type: None,
            language: None,
            keywords: Vec::new(),
            best_oa_url: None,
            oa_status: OpenAccessStatus::Unknown,
            is_stub,
            relationship_tags: BTreeSet::new(),
        };
        paper.absorb(record);
        paper
    }

    /// Merge all non-empty fields of `record` into this paper.
    ///
    /// Returns true when any field changed. Never clears a populated field
    /// and never touches `is_stub`; promotion is the caller's decision.
    pub fn absorb(&mut self, record: &PaperRecord) -> bool {
        let mut changed = false;

        if let Some(title) = record.title.as_deref() {
            if !title.trim().is_empty() && title != self.title {
                self.title = title.to_string();
                changed = true;
            }
        }
        changed |= replace_if_some(&mut self.publication_year, record.publication_year);
        changed |= replace_with_nonempty(&mut self.publication_date, &record.publication_date);
        changed |= replace_with_nonempty(&mut self.location, &record.location);
        changed |= replace_with_nonempty(&mut self.abstract_text, &record.abstract_text);
        changed |= replace_if_some(&mut self.fwci, record.fwci);
        changed |= replace_if_some(&mut self.cited_by_count, record.cited_by_count);
        changed |= replace_with_nonempty(&mut self.work_type, &record.work_type);
        changed |= replace_with_nonempty(&mut self.language, &record.language);
        changed |= replace_with_nonempty(&mut self.best_oa_url, &record.best_oa_url);

        if !record.keywords.is_empty() && self.keywords != record.keywords {
            self.keywords = record.keywords.clone();
            changed = true;
        }
        if record.oa_status != OpenAccessStatus::Unknown && record.oa_status != self.oa_status {
            self.oa_status = record.oa_status;
            changed = true;
        }

        changed
    }

    /// Add a provenance tag; returns true when newly added
    pub fn tag(&mut self, tag: RelationshipTag) -> bool {
        self.relationship_tags.insert(tag)
    }
}

fn replace_if_some<T: Copy + PartialEq>(slot: &mut Option<T>, incoming: Option<T>) -> bool {
    match incoming {
        Some(value) if *slot != Some(value) => {
            *slot = Some(value);
            true
        }
        _ => false,
    }
}

fn replace_with_nonempty(slot: &mut Option<String>, incoming: &Option<String>) -> bool {
    match incoming.as_deref() {
        Some(value) if !value.trim().is_empty() && slot.as_deref() != Some(value) => {
            *slot = Some(value.to_string());
            true
        }
        _ => false,
    }
}
