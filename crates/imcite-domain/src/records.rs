//! Canonical partial records produced by source adapters.
//!
//! Each provider payload is deserialized into its own typed shape inside the
//! adapter, then mapped into these canonical records. The entity processors
//! only ever see records, never raw provider blobs.

use crate::paper::OpenAccessStatus;
use serde::{Deserialize, Serialize};

/// Partial paper data from one provider
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Bare primary-provider work id (`W…`)
    pub openalex_id: Option<String>,
    /// Normalized bare DOI
    pub doi: Option<String>,
    /// Secondary-provider paper id
    pub s2_paper_id: Option<String>,
    /// Secondary-provider corpus id
    pub s2_corpus_id: Option<String>,

    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub publication_date: Option<String>,
    /// Venue name
    pub location: Option<String>,
    pub abstract_text: Option<String>,
    pub fwci: Option<f64>,
    pub cited_by_count: Option<i64>,
    pub work_type: Option<String>,
    pub language: Option<String>,
    pub keywords: Vec<String>,
    pub best_oa_url: Option<String>,
    pub oa_status: OpenAccessStatus,

    /// Author credits, in list order. Empty for lightweight field selections.
    pub authorships: Vec<AuthorshipRecord>,
    /// Bare primary-provider ids of works this paper references
    pub referenced_works: Vec<String>,
    /// Bare primary-provider ids of works the provider deems related
    pub related_works: Vec<String>,
}

impl PaperRecord {
    /// True when the record carries more than bare identity
    pub fn has_substance(&self) -> bool {
        self.title
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false)
    }
}

/// One author credit on a paper record
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthorshipRecord {
    pub author: AuthorRecord,
    /// Rank within the paper's author list, starting at 0
    pub position: u32,
    pub is_corresponding: bool,
    pub raw_author_name: Option<String>,
    pub institutions: Vec<InstitutionRecord>,
}

/// Partial author data from one provider
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthorRecord {
    /// Bare primary-provider author id (`A…`)
    pub openalex_author_id: Option<String>,
    /// Secondary-provider author id
    pub s2_author_id: Option<String>,
    pub orcid: Option<String>,
    pub display_name: String,
}

impl AuthorRecord {
    /// A record with a stable primary identity (provider id or ORCID)
    /// carries full identity; plain-name records produce stub authors.
    pub fn has_full_identity(&self) -> bool {
        self.openalex_author_id.is_some() || self.orcid.is_some()
    }
}

/// Partial institution data from one provider
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InstitutionRecord {
    /// Bare primary-provider institution id (`I…`)
    pub openalex_institution_id: Option<String>,
    pub ror_id: Option<String>,
    pub display_name: String,
    pub country_code: Option<String>,
    pub institution_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_substance() {
        let mut rec = PaperRecord {
            openalex_id: Some("W1".to_string()),
            ..Default::default()
        };
        assert!(!rec.has_substance());
        rec.title = Some("  ".to_string());
        assert!(!rec.has_substance());
        rec.title = Some("A Real Title".to_string());
        assert!(rec.has_substance());
    }

    #[test]
    fn test_author_record_identity() {
        let stub = AuthorRecord {
            display_name: "J. Smith".to_string(),
            s2_author_id: Some("144".to_string()),
            ..Default::default()
        };
        assert!(!stub.has_full_identity());

        let full = AuthorRecord {
            display_name: "John Smith".to_string(),
            openalex_author_id: Some("A5023888391".to_string()),
            ..Default::default()
        };
        assert!(full.has_full_identity());
    }
}
