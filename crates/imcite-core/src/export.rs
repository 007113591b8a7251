//! Point-in-time tabular snapshot of the graph.
//!
//! The engine's only export obligation: a consistent, normalized extract an
//! external writer can serialize to CSV or archive formats. Rows are sorted
//! so identical states produce identical snapshots.

use crate::graph::{EntityCounts, GraphState};
use chrono::{DateTime, Utc};
use imcite_domain::{OpenAccessStatus, RelationshipTag, RelationshipType, ShortUid};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaperRow {
    pub short_uid: ShortUid,
    pub title: String,
    pub publication_year: Option<i32>,
    pub publication_date: Option<String>,
    pub location: Option<String>,
    pub abstract_text: Option<String>,
    pub fwci: Option<f64>,
    pub cited_by_count: Option<i64>,
    pub work_type: Option<String>,
    pub language: Option<String>,
    pub best_oa_url: Option<String>,
    pub oa_status: OpenAccessStatus,
    pub is_stub: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorRow {
    pub short_uid: ShortUid,
    pub clean_name: String,
    pub orcid: Option<String>,
    pub is_stub: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstitutionRow {
    pub short_uid: ShortUid,
    pub ror_id: Option<String>,
    pub display_name: String,
    pub country_code: Option<String>,
    pub institution_type: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorshipRow {
    pub paper_short_uid: ShortUid,
    pub author_short_uid: ShortUid,
    pub author_position: u32,
    pub is_corresponding: bool,
    pub raw_author_name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorshipInstitutionRow {
    pub paper_short_uid: ShortUid,
    pub author_short_uid: ShortUid,
    pub institution_short_uid: ShortUid,
    /// Rank within the authorship's affiliation list, starting at 0
    pub position: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationshipRow {
    pub source_short_uid: ShortUid,
    pub target_short_uid: ShortUid,
    pub relationship_type: RelationshipType,
    pub tag: Option<RelationshipTag>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationshipTagRow {
    pub paper_short_uid: ShortUid,
    pub tag: RelationshipTag,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeywordRow {
    pub paper_short_uid: ShortUid,
    /// Rank within the paper's keyword list, starting at 0
    pub position: u32,
    pub keyword: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalIdRow {
    /// `namespace:value` key as held by the index
    pub key: String,
    pub short_uid: ShortUid,
}

/// A frozen extract of one session's graph
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub master_paper: Option<ShortUid>,
    pub papers: Vec<PaperRow>,
    pub authors: Vec<AuthorRow>,
    pub institutions: Vec<InstitutionRow>,
    pub authorships: Vec<AuthorshipRow>,
    pub authorship_institutions: Vec<AuthorshipInstitutionRow>,
    pub relationships: Vec<RelationshipRow>,
    pub relationship_tags: Vec<RelationshipTagRow>,
    pub keywords: Vec<KeywordRow>,
    pub external_ids: Vec<ExternalIdRow>,
}

impl Snapshot {
    pub fn from_state(state: &GraphState) -> Self {
        let mut papers: Vec<PaperRow> = Vec::with_capacity(state.papers.len());
        let mut relationship_tags = Vec::new();
        let mut keywords = Vec::new();

        let mut paper_uids: Vec<&ShortUid> = state.papers.keys().collect();
        paper_uids.sort();
        for uid in paper_uids {
            let paper = &state.papers[uid];
            papers.push(PaperRow {
                short_uid: paper.short_uid.clone(),
                title: paper.title.clone(),
                publication_year: paper.publication_year,
                publication_date: paper.publication_date.clone(),
                location: paper.location.clone(),
                abstract_text: paper.abstract_text.clone(),
                fwci: paper.fwci,
                cited_by_count: paper.cited_by_count,
                work_type: paper.work_type.clone(),
                language: paper.language.clone(),
                best_oa_url: paper.best_oa_url.clone(),
                oa_status: paper.oa_status,
                is_stub: paper.is_stub,
            });
            for tag in &paper.relationship_tags {
                relationship_tags.push(RelationshipTagRow {
                    paper_short_uid: paper.short_uid.clone(),
                    tag: *tag,
                });
            }
            for (position, keyword) in paper.keywords.iter().enumerate() {
                keywords.push(KeywordRow {
                    paper_short_uid: paper.short_uid.clone(),
                    position: position as u32,
                    keyword: keyword.clone(),
                });
            }
        }

        let mut authors: Vec<AuthorRow> = state
            .authors
            .values()
            .map(|author| AuthorRow {
                short_uid: author.short_uid.clone(),
                clean_name: author.clean_name.clone(),
                orcid: author.orcid.clone(),
                is_stub: author.is_stub,
            })
            .collect();
        authors.sort_by(|a, b| a.short_uid.cmp(&b.short_uid));

        let mut institutions: Vec<InstitutionRow> = state
            .institutions
            .values()
            .map(|institution| InstitutionRow {
                short_uid: institution.short_uid.clone(),
                ror_id: institution.ror_id.clone(),
                display_name: institution.display_name.clone(),
                country_code: institution.country_code.clone(),
                institution_type: institution.institution_type.clone(),
            })
            .collect();
        institutions.sort_by(|a, b| a.short_uid.cmp(&b.short_uid));

        let mut authorships = Vec::with_capacity(state.authorships.len());
        let mut authorship_institutions = Vec::new();
        for authorship in state.authorships.values() {
            authorships.push(AuthorshipRow {
                paper_short_uid: authorship.paper_short_uid.clone(),
                author_short_uid: authorship.author_short_uid.clone(),
                author_position: authorship.author_position,
                is_corresponding: authorship.is_corresponding,
                raw_author_name: authorship.raw_author_name.clone(),
            });
            for (position, institution_uid) in authorship.institution_uids.iter().enumerate() {
                authorship_institutions.push(AuthorshipInstitutionRow {
                    paper_short_uid: authorship.paper_short_uid.clone(),
                    author_short_uid: authorship.author_short_uid.clone(),
                    institution_short_uid: institution_uid.clone(),
                    position: position as u32,
                });
            }
        }

        let relationships: Vec<RelationshipRow> = state
            .relationships
            .values()
            .map(|relationship| RelationshipRow {
                source_short_uid: relationship.source_short_uid.clone(),
                target_short_uid: relationship.target_short_uid.clone(),
                relationship_type: relationship.relationship_type,
                tag: relationship.tag,
            })
            .collect();

        let mut external_ids: Vec<ExternalIdRow> = state
            .index
            .iter()
            .map(|(key, uid)| ExternalIdRow {
                key: key.clone(),
                short_uid: uid.clone(),
            })
            .collect();
        external_ids.sort_by(|a, b| a.key.cmp(&b.key));

        Self {
            taken_at: Utc::now(),
            master_paper: state.master_paper.clone(),
            papers,
            authors,
            institutions,
            authorships,
            authorship_institutions,
            relationships,
            relationship_tags,
            keywords,
            external_ids,
        }
    }

    /// Entity counts derived purely from the exported rows
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
