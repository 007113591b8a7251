//! Entity processors: resolve-or-create against the identifier index.
//!
//! Every processor consults the index before minting an internal id,
//! merges non-empty fields monotonically, and re-registers every external
//! id present on the record whether it created or merged. Re-registration
//! guards against partially-indexed entities left by earlier discovery
//! calls.

use super::state::GraphState;
use crate::stream::{EventSink, GraphEvent};
use imcite_domain::{
    Author, AuthorRecord, Authorship, IdNamespace, Institution, InstitutionRecord, Paper,
    PaperRecord, ShortUid,
};

/// Resolve or create the canonical paper for a source record.
///
/// `is_stub = false` marks a full ingestion: the paper is promoted out of
/// stub status and its authorships are attached. Discovery calls pass
/// `is_stub = true`; they may still enrich an existing paper with any
/// non-empty fields the record happens to carry, without promoting it.
pub fn ingest_paper(
    state: &mut GraphState,
    sink: &EventSink,
    record: &PaperRecord,
    is_stub: bool,
) -> ShortUid {
    let resolved = resolve_paper(state, record);

    let uid = match resolved {
        Some(uid) => {
            let paper = state
                .papers
                .get_mut(&uid)
                .expect("index entry points at a missing paper");
            let mut changed = paper.absorb(record);
            if !is_stub && paper.is_stub {
                paper.is_stub = false;
                changed = true;
            }
            if changed {
                let paper = paper.clone();
                sink.emit(GraphEvent::PaperUpdated { paper });
            }
            uid
        }
        None => {
            let uid = ShortUid::mint('p');
            let paper = Paper::from_record(uid.clone(), record, is_stub);
            sink.emit(GraphEvent::PaperAdded {
                paper: paper.clone(),
            });
            state.papers.insert(uid.clone(), paper);
            uid
        }
    };

    register_paper_ids(state, sink, record, &uid);

    if !record.authorships.is_empty() {
        attach_authorships(state, sink, record, &uid);
    }

    uid
}

fn resolve_paper(state: &GraphState, record: &PaperRecord) -> Option<ShortUid> {
    if let Some(doi) = record.doi.as_deref() {
        if let Some(uid) = state.index.find(IdNamespace::Doi, doi) {
            return Some(uid.clone());
        }
    }
    if let Some(id) = record.openalex_id.as_deref() {
        if let Some(uid) = state.index.find(IdNamespace::OpenAlex, id) {
            return Some(uid.clone());
        }
    }
    if let Some(id) = record.s2_paper_id.as_deref() {
        if let Some(uid) = state.index.find(IdNamespace::SemanticScholar, id) {
            return Some(uid.clone());
        }
    }
    if let Some(id) = record.s2_corpus_id.as_deref() {
        if let Some(uid) = state.index.find(IdNamespace::SemanticScholarCorpus, id) {
            return Some(uid.clone());
        }
    }
    None
}

fn register_paper_ids(
    state: &mut GraphState,
    sink: &EventSink,
    record: &PaperRecord,
    uid: &ShortUid,
) {
    if let Some(doi) = record.doi.as_deref() {
        state.record_external_id(sink, IdNamespace::Doi, doi, uid);
    }
    if let Some(id) = record.openalex_id.as_deref() {
        state.record_external_id(sink, IdNamespace::OpenAlex, id, uid);
    }
    if let Some(id) = record.s2_paper_id.as_deref() {
        state.record_external_id(sink, IdNamespace::SemanticScholar, id, uid);
    }
    if let Some(id) = record.s2_corpus_id.as_deref() {
        state.record_external_id(sink, IdNamespace::SemanticScholarCorpus, id, uid);
    }
}

fn attach_authorships(
    state: &mut GraphState,
    sink: &EventSink,
    record: &PaperRecord,
    paper_uid: &ShortUid,
) {
    for credit in &record.authorships {
        let author_uid = ingest_author(state, sink, &credit.author);
        let institution_uids: Vec<ShortUid> = credit
            .institutions
            .iter()
            .map(|inst| ingest_institution(state, sink, inst))
            .collect();

        let key = (paper_uid.clone(), author_uid.clone());
        if state.authorships.contains_key(&key) {
            continue;
        }
        let authorship = Authorship {
            paper_short_uid: paper_uid.clone(),
            author_short_uid: author_uid,
            author_position: credit.position,
            is_corresponding: credit.is_corresponding,
            raw_author_name: credit.raw_author_name.clone(),
            institution_uids,
        };
        sink.emit(GraphEvent::AuthorshipAdded {
            authorship: authorship.clone(),
        });
        state.authorships.insert(key, authorship);
    }
}

/// Resolve or create the canonical author for a record
pub fn ingest_author(state: &mut GraphState, sink: &EventSink, record: &AuthorRecord) -> ShortUid {
    let resolved = resolve_author(state, record);

    let uid = match resolved {
        Some(uid) => {
            let author = state
                .authors
                .get_mut(&uid)
                .expect("index entry points at a missing author");
            let mut changed = false;
            let name = record.display_name.trim();
            if !name.is_empty() && (author.clean_name.is_empty() || author.is_stub) {
                if author.clean_name != name {
                    author.clean_name = name.to_string();
                    changed = true;
                }
            }
            if author.orcid.is_none() && record.orcid.is_some() {
                author.orcid = record.orcid.clone();
                changed = true;
            }
            if author.is_stub && record.has_full_identity() {
                author.is_stub = false;
                changed = true;
            }
            if changed {
                let author = author.clone();
                sink.emit(GraphEvent::AuthorUpdated { author });
            }
            uid
        }
        None => {
            let uid = ShortUid::mint('a');
            let mut author = Author::new(
                uid.clone(),
                record.display_name.trim(),
                !record.has_full_identity(),
            );
            author.orcid = record.orcid.clone();
            sink.emit(GraphEvent::AuthorAdded {
                author: author.clone(),
            });
            state.authors.insert(uid.clone(), author);
            uid
        }
    };

    if let Some(id) = record.openalex_author_id.as_deref() {
        state.record_external_id(sink, IdNamespace::OpenAlexAuthor, id, &uid);
    }
    if let Some(orcid) = record.orcid.as_deref() {
        state.record_external_id(sink, IdNamespace::Orcid, orcid, &uid);
    }
    if let Some(id) = record.s2_author_id.as_deref() {
        state.record_external_id(sink, IdNamespace::SemanticScholarAuthor, id, &uid);
    }

    uid
}

fn resolve_author(state: &GraphState, record: &AuthorRecord) -> Option<ShortUid> {
    if let Some(id) = record.openalex_author_id.as_deref() {
        if let Some(uid) = state.index.find(IdNamespace::OpenAlexAuthor, id) {
            return Some(uid.clone());
        }
    }
    if let Some(orcid) = record.orcid.as_deref() {
        if let Some(uid) = state.index.find(IdNamespace::Orcid, orcid) {
            return Some(uid.clone());
        }
    }
    if let Some(id) = record.s2_author_id.as_deref() {
        if let Some(uid) = state.index.find(IdNamespace::SemanticScholarAuthor, id) {
            return Some(uid.clone());
        }
    }
    None
}

/// Resolve or create the canonical institution for a record
pub fn ingest_institution(
    state: &mut GraphState,
    sink: &EventSink,
    record: &InstitutionRecord,
) -> ShortUid {
    let resolved = resolve_institution(state, record);

    let uid = match resolved {
        Some(uid) => uid,
        None => {
            let uid = ShortUid::mint('i');
            let institution = Institution {
                short_uid: uid.clone(),
                ror_id: record.ror_id.clone(),
                display_name: record.display_name.trim().to_string(),
                country_code: record.country_code.clone(),
                institution_type: record.institution_type.clone(),
            };
            sink.emit(GraphEvent::InstitutionAdded {
                institution: institution.clone(),
            });
            state.institutions.insert(uid.clone(), institution);
            uid
        }
    };

    if let Some(id) = record.openalex_institution_id.as_deref() {
        state.record_external_id(sink, IdNamespace::OpenAlexInstitution, id, &uid);
    }
    if let Some(ror) = record.ror_id.as_deref() {
        state.record_external_id(sink, IdNamespace::Ror, ror, &uid);
    }

    uid
}

fn resolve_institution(state: &GraphState, record: &InstitutionRecord) -> Option<ShortUid> {
    if let Some(id) = record.openalex_institution_id.as_deref() {
        if let Some(uid) = state.index.find(IdNamespace::OpenAlexInstitution, id) {
            return Some(uid.clone());
        }
    }
    if let Some(ror) = record.ror_id.as_deref() {
        if let Some(uid) = state.index.find(IdNamespace::Ror, ror) {
            return Some(uid.clone());
        }
    }
    None
}
