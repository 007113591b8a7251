//! Fuzzy author reconciliation.
//!
//! The secondary provider yields authors only as plain names, so its papers
//! produce stub authors that duplicate authors already known with full
//! identity from the primary provider. This pass batch-fetches the DOIs the
//! stubs are credited on, scores stub names against the candidate author
//! lists, and merges every accepted stub into one canonical author per
//! primary author id.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::graph::GraphState;
use crate::sources::{FieldSet, PrimarySource};
use crate::stream::{AuthorMerge, EventSink, GraphEvent};
use imcite_domain::author::{first_token, normalize_person_name, starts_with_initial, surname};
use imcite_domain::{AuthorRecord, IdNamespace, ShortUid};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use strsim::jaro_winkler;

/// Summary of one reconciliation pass
#[derive(Debug, Default, Clone, Copy)]
pub struct ReconcileOutcome {
    pub stubs_examined: usize,
    pub stubs_merged: usize,
}

/// Score a stub author name against a candidate's canonical name.
///
/// Identical normalized names score 1.0. Otherwise surname similarity gates
/// the comparison entirely; surviving pairs score by full-name similarity,
/// boosted when the stub abbreviates a first name to a matching initial.
pub fn match_score(stub_name: &str, candidate_name: &str, config: &EngineConfig) -> f64 {
    let stub = normalize_person_name(stub_name);
    let candidate = normalize_person_name(candidate_name);
    if stub.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if stub == candidate {
        return 1.0;
    }
    if jaro_winkler(surname(&stub), surname(&candidate)) < config.reconcile_surname_gate {
        return 0.0;
    }
    let mut score = jaro_winkler(&stub, &candidate);
    if starts_with_initial(&stub) {
        let stub_initial = first_token(&stub).and_then(|t| t.chars().next());
        let candidate_initial = first_token(&candidate).and_then(|t| t.chars().next());
        if stub_initial.is_some() && stub_initial == candidate_initial {
            score = (score * config.reconcile_initial_boost).min(1.0);
        }
    }
    score
}

/// Merge stub authors into canonical primary-provider identities.
///
/// At most one author survives per primary author id: if the id is already
/// indexed, the indexed author is the winner; otherwise the first accepted
/// stub wins, absorbs the canonical name and ORCID, and leaves stub status.
/// Every other accepted stub loses its authorships to the winner and is
/// deleted.
pub async fn reconcile_stub_authors<P: PrimarySource>(
    state: &mut GraphState,
    sink: &EventSink,
    primary: &P,
    config: &EngineConfig,
) -> Result<ReconcileOutcome, EngineError> {
    let stub_uids = state.stub_author_uids();
    let mut outcome = ReconcileOutcome {
        stubs_examined: stub_uids.len(),
        ..Default::default()
    };
    if stub_uids.is_empty() {
        return Ok(outcome);
    }
    let stub_set: HashSet<ShortUid> = stub_uids.iter().cloned().collect();

    // Every paper with a DOI that credits at least one stub author
    let mut dois: BTreeSet<String> = BTreeSet::new();
    for (paper_uid, author_uid) in state.authorships.keys() {
        if stub_set.contains(author_uid) {
            if let Some(doi) = state.index.value_for(IdNamespace::Doi, paper_uid) {
                dois.insert(doi);
            }
        }
    }
    if dois.is_empty() {
        return Ok(outcome);
    }

    let dois: Vec<String> = dois.into_iter().collect();
    let records = primary
        .fetch_by_doi_batch(&dois, FieldSet::AuthorReconciliation)
        .await?;

    // Best accepted candidate per stub, then grouped by primary author id
    let mut best: BTreeMap<ShortUid, (f64, String, AuthorRecord)> = BTreeMap::new();
    for record in &records {
        let Some(doi) = record.doi.as_deref() else {
            continue;
        };
        let Some(paper_uid) = state.index.find(IdNamespace::Doi, doi).cloned() else {
            continue;
        };
        let credited: Vec<ShortUid> = state
            .authorships
            .range((paper_uid.clone(), ShortUid::from_string(""))..)
            .take_while(|((paper, _), _)| *paper == paper_uid)
            .map(|((_, author), _)| author.clone())
            .filter(|author| stub_set.contains(author))
            .collect();
        if credited.is_empty() {
            continue;
        }

        for credit in &record.authorships {
            let Some(candidate_id) = credit.author.openalex_author_id.as_deref() else {
                continue;
            };
            for stub_uid in &credited {
                let Some(stub) = state.authors.get(stub_uid) else {
                    continue;
                };
                let score = match_score(&stub.clean_name, &credit.author.display_name, config);
                if score <= config.reconcile_accept_threshold {
                    continue;
                }
                let slot = best
                    .entry(stub_uid.clone())
                    .or_insert((0.0, String::new(), AuthorRecord::default()));
                if score > slot.0 {
                    *slot = (score, candidate_id.to_string(), credit.author.clone());
                }
            }
        }
    }

    // Group stubs by matched primary author id, keeping acceptance order
    let mut groups: BTreeMap<String, (AuthorRecord, Vec<ShortUid>)> = BTreeMap::new();
    for (stub_uid, (_, candidate_id, candidate)) in best {
        groups
            .entry(candidate_id)
            .or_insert_with(|| (candidate, Vec::new()))
            .1
            .push(stub_uid);
    }

    let mut merges: Vec<AuthorMerge> = Vec::new();
    for (candidate_id, (candidate, stubs)) in groups {
        let existing = state
            .index
            .find(IdNamespace::OpenAlexAuthor, &candidate_id)
            .cloned();

        let (winner_uid, losers) = match existing {
            // The identity is already canonical; every matched stub loses
            Some(winner) => (winner, stubs),
            None => {
                let mut iter = stubs.into_iter();
                let Some(winner) = iter.next() else {
                    continue;
                };
                (winner, iter.collect())
            }
        };

        if let Some(winner) = state.authors.get_mut(&winner_uid) {
            let name = candidate.display_name.trim();
            if winner.is_stub && !name.is_empty() {
                winner.clean_name = name.to_string();
            }
            if winner.orcid.is_none() {
                winner.orcid = candidate.orcid.clone();
            }
            winner.is_stub = false;
        }
        state.record_external_id(sink, IdNamespace::OpenAlexAuthor, &candidate_id, &winner_uid);
        if let Some(orcid) = candidate.orcid.as_deref() {
            state.record_external_id(sink, IdNamespace::Orcid, orcid, &winner_uid);
        }

        let mut loser_uids = Vec::new();
        for loser in losers {
            if loser == winner_uid {
                continue;
            }
            repoint_authorships(state, &loser, &winner_uid);
            state.index.repoint(&loser, &winner_uid);
            state.authors.remove(&loser);
            outcome.stubs_merged += 1;
            loser_uids.push(loser);
        }

        if let Some(winner) = state.authors.get(&winner_uid) {
            merges.push(AuthorMerge {
                winner: winner.clone(),
                loser_uids,
            });
        }
    }

    if !merges.is_empty() {
        tracing::info!(
            merged = outcome.stubs_merged,
            groups = merges.len(),
            "reconciled stub authors"
        );
        sink.emit(GraphEvent::AuthorsMerged { merges });
    }

    Ok(outcome)
}

/// Move every authorship credited to `from` onto `to`, keeping position and
/// institution data; drops the credit when `to` already holds one on the
/// same paper.
fn repoint_authorships(state: &mut GraphState, from: &ShortUid, to: &ShortUid) {
    let stale: Vec<(ShortUid, ShortUid)> = state
        .authorships
        .keys()
        .filter(|(_, author)| author == from)
        .cloned()
        .collect();
    for key in stale {
        if let Some(mut authorship) = state.authorships.remove(&key) {
            authorship.author_short_uid = to.clone();
            state
                .authorships
                .entry(authorship.key())
                .or_insert(authorship);
        }
    }
}
