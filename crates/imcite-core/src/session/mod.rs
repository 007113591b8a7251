//! Enrichment orchestrator.
//!
//! A phase state machine that drives the entity processors, relationship
//! builder, and reconciliation pass in strict sequence while streaming
//! entity deltas to the consumer. Phases never mutate state concurrently;
//! within a phase the adapters issue as many network requests as their
//! pagination and chunking require.
//!
//! Soft phases catch their own failures and let the pipeline continue with
//! partial data. Genuinely fatal failures (a non-retryable status or an
//! exhausted retry budget) terminate the session in the error state.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::export::Snapshot;
use crate::graph::{ingest_paper, GraphState};
use crate::reconcile::reconcile_stub_authors;
use crate::sources::{FieldSet, PrimarySource, SecondarySource};
use crate::stream::{spawn_flusher, EventSink, GraphEvent, StreamMessage, event_channel};
use imcite_domain::{
    IdNamespace, PaperRecord, PaperRelationship, RelationshipTag, ShortUid,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Lifecycle of a graph session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    /// Seed, first-degree expansion, stub promotion, cross-provider merge
    Loading,
    /// Master hydration and author reconciliation
    Enriching,
    Active,
    /// Second-degree expansion and stub hydration, on explicit trigger
    Extending,
    /// Terminal; only a reset leaves it
    Error,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Loading => "loading",
            SessionPhase::Enriching => "enriching",
            SessionPhase::Active => "active",
            SessionPhase::Extending => "extending",
            SessionPhase::Error => "error",
        }
    }
}

/// One analysis session over a master paper.
///
/// Owns the graph state; every phase function takes it explicitly, so
/// multiple sessions can coexist in one process.
pub struct GraphSession<P, S> {
    primary: P,
    secondary: S,
    config: EngineConfig,
    state: GraphState,
    phase: SessionPhase,
    sink: EventSink,
    flusher: JoinHandle<()>,
}

impl<P: PrimarySource, S: SecondarySource> GraphSession<P, S> {
    /// Build a session and its consumer stream. Must be called within a
    /// tokio runtime; the delta flusher is spawned immediately.
    pub fn new(
        primary: P,
        secondary: S,
        config: EngineConfig,
    ) -> (Self, mpsc::UnboundedReceiver<StreamMessage>) {
        let (sink, items) = event_channel();
        let (out, messages) = mpsc::unbounded_channel();
        let flusher = spawn_flusher(
            items,
            out,
            Duration::from_millis(config.flush_interval_ms.max(1)),
        );
        sink.control(StreamMessage::Reset);
        let session = Self {
            primary,
            secondary,
            config,
            state: GraphState::new(),
            phase: SessionPhase::Idle,
            sink,
            flusher,
        };
        (session, messages)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn state(&self) -> &GraphState {
        &self.state
    }

    /// Point-in-time snapshot for the export layer
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_state(&self.state)
    }

    /// Ranked master-paper candidates for a title query
    pub async fn search_master(&self, query: &str) -> Result<Vec<PaperRecord>, EngineError> {
        Ok(self
            .primary
            .search_by_title(query, self.config.search_result_limit)
            .await?)
    }

    /// Discard all session data and return to idle
    pub fn reset(&mut self) {
        self.state = GraphState::new();
        self.phase = SessionPhase::Idle;
        self.send(StreamMessage::Reset);
    }

    /// Drop the event side and wait for the final delta flush
    pub async fn shutdown(self) {
        let GraphSession { sink, flusher, .. } = self;
        drop(sink);
        let _ = flusher.await;
    }

    /// Run the loading and enriching phases for the given master paper.
    ///
    /// Returns once the session is active; background-quality phases have
    /// already run, in order, with their failures degraded where allowed.
    pub async fn load(&mut self, master_id: &str) -> Result<(), EngineError> {
        self.set_phase(SessionPhase::Loading);

        // Seed. Nothing can proceed without the master paper, so every
        // failure here ends the session.
        let master_record = match self.primary.fetch_by_id(master_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return self.fail(EngineError::MasterNotFound(master_id.to_string())),
            Err(err) => return self.fail(err.into()),
        };
        let master_uid = ingest_paper(&mut self.state, &self.sink, &master_record, false);
        self.state.master_paper = Some(master_uid.clone());

        let (reference_counts, related_counts) = match self.first_degree(&master_uid).await {
            Ok(counts) => counts,
            Err(err) => {
                self.degrade_or_fail("first_degree", err)?;
                (BTreeMap::new(), BTreeMap::new())
            }
        };

        if let Err(err) = self
            .promote_shared_works(&master_uid, reference_counts, related_counts)
            .await
        {
            self.degrade_or_fail("stub_promotion", err)?;
        }

        if let Err(err) = self.cross_provider(&master_uid).await {
            self.degrade_or_fail("cross_provider", err)?;
        }

        self.set_phase(SessionPhase::Enriching);

        if let Err(err) = self.hydrate_master(&master_uid).await {
            self.degrade_or_fail("master_hydration", err)?;
        }

        let reconciled =
            reconcile_stub_authors(&mut self.state, &self.sink, &self.primary, &self.config)
                .await;
        if let Err(err) = reconciled {
            self.degrade_or_fail("author_reconciliation", err)?;
        }

        self.set_phase(SessionPhase::Active);
        self.send(StreamMessage::Completed);
        Ok(())
    }

    /// Second-degree extension plus stub hydration. Only valid while
    /// active; re-entrant, and each run works from the then-current state.
    pub async fn extend(&mut self) -> Result<(), EngineError> {
        if self.phase != SessionPhase::Active {
            return Err(EngineError::NotActive(self.phase.as_str()));
        }
        self.set_phase(SessionPhase::Extending);

        if let Err(err) = self.second_degree().await {
            self.degrade_or_fail("second_degree", err)?;
        }
        if let Err(err) = self.hydrate_stubs().await {
            self.degrade_or_fail("stub_hydration", err)?;
        }

        self.set_phase(SessionPhase::Active);
        self.send(StreamMessage::Completed);
        Ok(())
    }

    // ----- phases -----

    /// Fetch works citing the master, ingest each as a full first-degree
    /// paper, and count how often their references and related works recur.
    async fn first_degree(
        &mut self,
        master_uid: &ShortUid,
    ) -> Result<(BTreeMap<String, usize>, BTreeMap<String, usize>), EngineError> {
        let mut reference_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut related_counts: BTreeMap<String, usize> = BTreeMap::new();

        let Some(master_id) = self.state.index.value_for(IdNamespace::OpenAlex, master_uid)
        else {
            return Ok((reference_counts, related_counts));
        };

        let batch = self
            .primary
            .fetch_citing_works(
                &[master_id.clone()],
                FieldSet::FullIngestion,
                self.config.citation_page_cap,
            )
            .await?;
        let total = batch.records.len() as u64;

        for record in &batch.records {
            let uid = ingest_paper(&mut self.state, &self.sink, record, false);
            if uid == *master_uid {
                continue;
            }
            self.tag_paper(&uid, RelationshipTag::FirstDegree);
            self.state.add_relationship(
                &self.sink,
                PaperRelationship::cites(uid, master_uid.clone()),
            );

            for referenced in &record.referenced_works {
                if *referenced != master_id {
                    *reference_counts.entry(referenced.clone()).or_default() += 1;
                }
            }
            for related in &record.related_works {
                if *related != master_id {
                    *related_counts.entry(related.clone()).or_default() += 1;
                }
            }
        }

        tracing::info!(citing = total, "first-degree expansion complete");
        self.progress("first_degree", total, Some(total));
        Ok((reference_counts, related_counts))
    }

    /// Promote references and related works shared by enough first-degree
    /// papers into stub entities linked to the master. Works below the
    /// threshold are discarded.
    async fn promote_shared_works(
        &mut self,
        master_uid: &ShortUid,
        reference_counts: BTreeMap<String, usize>,
        related_counts: BTreeMap<String, usize>,
    ) -> Result<(), EngineError> {
        let threshold = self.config.stub_creation_threshold.max(1);
        let shared_references: Vec<String> = reference_counts
            .into_iter()
            .filter(|(_, count)| *count >= threshold)
            .map(|(id, _)| id)
            .collect();
        let shared_related: Vec<String> = related_counts
            .into_iter()
            .filter(|(_, count)| *count >= threshold)
            .map(|(id, _)| id)
            .collect();

        let mut created = 0u64;
        created += self
            .create_linked_stubs(
                master_uid,
                &shared_references,
                RelationshipTag::ReferencedByFirstDegree,
            )
            .await?;
        created += self
            .create_linked_stubs(master_uid, &shared_related, RelationshipTag::Similar)
            .await?;

        self.progress("stub_promotion", created, None);
        Ok(())
    }

    async fn create_linked_stubs(
        &mut self,
        master_uid: &ShortUid,
        ids: &[String],
        tag: RelationshipTag,
    ) -> Result<u64, EngineError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let records = self
            .primary
            .fetch_by_id_batch(ids, FieldSet::StubCreation)
            .await?;
        let mut created = 0;
        for record in &records {
            let uid = ingest_paper(&mut self.state, &self.sink, record, true);
            if uid == *master_uid {
                continue;
            }
            self.tag_paper(&uid, tag);
            self.state.add_relationship(
                &self.sink,
                PaperRelationship::similar(master_uid.clone(), uid, tag),
            );
            created += 1;
        }
        Ok(created)
    }

    /// Merge the secondary provider's view of the master's citations and
    /// references. Results match the index by DOI first, then by the
    /// secondary paper id; unmatched results become new stubs.
    async fn cross_provider(&mut self, master_uid: &ShortUid) -> Result<(), EngineError> {
        let Some(doi) = self.state.index.value_for(IdNamespace::Doi, master_uid) else {
            return Ok(());
        };
        let Some(links) = self.secondary.fetch_by_doi(&doi).await? else {
            return Ok(());
        };
        let total = (links.citations.len() + links.references.len()) as u64;

        for record in &links.citations {
            let uid = ingest_paper(&mut self.state, &self.sink, record, true);
            if uid == *master_uid {
                continue;
            }
            self.tag_paper(&uid, RelationshipTag::FirstDegree);
            self.state.add_relationship(
                &self.sink,
                PaperRelationship::cites(uid, master_uid.clone()),
            );
        }
        for record in &links.references {
            let uid = ingest_paper(&mut self.state, &self.sink, record, true);
            if uid == *master_uid {
                continue;
            }
            self.state.add_relationship(
                &self.sink,
                PaperRelationship::cites(master_uid.clone(), uid),
            );
        }

        tracing::info!(merged = total, "cross-provider enrichment complete");
        self.progress("cross_provider", total, Some(total));
        Ok(())
    }

    /// Re-fetch the master's full record; covers fields the seed call could
    /// not supply.
    async fn hydrate_master(&mut self, master_uid: &ShortUid) -> Result<(), EngineError> {
        let Some(master_id) = self.state.index.value_for(IdNamespace::OpenAlex, master_uid)
        else {
            return Ok(());
        };
        if let Some(record) = self.primary.fetch_by_id(&master_id).await? {
            ingest_paper(&mut self.state, &self.sink, &record, false);
        }
        Ok(())
    }

    /// Batch-fetch works citing the first-degree set. New results become
    /// full second-degree papers; an edge back to a first-degree paper is
    /// added only when the result's own reference list confirms it.
    async fn second_degree(&mut self) -> Result<(), EngineError> {
        let Some(master_uid) = self.state.master_paper.clone() else {
            return Ok(());
        };

        // Provider-native ids of the first-degree set
        let mut id_to_uid: HashMap<String, ShortUid> = HashMap::new();
        for paper in self.state.papers.values() {
            if paper.short_uid != master_uid
                && paper
                    .relationship_tags
                    .contains(&RelationshipTag::FirstDegree)
            {
                if let Some(id) = self
                    .state
                    .index
                    .value_for(IdNamespace::OpenAlex, &paper.short_uid)
                {
                    id_to_uid.insert(id, paper.short_uid.clone());
                }
            }
        }
        if id_to_uid.is_empty() {
            return Ok(());
        }
        let mut ids: Vec<String> = id_to_uid.keys().cloned().collect();
        ids.sort();

        let batch = self
            .primary
            .fetch_citing_works(&ids, FieldSet::FullIngestion, self.config.citation_page_cap)
            .await?;
        let total = batch.records.len() as u64;

        for record in &batch.records {
            let uid = ingest_paper(&mut self.state, &self.sink, record, false);
            if uid == master_uid {
                continue;
            }
            let already_first_degree = self
                .state
                .papers
                .get(&uid)
                .map(|p| {
                    p.relationship_tags
                        .contains(&RelationshipTag::FirstDegree)
                })
                .unwrap_or(false);
            if !already_first_degree {
                self.tag_paper(&uid, RelationshipTag::SecondDegree);
            }

            // Confirmed edges only: the result must itself list the
            // first-degree paper among its references
            for referenced in &record.referenced_works {
                if let Some(target) = id_to_uid.get(referenced) {
                    if *target != uid {
                        self.state.add_relationship(
                            &self.sink,
                            PaperRelationship::cites(uid.clone(), target.clone()),
                        );
                    }
                }
            }
        }

        tracing::info!(results = total, "second-degree extension complete");
        self.progress("second_degree", total, Some(total));
        Ok(())
    }

    /// Batch-fetch full records for every remaining stub paper, promoting
    /// each and attaching its authorships. Stubs with neither a primary id
    /// nor a DOI stay stubs.
    async fn hydrate_stubs(&mut self) -> Result<(), EngineError> {
        let stubs = self.state.stub_paper_uids();
        if stubs.is_empty() {
            return Ok(());
        }

        let mut ids = Vec::new();
        let mut dois = Vec::new();
        for uid in &stubs {
            if let Some(id) = self.state.index.value_for(IdNamespace::OpenAlex, uid) {
                ids.push(id);
            } else if let Some(doi) = self.state.index.value_for(IdNamespace::Doi, uid) {
                dois.push(doi);
            }
        }

        let mut hydrated = 0u64;
        if !ids.is_empty() {
            let records = self
                .primary
                .fetch_by_id_batch(&ids, FieldSet::FullIngestion)
                .await?;
            hydrated += records.len() as u64;
            for record in &records {
                ingest_paper(&mut self.state, &self.sink, record, false);
            }
        }
        if !dois.is_empty() {
            let records = self
                .primary
                .fetch_by_doi_batch(&dois, FieldSet::FullIngestion)
                .await?;
            hydrated += records.len() as u64;
            for record in &records {
                ingest_paper(&mut self.state, &self.sink, record, false);
            }
        }

        let remaining = self.state.stub_paper_uids().len();
        if remaining > 0 {
            tracing::info!(remaining, "stubs without a resolvable identifier remain");
        }
        self.progress("stub_hydration", hydrated, Some(stubs.len() as u64));
        Ok(())
    }

    // ----- plumbing -----

    fn send(&self, message: StreamMessage) {
        self.sink.control(message);
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.send(StreamMessage::Phase { phase });
    }

    fn progress(&self, stage: &str, completed: u64, total: Option<u64>) {
        self.send(StreamMessage::Progress {
            stage: stage.to_string(),
            completed,
            total,
        });
    }

    fn tag_paper(&mut self, uid: &ShortUid, tag: RelationshipTag) {
        if let Some(paper) = self.state.papers.get_mut(uid) {
            if paper.tag(tag) {
                self.sink.emit(GraphEvent::PaperUpdated {
                    paper: paper.clone(),
                });
            }
        }
    }

    /// Enter the terminal error state and surface the message
    fn fail(&mut self, err: EngineError) -> Result<(), EngineError> {
        tracing::error!(error = %err, "session failed");
        self.phase = SessionPhase::Error;
        self.send(StreamMessage::Phase {
            phase: SessionPhase::Error,
        });
        self.send(StreamMessage::FatalError {
            message: err.to_string(),
        });
        Err(err)
    }

    /// Soft phases log and continue; fatal errors still end the session
    fn degrade_or_fail(&mut self, stage: &'static str, err: EngineError) -> Result<(), EngineError> {
        if err.is_fatal() {
            self.fail(err)
        } else {
            tracing::warn!(stage, error = %err, "phase degraded, continuing with partial data");
            Ok(())
        }
    }
}
