//! Event and message types for the consumer stream

use crate::session::SessionPhase;
use imcite_domain::{
    Author, Authorship, IdNamespace, Institution, Paper, PaperRelationship, ShortUid,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One author merge performed by reconciliation: the winner in its final
/// form plus every absorbed stub uid
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorMerge {
    pub winner: Author,
    pub loser_uids: Vec<ShortUid>,
}

/// A single graph mutation.
///
/// Added/updated events carry the full entity so observers can mirror the
/// graph without re-fetching.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphEvent {
    PaperAdded { paper: Paper },
    PaperUpdated { paper: Paper },
    AuthorAdded { author: Author },
    AuthorUpdated { author: Author },
    InstitutionAdded { institution: Institution },
    AuthorshipAdded { authorship: Authorship },
    RelationshipAdded { relationship: PaperRelationship },
    ExternalIdSet {
        namespace: IdNamespace,
        value: String,
        short_uid: ShortUid,
    },
    AuthorsMerged { merges: Vec<AuthorMerge> },
}

/// Ordered message sequence delivered to the consumer
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Discard any mirrored state; a new session begins
    Reset,
    /// A coalesced batch of entity mutations
    Delta { events: Vec<GraphEvent> },
    /// Phase transition, sent without waiting for the flush interval
    Phase { phase: SessionPhase },
    /// Progress within a phase, sent without waiting for the flush interval
    Progress {
        stage: String,
        completed: u64,
        total: Option<u64>,
    },
    /// Terminal failure; the session is dead
    FatalError { message: String },
    /// A load or extend run finished
    Completed,
}

/// Engine-side item: entity deltas are coalesced by the flusher, control
/// messages flush whatever is buffered and pass straight through, so the
/// consumer sees everything in emission order.
#[derive(Clone, Debug)]
pub enum StreamItem {
    Event(GraphEvent),
    Control(StreamMessage),
}

/// Synchronous, non-blocking emitter handed to the entity processors
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<StreamItem>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<StreamItem>) -> Self {
        Self { tx }
    }

    /// Emit an entity mutation. A closed channel means the consumer is
    /// gone; the mutation itself already happened, so the event is dropped.
    pub fn emit(&self, event: GraphEvent) {
        let _ = self.tx.send(StreamItem::Event(event));
    }

    /// Send a control message that bypasses delta coalescing
    pub fn control(&self, message: StreamMessage) {
        let _ = self.tx.send(StreamItem::Control(message));
    }
}

/// Build a sink/receiver pair
pub fn event_channel() -> (EventSink, mpsc::UnboundedReceiver<StreamItem>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink::new(tx), rx)
}
