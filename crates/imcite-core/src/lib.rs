//! imcite-core: graph assembly engine for the imcite citation explorer
//!
//! Ingests a seed "master paper" and incrementally assembles a deduplicated
//! citation graph from two independent bibliographic providers:
//! - Typed source adapters with pagination, chunking, and field selection
//! - A resilient fetch primitive (bounded backoff, 404-as-empty)
//! - An external identifier index as the sole deduplication oracle
//! - Entity processors with monotonic field merging
//! - A phased enrichment pipeline with fuzzy author reconciliation
//! - A coalescing delta stream consumers can fold into a graph mirror
//!
//! The engine holds one session's graph in memory; persistence is the
//! consumer's concern, via the tabular [`export::Snapshot`].

pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod http;
pub mod reconcile;
pub mod session;
pub mod sources;
pub mod stream;

pub use config::EngineConfig;
pub use error::EngineError;
pub use export::Snapshot;
pub use graph::{EntityCounts, ExternalIdIndex, GraphState};
pub use http::{FetchError, ResilientClient};
pub use session::{GraphSession, SessionPhase};
pub use sources::{
    FieldSet, OpenAlexClient, PrimarySource, SecondarySource, SemanticScholarClient, SourceError,
};
pub use stream::{EventSink, GraphEvent, GraphMirror, StreamMessage};
