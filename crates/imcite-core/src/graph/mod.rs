//! In-memory graph state: entity maps, identifier index, entity processors

mod index;
mod ingest;
mod state;

pub use index::ExternalIdIndex;
pub use ingest::{ingest_author, ingest_institution, ingest_paper};
pub use state::{EntityCounts, GraphState};
