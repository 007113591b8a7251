//! Source adapters for the two bibliographic providers

pub mod openalex;
pub mod semanticscholar;
pub mod traits;

pub use openalex::OpenAlexClient;
pub use semanticscholar::SemanticScholarClient;
pub use traits::{
    CitingBatch, FieldSet, PrimarySource, SecondaryLinks, SecondarySource, SourceError,
    SourceMetadata,
};
