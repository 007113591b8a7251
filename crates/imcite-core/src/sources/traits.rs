//! Common traits and result shapes for source adapters

use crate::http::FetchError;
use async_trait::async_trait;
use imcite_domain::PaperRecord;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("parse error: {0}")]
    Parse(String),
}

impl SourceError {
    /// Parse failures degrade the phase; fetch failures follow the HTTP
    /// layer's classification.
    pub fn is_fatal(&self) -> bool {
        match self {
            SourceError::Fetch(fetch) => fetch.is_fatal(),
            SourceError::Parse(_) => false,
        }
    }
}

/// Metadata about a source
pub struct SourceMetadata {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub base_url: &'static str,
    pub rate_limit_per_second: f32,
    /// Documented maximum ids per batched filter request
    pub max_ids_per_batch: usize,
    /// Documented maximum results per page
    pub max_page_size: usize,
}

/// Field selections for primary-provider requests.
///
/// Lightweight selections deliberately omit authorships so discovery calls
/// never attach author credits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldSet {
    SearchPreview,
    FullIngestion,
    AuthorReconciliation,
    StubCreation,
}

/// Result of a citing-works crawl; `truncated` is set when a page cap cut
/// the listing short
#[derive(Debug, Default)]
pub struct CitingBatch {
    pub records: Vec<PaperRecord>,
    pub truncated: bool,
}

/// Citation neighborhood of one work as seen by the secondary provider
#[derive(Debug, Default)]
pub struct SecondaryLinks {
    pub citations: Vec<PaperRecord>,
    pub references: Vec<PaperRecord>,
}

/// Primary bibliographic provider.
///
/// Implementations hide pagination, chunking, and field selection behind a
/// uniform record shape.
#[async_trait]
pub trait PrimarySource: Send + Sync {
    /// Ranked candidates for a title query
    async fn search_by_title(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PaperRecord>, SourceError>;

    /// Full record by provider-native id; `None` on 404
    async fn fetch_by_id(&self, id: &str) -> Result<Option<PaperRecord>, SourceError>;

    /// Works citing any of `ids`, chunked to the provider's per-request id
    /// limit and paginated up to `page_cap` pages per chunk
    async fn fetch_citing_works(
        &self,
        ids: &[String],
        field_set: FieldSet,
        page_cap: usize,
    ) -> Result<CitingBatch, SourceError>;

    /// Batched lookup by provider-native ids
    async fn fetch_by_id_batch(
        &self,
        ids: &[String],
        field_set: FieldSet,
    ) -> Result<Vec<PaperRecord>, SourceError>;

    /// Batched lookup by DOI
    async fn fetch_by_doi_batch(
        &self,
        dois: &[String],
        field_set: FieldSet,
    ) -> Result<Vec<PaperRecord>, SourceError>;
}

/// Secondary bibliographic provider
#[async_trait]
pub trait SecondarySource: Send + Sync {
    /// Citations and references of the work with this DOI; `None` on 404
    async fn fetch_by_doi(&self, doi: &str) -> Result<Option<SecondaryLinks>, SourceError>;
}
