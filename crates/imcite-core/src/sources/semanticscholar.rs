//! Semantic Scholar source adapter (secondary provider)
//!
//! API docs: https://api.semanticscholar.org/api-docs/graph
//! Rate limit: 1 request/second unauthenticated, shared pool.
//!
//! Authors arrive as plain names with no cross-provider identifier; the
//! records this adapter produces therefore yield stub authors that the
//! reconciliation pass later merges into canonical identities.

use super::traits::{SecondaryLinks, SecondarySource, SourceError, SourceMetadata};
use crate::http::ResilientClient;
use async_trait::async_trait;
use imcite_domain::{ids, AuthorRecord, AuthorshipRecord, PaperRecord};
use serde::Deserialize;

/// Documented maximum page size for citation/reference listings
const PAGE_LIMIT: usize = 500;

const LINK_FIELDS: &str = "paperId,corpusId,externalIds,title,year,venue,publicationDate,authors";

/// Paged listing from the citations/references endpoints
#[derive(Debug, Deserialize)]
struct S2LinkResponse {
    next: Option<u64>,
    data: Vec<S2LinkEntry>,
}

#[derive(Debug, Deserialize)]
struct S2LinkEntry {
    #[serde(rename = "citingPaper")]
    citing_paper: Option<S2Paper>,
    #[serde(rename = "citedPaper")]
    cited_paper: Option<S2Paper>,
}

#[derive(Debug, Deserialize)]
struct S2Paper {
    #[serde(rename = "paperId")]
    paper_id: Option<String>,
    #[serde(rename = "corpusId")]
    corpus_id: Option<i64>,
    #[serde(rename = "externalIds")]
    external_ids: Option<S2ExternalIds>,
    title: Option<String>,
    year: Option<i32>,
    venue: Option<String>,
    #[serde(rename = "publicationDate")]
    publication_date: Option<String>,
    authors: Option<Vec<S2Author>>,
}

#[derive(Debug, Deserialize)]
struct S2ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "CorpusId")]
    corpus_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct S2Author {
    #[serde(rename = "authorId")]
    author_id: Option<String>,
    name: Option<String>,
}

/// Map a paper payload to the canonical record shape
fn paper_to_record(paper: S2Paper) -> PaperRecord {
    let doi = paper
        .external_ids
        .as_ref()
        .and_then(|ids| ids.doi.as_deref())
        .and_then(ids::normalize_doi);
    let corpus_id = paper
        .corpus_id
        .or_else(|| paper.external_ids.as_ref().and_then(|ids| ids.corpus_id))
        .map(|id| id.to_string());

    let authorships: Vec<AuthorshipRecord> = paper
        .authors
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(position, author)| {
            let name = author.name?;
            if name.trim().is_empty() {
                return None;
            }
            Some(AuthorshipRecord {
                author: AuthorRecord {
                    openalex_author_id: None,
                    s2_author_id: author.author_id,
                    orcid: None,
                    display_name: name.clone(),
                },
                position: position as u32,
                is_corresponding: false,
                raw_author_name: Some(name),
                institutions: Vec::new(),
            })
        })
        .collect();

    PaperRecord {
        openalex_id: None,
        doi,
        s2_paper_id: paper.paper_id,
        s2_corpus_id: corpus_id,
        title: paper.title.filter(|t| !t.trim().is_empty()),
        publication_year: paper.year,
        publication_date: paper.publication_date,
        location: paper.venue.filter(|v| !v.trim().is_empty()),
        authorships,
        ..Default::default()
    }
}

pub struct SemanticScholarClient {
    http: ResilientClient,
    base_url: String,
    page_cap: usize,
}

impl SemanticScholarClient {
    pub fn new(http: ResilientClient) -> Self {
        Self {
            http,
            base_url: "https://api.semanticscholar.org/graph/v1".to_string(),
            page_cap: 4,
        }
    }

    /// Client wired from the engine configuration
    pub fn from_config(config: &crate::config::EngineConfig) -> Self {
        let http = ResilientClient::new(
            "imcite/0.1 (https://github.com/yipihey/imcite)",
            config.max_fetch_attempts,
        );
        Self::new(http).with_page_cap(config.secondary_page_cap)
    }

    /// Override the API root (tests, mirrors)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the per-listing page cap
    pub fn with_page_cap(mut self, page_cap: usize) -> Self {
        self.page_cap = page_cap.max(1);
        self
    }

    pub fn metadata() -> SourceMetadata {
        SourceMetadata {
            id: "semanticscholar",
            name: "Semantic Scholar",
            description: "Citation graph and paper metadata from the Allen Institute for AI",
            base_url: "https://api.semanticscholar.org",
            rate_limit_per_second: 1.0,
            max_ids_per_batch: 1,
            max_page_size: PAGE_LIMIT,
        }
    }

    fn parse_links(json: &str) -> Result<S2LinkResponse, SourceError> {
        serde_json::from_str(json)
            .map_err(|e| SourceError::Parse(format!("invalid Semantic Scholar JSON: {}", e)))
    }

    /// Fetch one link listing (`citations` or `references`) for a DOI,
    /// paginating up to `page_cap` pages. `None` when the work is unknown.
    async fn fetch_links(
        &self,
        doi: &str,
        endpoint: &str,
        page_cap: usize,
    ) -> Result<Option<Vec<PaperRecord>>, SourceError> {
        let mut records = Vec::new();
        let mut offset: u64 = 0;
        let mut pages = 0usize;

        loop {
            let url = format!(
                "{}/paper/DOI:{}/{}?fields={}&offset={}&limit={}",
                self.base_url,
                urlencoding::encode(doi),
                endpoint,
                LINK_FIELDS,
                offset,
                PAGE_LIMIT
            );
            let Some(body) = self.http.get(&url).await? else {
                // Unknown DOI: the first page 404s; a later page cannot
                return if pages == 0 { Ok(None) } else { Ok(Some(records)) };
            };
            let response = Self::parse_links(&body)?;
            records.extend(
                response
                    .data
                    .into_iter()
                    .filter_map(|entry| entry.citing_paper.or(entry.cited_paper))
                    .map(paper_to_record),
            );
            pages += 1;

            match response.next {
                Some(next) if next > offset => {
                    if pages >= page_cap {
                        tracing::warn!(
                            doi,
                            endpoint,
                            pages,
                            fetched = records.len(),
                            "page cap reached, proceeding with partial listing"
                        );
                        return Ok(Some(records));
                    }
                    offset = next;
                }
                _ => return Ok(Some(records)),
            }
        }
    }

}

#[async_trait]
impl SecondarySource for SemanticScholarClient {
    /// Citations and references are independent listings and fetch
    /// concurrently.
    async fn fetch_by_doi(&self, doi: &str) -> Result<Option<SecondaryLinks>, SourceError> {
        let (citations, references) = tokio::join!(
            self.fetch_links(doi, "citations", self.page_cap),
            self.fetch_links(doi, "references", self.page_cap),
        );
        match (citations?, references?) {
            (None, None) => Ok(None),
            (citations, references) => Ok(Some(SecondaryLinks {
                citations: citations.unwrap_or_default(),
                references: references.unwrap_or_default(),
            })),
        }
    }
}
