//! OpenAlex source adapter (primary provider)
//!
//! API docs: https://docs.openalex.org/
//! Rate limit: 10 requests/second, 100k requests/day; a `mailto` parameter
//! routes requests through the polite pool.

use super::traits::{
    CitingBatch, FieldSet, PrimarySource, SourceError, SourceMetadata,
};
use crate::http::ResilientClient;
use async_trait::async_trait;
use imcite_domain::{
    ids, AuthorRecord, AuthorshipRecord, InstitutionRecord, OpenAccessStatus, PaperRecord,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Documented maximum values per pipe-joined filter
const MAX_IDS_PER_FILTER: usize = 50;
/// Documented maximum page size
const PER_PAGE: usize = 200;

/// List response wrapper
#[derive(Debug, Deserialize)]
struct OpenAlexListResponse {
    meta: Option<OpenAlexMeta>,
    results: Vec<OpenAlexWork>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexMeta {
    next_cursor: Option<String>,
}

/// Single work from the works endpoint
#[derive(Debug, Deserialize)]
struct OpenAlexWork {
    id: Option<String>,
    doi: Option<String>,
    title: Option<String>,
    display_name: Option<String>,
    publication_year: Option<i32>,
    publication_date: Option<String>,
    language: Option<String>,
    #[serde(rename = "type")]
    work_type: Option<String>,
    fwci: Option<f64>,
    cited_by_count: Option<i64>,
    abstract_inverted_index: Option<HashMap<String, Vec<u32>>>,
    primary_location: Option<OpenAlexLocation>,
    best_oa_location: Option<OpenAlexLocation>,
    open_access: Option<OpenAlexOpenAccess>,
    keywords: Option<Vec<OpenAlexKeyword>>,
    authorships: Option<Vec<OpenAlexAuthorship>>,
    referenced_works: Option<Vec<String>>,
    related_works: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexLocation {
    pdf_url: Option<String>,
    source: Option<OpenAlexVenue>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexVenue {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexOpenAccess {
    oa_status: Option<String>,
    oa_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexKeyword {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexAuthorship {
    author: Option<OpenAlexAuthor>,
    institutions: Option<Vec<OpenAlexInstitution>>,
    is_corresponding: Option<bool>,
    raw_author_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexAuthor {
    id: Option<String>,
    display_name: Option<String>,
    orcid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexInstitution {
    id: Option<String>,
    display_name: Option<String>,
    ror: Option<String>,
    country_code: Option<String>,
    #[serde(rename = "type")]
    institution_type: Option<String>,
}

/// Rebuild abstract text from the word -> positions inverted index
fn reconstruct_abstract(inverted: &HashMap<String, Vec<u32>>) -> Option<String> {
    let mut by_position: BTreeMap<u32, &str> = BTreeMap::new();
    for (word, positions) in inverted {
        for position in positions {
            by_position.insert(*position, word.as_str());
        }
    }
    if by_position.is_empty() {
        return None;
    }
    let words: Vec<&str> = by_position.values().copied().collect();
    Some(words.join(" "))
}

/// Map a work payload to the canonical record shape
fn work_to_record(work: OpenAlexWork) -> PaperRecord {
    let openalex_id = work.id.as_deref().and_then(ids::normalize_openalex_id);
    let doi = work.doi.as_deref().and_then(ids::normalize_doi);

    let title = work
        .title
        .or(work.display_name)
        .filter(|t| !t.trim().is_empty());

    let location = work
        .primary_location
        .as_ref()
        .and_then(|loc| loc.source.as_ref())
        .and_then(|venue| venue.display_name.clone());

    let best_oa_url = work
        .best_oa_location
        .as_ref()
        .and_then(|loc| loc.pdf_url.clone())
        .or_else(|| {
            work.open_access
                .as_ref()
                .and_then(|oa| oa.oa_url.clone())
        });

    let oa_status = work
        .open_access
        .as_ref()
        .and_then(|oa| oa.oa_status.as_deref())
        .map(OpenAccessStatus::parse)
        .unwrap_or_default();

    let keywords: Vec<String> = work
        .keywords
        .unwrap_or_default()
        .into_iter()
        .filter_map(|k| k.display_name)
        .collect();

    let authorships: Vec<AuthorshipRecord> = work
        .authorships
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(position, credit)| {
            let author = credit.author?;
            let display_name = author.display_name.unwrap_or_default();
            if display_name.trim().is_empty() {
                return None;
            }
            let institutions = credit
                .institutions
                .unwrap_or_default()
                .into_iter()
                .filter_map(|inst| {
                    let display_name = inst.display_name?;
                    Some(InstitutionRecord {
                        openalex_institution_id: inst
                            .id
                            .as_deref()
                            .and_then(ids::normalize_openalex_id),
                        ror_id: inst.ror.as_deref().and_then(ids::normalize_ror),
                        display_name,
                        country_code: inst.country_code,
                        institution_type: inst.institution_type,
                    })
                })
                .collect();
            Some(AuthorshipRecord {
                author: AuthorRecord {
                    openalex_author_id: author
                        .id
                        .as_deref()
                        .and_then(ids::normalize_openalex_id),
                    s2_author_id: None,
                    orcid: author.orcid.as_deref().and_then(ids::normalize_orcid),
                    display_name,
                },
                position: position as u32,
                is_corresponding: credit.is_corresponding.unwrap_or(false),
                raw_author_name: credit.raw_author_name,
                institutions,
            })
        })
        .collect();

    let referenced_works: Vec<String> = work
        .referenced_works
        .unwrap_or_default()
        .iter()
        .filter_map(|id| ids::normalize_openalex_id(id))
        .collect();
    let related_works: Vec<String> = work
        .related_works
        .unwrap_or_default()
        .iter()
        .filter_map(|id| ids::normalize_openalex_id(id))
        .collect();

    PaperRecord {
        openalex_id,
        doi,
        s2_paper_id: None,
        s2_corpus_id: None,
        title,
        publication_year: work.publication_year,
        publication_date: work.publication_date,
        location,
        abstract_text: work
            .abstract_inverted_index
            .as_ref()
            .and_then(reconstruct_abstract),
        fwci: work.fwci,
        cited_by_count: work.cited_by_count,
        work_type: work.work_type,
        language: work.language,
        keywords,
        best_oa_url,
        oa_status,
        authorships,
        referenced_works,
        related_works,
    }
}

fn select_fields(field_set: FieldSet) -> &'static str {
    match field_set {
        FieldSet::SearchPreview => {
            "id,doi,title,display_name,publication_year,publication_date,\
             primary_location,cited_by_count,authorships"
        }
        FieldSet::FullIngestion => {
            "id,doi,title,display_name,publication_year,publication_date,language,type,\
             fwci,cited_by_count,abstract_inverted_index,primary_location,\
             best_oa_location,open_access,keywords,authorships,referenced_works,\
             related_works"
        }
        FieldSet::AuthorReconciliation => "id,doi,authorships",
        FieldSet::StubCreation => "id,doi,title,display_name,publication_year,cited_by_count",
    }
}

pub struct OpenAlexClient {
    http: ResilientClient,
    base_url: String,
    mailto: Option<String>,
}

impl OpenAlexClient {
    pub fn new(http: ResilientClient, mailto: Option<String>) -> Self {
        Self {
            http,
            base_url: "https://api.openalex.org".to_string(),
            mailto,
        }
    }

    /// Client wired from the engine configuration
    pub fn from_config(config: &crate::config::EngineConfig) -> Self {
        let http = ResilientClient::new(
            "imcite/0.1 (https://github.com/yipihey/imcite)",
            config.max_fetch_attempts,
        );
        Self::new(http, config.mailto.clone())
    }

    /// Override the API root (tests, mirrors)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn metadata() -> SourceMetadata {
        SourceMetadata {
            id: "openalex",
            name: "OpenAlex",
            description: "Open catalog of scholarly works, authors, and institutions",
            base_url: "https://api.openalex.org",
            rate_limit_per_second: 10.0,
            max_ids_per_batch: MAX_IDS_PER_FILTER,
            max_page_size: PER_PAGE,
        }
    }

    fn works_url(&self, params: &[(&str, &str)]) -> Result<String, SourceError> {
        let base = format!("{}/works", self.base_url);
        let mut pairs: Vec<(&str, &str)> = params.to_vec();
        if let Some(mailto) = self.mailto.as_deref() {
            pairs.push(("mailto", mailto));
        }
        let url = url::Url::parse_with_params(&base, &pairs).map_err(|_| {
            SourceError::Fetch(crate::http::FetchError::InvalidUrl { url: base.clone() })
        })?;
        Ok(url.to_string())
    }

    fn parse_list(json: &str) -> Result<OpenAlexListResponse, SourceError> {
        serde_json::from_str(json)
            .map_err(|e| SourceError::Parse(format!("invalid OpenAlex JSON: {}", e)))
    }

    /// Fetch every page of a filtered works listing, stopping at `page_cap`
    async fn fetch_filtered(
        &self,
        filter: &str,
        field_set: FieldSet,
        page_cap: usize,
    ) -> Result<CitingBatch, SourceError> {
        let per_page = PER_PAGE.to_string();
        let mut cursor = "*".to_string();
        let mut batch = CitingBatch::default();
        let mut pages = 0usize;

        loop {
            let url = self.works_url(&[
                ("filter", filter),
                ("per-page", &per_page),
                ("cursor", &cursor),
                ("select", select_fields(field_set)),
            ])?;
            let Some(body) = self.http.get(&url).await? else {
                // A 404 on a filter listing is an empty result
                return Ok(batch);
            };
            let response = Self::parse_list(&body)?;
            batch
                .records
                .extend(response.results.into_iter().map(work_to_record));
            pages += 1;

            match response.meta.and_then(|m| m.next_cursor) {
                Some(next) if !next.is_empty() => {
                    if pages >= page_cap {
                        tracing::warn!(
                            filter,
                            pages,
                            fetched = batch.records.len(),
                            "page cap reached, proceeding with partial listing"
                        );
                        batch.truncated = true;
                        return Ok(batch);
                    }
                    cursor = next;
                }
                _ => return Ok(batch),
            }
        }
    }

    /// Batched filter lookup over id chunks of at most `MAX_IDS_PER_FILTER`
    async fn fetch_batch_filtered(
        &self,
        key: &str,
        values: &[String],
        field_set: FieldSet,
    ) -> Result<Vec<PaperRecord>, SourceError> {
        let mut records = Vec::new();
        for chunk in values.chunks(MAX_IDS_PER_FILTER) {
            let filter = format!("{}:{}", key, chunk.join("|"));
            // One page fits a full chunk; a second covers filters that
            // match more works than ids (nothing in practice)
            let batch = self.fetch_filtered(&filter, field_set, 2).await?;
            records.extend(batch.records);
        }
        Ok(records)
    }
}

#[async_trait]
impl PrimarySource for OpenAlexClient {
    async fn search_by_title(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PaperRecord>, SourceError> {
        let per_page = limit.clamp(1, PER_PAGE).to_string();
        let url = self.works_url(&[
            ("search", query),
            ("per-page", &per_page),
            ("select", select_fields(FieldSet::SearchPreview)),
        ])?;
        let Some(body) = self.http.get(&url).await? else {
            return Ok(Vec::new());
        };
        let response = Self::parse_list(&body)?;
        Ok(response.results.into_iter().map(work_to_record).collect())
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<PaperRecord>, SourceError> {
        let bare = ids::normalize_openalex_id(id).unwrap_or_else(|| id.to_string());
        let base = format!("{}/works/{}", self.base_url, bare);
        let mut pairs: Vec<(&str, &str)> =
            vec![("select", select_fields(FieldSet::FullIngestion))];
        if let Some(mailto) = self.mailto.as_deref() {
            pairs.push(("mailto", mailto));
        }
        let url = url::Url::parse_with_params(&base, &pairs).map_err(|_| {
            SourceError::Fetch(crate::http::FetchError::InvalidUrl { url: base.clone() })
        })?;

        let Some(body) = self.http.get(url.as_str()).await? else {
            return Ok(None);
        };
        let work: OpenAlexWork = serde_json::from_str(&body)
            .map_err(|e| SourceError::Parse(format!("invalid OpenAlex JSON: {}", e)))?;
        Ok(Some(work_to_record(work)))
    }

    async fn fetch_citing_works(
        &self,
        ids: &[String],
        field_set: FieldSet,
        page_cap: usize,
    ) -> Result<CitingBatch, SourceError> {
        let mut combined = CitingBatch::default();
        for chunk in ids.chunks(MAX_IDS_PER_FILTER) {
            let filter = format!("cites:{}", chunk.join("|"));
            let batch = self.fetch_filtered(&filter, field_set, page_cap).await?;
            combined.truncated |= batch.truncated;
            combined.records.extend(batch.records);
        }
        Ok(combined)
    }

    async fn fetch_by_id_batch(
        &self,
        ids: &[String],
        field_set: FieldSet,
    ) -> Result<Vec<PaperRecord>, SourceError> {
        self.fetch_batch_filtered("openalex_id", ids, field_set)
            .await
    }

    async fn fetch_by_doi_batch(
        &self,
        dois: &[String],
        field_set: FieldSet,
    ) -> Result<Vec<PaperRecord>, SourceError> {
        self.fetch_batch_filtered("doi", dois, field_set).await
    }
}
