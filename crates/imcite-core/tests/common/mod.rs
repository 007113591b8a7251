//! Shared fake providers and record builders for integration tests

use async_trait::async_trait;
use imcite_core::http::FetchError;
use imcite_core::sources::{
    CitingBatch, FieldSet, PrimarySource, SecondaryLinks, SecondarySource, SourceError,
};
use imcite_domain::{AuthorRecord, AuthorshipRecord, PaperRecord};
use std::collections::HashMap;

/// Route engine logs through the test harness; honors RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a primary-provider work record
pub fn work(id: &str, doi: Option<&str>, title: &str) -> PaperRecord {
    PaperRecord {
        openalex_id: Some(id.to_string()),
        doi: doi.map(|d| d.to_string()),
        title: Some(title.to_string()),
        publication_year: Some(2020),
        ..Default::default()
    }
}

/// Build a secondary-provider record carrying plain-name authors
pub fn s2_paper(paper_id: &str, doi: Option<&str>, title: &str, authors: &[&str]) -> PaperRecord {
    PaperRecord {
        s2_paper_id: Some(paper_id.to_string()),
        doi: doi.map(|d| d.to_string()),
        title: Some(title.to_string()),
        authorships: authors
            .iter()
            .enumerate()
            .map(|(position, name)| AuthorshipRecord {
                author: AuthorRecord {
                    s2_author_id: Some(format!("s2-{}-{}", paper_id, position)),
                    display_name: name.to_string(),
                    ..Default::default()
                },
                position: position as u32,
                raw_author_name: Some(name.to_string()),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

/// Attach a full-identity author credit to a work record
pub fn with_author(mut record: PaperRecord, author_id: &str, name: &str) -> PaperRecord {
    let position = record.authorships.len() as u32;
    record.authorships.push(AuthorshipRecord {
        author: AuthorRecord {
            openalex_author_id: Some(author_id.to_string()),
            display_name: name.to_string(),
            ..Default::default()
        },
        position,
        raw_author_name: Some(name.to_string()),
        ..Default::default()
    });
    record
}

/// Reproduce the provider's field selection on a stored record
fn shape(record: &PaperRecord, field_set: FieldSet) -> PaperRecord {
    match field_set {
        FieldSet::FullIngestion => record.clone(),
        FieldSet::SearchPreview => PaperRecord {
            openalex_id: record.openalex_id.clone(),
            doi: record.doi.clone(),
            title: record.title.clone(),
            publication_year: record.publication_year,
            location: record.location.clone(),
            cited_by_count: record.cited_by_count,
            authorships: record.authorships.clone(),
            ..Default::default()
        },
        FieldSet::StubCreation => PaperRecord {
            openalex_id: record.openalex_id.clone(),
            doi: record.doi.clone(),
            title: record.title.clone(),
            publication_year: record.publication_year,
            cited_by_count: record.cited_by_count,
            ..Default::default()
        },
        FieldSet::AuthorReconciliation => PaperRecord {
            openalex_id: record.openalex_id.clone(),
            doi: record.doi.clone(),
            authorships: record.authorships.clone(),
            ..Default::default()
        },
    }
}

fn exhausted(url: &str) -> SourceError {
    SourceError::Fetch(FetchError::RetryExhausted {
        attempts: 5,
        url: url.to_string(),
        last_error: "HTTP 500".to_string(),
    })
}

/// In-memory primary provider
#[derive(Default)]
pub struct FakePrimary {
    /// Full records by bare work id
    pub works: HashMap<String, PaperRecord>,
    /// Citing records per cited work id
    pub citing: HashMap<String, Vec<PaperRecord>>,
    /// Simulate retry exhaustion on every citing-works call
    pub fail_citing: bool,
}

impl FakePrimary {
    pub fn add_work(&mut self, record: PaperRecord) {
        let id = record
            .openalex_id
            .clone()
            .expect("fake works need a bare id");
        self.works.insert(id, record);
    }

    pub fn add_citing(&mut self, cited_id: &str, record: PaperRecord) {
        self.citing
            .entry(cited_id.to_string())
            .or_default()
            .push(record);
    }
}

#[async_trait]
impl PrimarySource for FakePrimary {
    async fn search_by_title(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PaperRecord>, SourceError> {
        let needle = query.to_lowercase();
        Ok(self
            .works
            .values()
            .filter(|record| {
                record
                    .title
                    .as_deref()
                    .map(|t| t.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .take(limit)
            .map(|record| shape(record, FieldSet::SearchPreview))
            .collect())
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<PaperRecord>, SourceError> {
        Ok(self.works.get(id).cloned())
    }

    async fn fetch_citing_works(
        &self,
        ids: &[String],
        field_set: FieldSet,
        _page_cap: usize,
    ) -> Result<CitingBatch, SourceError> {
        if self.fail_citing {
            return Err(exhausted("https://api.example.org/works?filter=cites"));
        }
        let mut records = Vec::new();
        for id in ids {
            if let Some(citing) = self.citing.get(id) {
                records.extend(citing.iter().map(|record| shape(record, field_set)));
            }
        }
        Ok(CitingBatch {
            records,
            truncated: false,
        })
    }

    async fn fetch_by_id_batch(
        &self,
        ids: &[String],
        field_set: FieldSet,
    ) -> Result<Vec<PaperRecord>, SourceError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.works.get(id))
            .map(|record| shape(record, field_set))
            .collect())
    }

    async fn fetch_by_doi_batch(
        &self,
        dois: &[String],
        field_set: FieldSet,
    ) -> Result<Vec<PaperRecord>, SourceError> {
        Ok(self
            .works
            .values()
            .filter(|record| {
                record
                    .doi
                    .as_deref()
                    .map(|doi| dois.iter().any(|wanted| wanted == doi))
                    .unwrap_or(false)
            })
            .map(|record| shape(record, field_set))
            .collect())
    }
}

/// In-memory secondary provider
#[derive(Default)]
pub struct FakeSecondary {
    /// `(citations, references)` per DOI
    pub links: HashMap<String, (Vec<PaperRecord>, Vec<PaperRecord>)>,
}

impl FakeSecondary {
    pub fn add_links(
        &mut self,
        doi: &str,
        citations: Vec<PaperRecord>,
        references: Vec<PaperRecord>,
    ) {
        self.links
            .insert(doi.to_string(), (citations, references));
    }
}

#[async_trait]
impl SecondarySource for FakeSecondary {
    async fn fetch_by_doi(&self, doi: &str) -> Result<Option<SecondaryLinks>, SourceError> {
        Ok(self.links.get(doi).map(|(citations, references)| {
            SecondaryLinks {
                citations: citations.clone(),
                references: references.clone(),
            }
        }))
    }
}
