//! Internal ids and external identifier namespaces

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    /// DOI shape after prefix stripping: "10.<registrant>/<suffix>"
    static ref DOI_RE: Regex = Regex::new(r"^10\.\d+/\S+$").unwrap();
}

/// Opaque internal identifier for a canonical entity.
///
/// Minted once per entity and never reused within a session. The leading
/// character encodes the entity kind for readability in exports and logs;
/// nothing in the engine depends on it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShortUid(String);

impl ShortUid {
    /// Mint a fresh uid with the given kind prefix (`p`, `a`, `i`)
    pub fn mint(kind: char) -> Self {
        let token = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", kind, &token[..8]))
    }

    /// Wrap an existing uid string (used when folding a stream mirror)
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Namespaces of external identifiers the engine deduplicates on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdNamespace {
    OpenAlex,
    Doi,
    SemanticScholar,
    SemanticScholarCorpus,
    OpenAlexAuthor,
    Orcid,
    OpenAlexInstitution,
    Ror,
    SemanticScholarAuthor,
}

impl IdNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdNamespace::OpenAlex => "openalex",
            IdNamespace::Doi => "doi",
            IdNamespace::SemanticScholar => "s2",
            IdNamespace::SemanticScholarCorpus => "s2corpus",
            IdNamespace::OpenAlexAuthor => "openalex_author",
            IdNamespace::Orcid => "orcid",
            IdNamespace::OpenAlexInstitution => "openalex_institution",
            IdNamespace::Ror => "ror",
            IdNamespace::SemanticScholarAuthor => "s2author",
        }
    }
}

impl fmt::Display for IdNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized `(namespace, value)` pair.
///
/// Construction normalizes the raw value for its namespace, so equal
/// identifiers written with different URL prefixes or casing collapse to the
/// same key. Values that normalize to nothing yield `None`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalId {
    pub namespace: IdNamespace,
    pub value: String,
}

impl ExternalId {
    pub fn new(namespace: IdNamespace, raw: &str) -> Option<Self> {
        let value = match namespace {
            IdNamespace::Doi => normalize_doi(raw)?,
            IdNamespace::OpenAlex | IdNamespace::OpenAlexAuthor | IdNamespace::OpenAlexInstitution => {
                normalize_openalex_id(raw)?
            }
            IdNamespace::Orcid => normalize_orcid(raw)?,
            IdNamespace::Ror => normalize_ror(raw)?,
            IdNamespace::SemanticScholar
            | IdNamespace::SemanticScholarCorpus
            | IdNamespace::SemanticScholarAuthor => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.to_string()
            }
        };
        Some(Self { namespace, value })
    }

    /// Index key in `namespace:value` form
    pub fn key(&self) -> String {
        format!("{}:{}", self.namespace, self.value)
    }
}

/// Normalize a DOI to its bare lowercase form.
///
/// Strips resolver URL prefixes and the `doi:` scheme, lowercases, and
/// rejects strings that do not look like a DOI at all.
pub fn normalize_doi(raw: &str) -> Option<String> {
    let mut doi = raw.trim().to_lowercase();
    for prefix in [
        "https://doi.org/",
        "http://doi.org/",
        "https://dx.doi.org/",
        "http://dx.doi.org/",
        "doi:",
    ] {
        if let Some(stripped) = doi.strip_prefix(prefix) {
            doi = stripped.to_string();
        }
    }
    if DOI_RE.is_match(&doi) {
        Some(doi)
    } else {
        None
    }
}

/// Normalize an OpenAlex entity id (work, author, or institution) to its
/// bare token, e.g. `https://openalex.org/W2741809807` -> `W2741809807`.
pub fn normalize_openalex_id(raw: &str) -> Option<String> {
    let mut id = raw.trim();
    for prefix in ["https://openalex.org/", "http://openalex.org/"] {
        if let Some(stripped) = id.strip_prefix(prefix) {
            id = stripped;
        }
    }
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Normalize an ORCID to its bare `0000-...` form
pub fn normalize_orcid(raw: &str) -> Option<String> {
    let mut orcid = raw.trim();
    for prefix in ["https://orcid.org/", "http://orcid.org/"] {
        if let Some(stripped) = orcid.strip_prefix(prefix) {
            orcid = stripped;
        }
    }
    if orcid.is_empty() {
        None
    } else {
        Some(orcid.to_string())
    }
}

/// Normalize a ROR id to its bare token
pub fn normalize_ror(raw: &str) -> Option<String> {
    let mut ror = raw.trim();
    for prefix in ["https://ror.org/", "http://ror.org/"] {
        if let Some(stripped) = ror.strip_prefix(prefix) {
            ror = stripped;
        }
    }
    if ror.is_empty() {
        None
    } else {
        Some(ror.to_string())
    }
}
