//! Author domain model and name normalization

use crate::ids::ShortUid;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// A canonical author entity.
///
/// At most one author exists per primary-provider author id or ORCID; stub
/// authors carry only a plain name until reconciliation resolves them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Author {
    pub short_uid: ShortUid,
    pub clean_name: String,
    pub orcid: Option<String>,
    pub is_stub: bool,
}

impl Author {
    pub fn new(short_uid: ShortUid, clean_name: impl Into<String>, is_stub: bool) -> Self {
        Self {
            short_uid,
            clean_name: clean_name.into(),
            orcid: None,
            is_stub,
        }
    }

    /// Builder method to add an ORCID
    pub fn with_orcid(mut self, orcid: impl Into<String>) -> Self {
        self.orcid = Some(orcid.into());
        self
    }
}

/// Normalize a person name for fuzzy comparison.
///
/// - Unicode NFKD, keeping only ASCII alphanumerics and whitespace
///   (periods and other punctuation fall away)
/// - Lowercases
/// - Collapses whitespace
pub fn normalize_person_name(name: &str) -> String {
    let filtered: String = name
        .nfkd()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_ascii_whitespace())
        .collect();
    collapse_whitespace(&filtered.to_lowercase())
        .trim()
        .to_string()
}

/// Extract the surname from a normalized name.
///
/// Provider names arrive in "First Last" order; the last whitespace token is
/// the surname.
pub fn surname(normalized: &str) -> &str {
    normalized.split_whitespace().last().unwrap_or(normalized)
}

/// First token of a normalized name, if any
pub fn first_token(normalized: &str) -> Option<&str> {
    normalized.split_whitespace().next()
}

/// True when the normalized name opens with a single-letter initial
pub fn starts_with_initial(normalized: &str) -> bool {
    first_token(normalized).map(|t| t.len() == 1).unwrap_or(false)
}

/// Collapse multiple whitespace characters into a single space
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for c in s.chars() {
        if c.is_ascii_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(c);
            prev_was_space = false;
        }
    }
    result
}
