//! Engine configuration

use serde::{Deserialize, Serialize};

/// Tunables for a graph session.
///
/// Defaults reproduce the engine's standard behavior; every field can be
/// overridden before the session starts.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum number of first-degree papers that must share a referenced or
    /// related work before it is promoted to a stub entity. Works below the
    /// threshold are discarded.
    pub stub_creation_threshold: usize,

    /// Retry budget per HTTP request
    pub max_fetch_attempts: u32,

    /// Maximum cursor pages fetched per primary-provider id chunk before the
    /// result is truncated with a degradation log
    pub citation_page_cap: usize,

    /// Maximum offset pages fetched per secondary-provider link listing
    pub secondary_page_cap: usize,

    /// Entity delta flush interval for the consumer stream, in milliseconds
    pub flush_interval_ms: u64,

    /// Contact address forwarded to the primary provider's polite pool
    pub mailto: Option<String>,

    /// Maximum candidates returned by a master-paper title search
    pub search_result_limit: usize,

    /// Acceptance threshold for a fuzzy author match
    pub reconcile_accept_threshold: f64,

    /// Minimum surname similarity before full names are compared at all
    pub reconcile_surname_gate: f64,

    /// Multiplicative score boost when an abbreviated first name matches the
    /// candidate's first initial, capped at 1.0
    pub reconcile_initial_boost: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stub_creation_threshold: 3,
            max_fetch_attempts: 5,
            citation_page_cap: 10,
            secondary_page_cap: 4,
            flush_interval_ms: 250,
            mailto: None,
            search_result_limit: 10,
            reconcile_accept_threshold: 0.85,
            reconcile_surname_gate: 0.9,
            reconcile_initial_boost: 1.15,
        }
    }
}
