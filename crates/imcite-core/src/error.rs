//! Engine error taxonomy.
//!
//! Not-found responses are not errors (adapters return `None`). Transient
//! failures are retried inside the HTTP layer and only surface once the
//! retry budget is exhausted. What remains is either fatal (terminates the
//! session) or soft (the phase is skipped and the pipeline continues).

use crate::sources::SourceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("master paper '{0}' was not found")]
    MasterNotFound(String),

    #[error("cannot extend: session is {0}, expected active")]
    NotActive(&'static str),
}

impl EngineError {
    /// Fatal errors terminate the session; everything else degrades the
    /// phase that raised it.
    pub fn is_fatal(&self) -> bool {
        match self {
            EngineError::Source(source) => source.is_fatal(),
            EngineError::MasterNotFound(_) => true,
            EngineError::NotActive(_) => false,
        }
    }
}
