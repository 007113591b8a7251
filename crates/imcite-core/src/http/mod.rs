//! Resilient HTTP fetch primitive.
//!
//! One GET surface shared by both source adapters: 404 is a valid empty
//! result, a fixed whitelist of rate-limit/server statuses is retried with
//! bounded exponential backoff plus jitter, and any other non-success status
//! is fatal and aborts the pipeline.

use rand::Rng;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Status codes recovered locally via backoff
const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_CAP_MS: u64 = 8_000;
const JITTER_MS: u64 = 250;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("retries exhausted after {attempts} attempts for {url}: {last_error}")]
    RetryExhausted {
        attempts: u32,
        url: String,
        last_error: String,
    },

    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

impl FetchError {
    /// Non-retryable status and retry exhaustion terminate the session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FetchError::Status { .. }
                | FetchError::RetryExhausted { .. }
                | FetchError::InvalidUrl { .. }
        )
    }
}

/// True when the status is recovered with backoff rather than surfaced
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Backoff delay before the next attempt: exponential from 500 ms, capped at
/// 8 s, plus up to 250 ms of uniform jitter
fn backoff_delay(attempt: u32) -> Duration {
    let exp = BACKOFF_BASE_MS.saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
    let jitter = rand::thread_rng().gen_range(0..=JITTER_MS);
    Duration::from_millis(exp.min(BACKOFF_CAP_MS) + jitter)
}

/// HTTP client with the engine's retry discipline baked in
pub struct ResilientClient {
    client: Client,
    user_agent: String,
    max_attempts: u32,
}

impl ResilientClient {
    pub fn new(user_agent: &str, max_attempts: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            user_agent: user_agent.to_string(),
            max_attempts: max_attempts.max(1),
        }
    }

    /// GET the URL and return the response body.
    ///
    /// `Ok(None)` on 404. Transport errors and retryable statuses back off
    /// and retry up to the attempt budget.
    pub async fn get(&self, url: &str) -> Result<Option<String>, FetchError> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match self
                .client
                .get(url)
                .header("User-Agent", &self.user_agent)
                .header("Accept", "application/json")
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if status == 404 {
                        return Ok(None);
                    }
                    if (200..300).contains(&status) {
                        match response.text().await {
                            Ok(body) => return Ok(Some(body)),
                            Err(e) => {
                                // Body read failures behave like transport errors
                                last_error = e.to_string();
                            }
                        }
                    } else if is_retryable_status(status) {
                        last_error = format!("HTTP {}", status);
                        tracing::debug!(url, status, attempt, "retryable response");
                    } else {
                        return Err(FetchError::Status {
                            status,
                            url: url.to_string(),
                        });
                    }
                }
                Err(e) => {
                    last_error = e.to_string();
                    tracing::debug!(url, attempt, error = %last_error, "transport error");
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(backoff_delay(attempt)).await;
            }
        }

        Err(FetchError::RetryExhausted {
            attempts: self.max_attempts,
            url: url.to_string(),
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(403));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(200));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let first = backoff_delay(1).as_millis() as u64;
        assert!((BACKOFF_BASE_MS..=BACKOFF_BASE_MS + JITTER_MS).contains(&first));

        let deep = backoff_delay(12).as_millis() as u64;
        assert!(deep <= BACKOFF_CAP_MS + JITTER_MS);
    }

    #[test]
    fn test_fatal_classification() {
        let status = FetchError::Status {
            status: 403,
            url: "http://x".to_string(),
        };
        assert!(status.is_fatal());

        let exhausted = FetchError::RetryExhausted {
            attempts: 5,
            url: "http://x".to_string(),
            last_error: "HTTP 500".to_string(),
        };
        assert!(exhausted.is_fatal());
    }
}
