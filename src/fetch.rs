// src/fetch.rs

use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use crate::error::ScrapeError;

/// How the fetcher behaves when the server rate-limits us. Rate limiting is
/// the only condition we retry; everything else is terminal.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    /// How long to wait after a rate-limited response before trying again.
    pub cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            cooldown: Duration::from_secs(10),
        }
    }
}

/// HTTP fetcher for one page at a time. One network round trip per attempt.
pub struct Fetcher {
    client: Client,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(retry: RetryPolicy) -> Self {
        Fetcher {
            client: Client::new(),
            retry,
        }
    }

    /// GET `url` and return the response body.
    ///
    /// 400 and 404 fail immediately with [`ScrapeError::InvalidTarget`];
    /// any other non-success status fails immediately with
    /// [`ScrapeError::UnexpectedResponse`]. A 429 sleeps the cooldown and
    /// retries until the attempt budget runs out, then fails with
    /// [`ScrapeError::RetryBudgetExhausted`].
    pub async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let parsed = Url::parse(url).map_err(|_| ScrapeError::InvalidTarget {
            url: url.to_string(),
        })?;

        for attempt in 1..=self.retry.max_attempts {
            let resp = self
                .client
                .get(parsed.clone())
                .send()
                .await
                .map_err(|source| ScrapeError::Transport {
                    url: url.to_string(),
                    source,
                })?;

            let status = resp.status();
            match status {
                s if s.is_success() => {
                    debug!(%url, attempt, "fetched");
                    return resp.text().await.map_err(|source| ScrapeError::Transport {
                        url: url.to_string(),
                        source,
                    });
                }
                StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
                    return Err(ScrapeError::InvalidTarget {
                        url: url.to_string(),
                    });
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    warn!(%url, attempt, max = self.retry.max_attempts, "rate limited");
                    if attempt < self.retry.max_attempts {
                        sleep(self.retry.cooldown).await;
                    }
                }
                s => {
                    return Err(ScrapeError::UnexpectedResponse {
                        url: url.to_string(),
                        status: s,
                    });
                }
            }
        }

        Err(ScrapeError::RetryBudgetExhausted {
            url: url.to_string(),
            attempts: self.retry.max_attempts,
        })
    }
}
