//! Database archive download with bounded retries.
//!
//! Each attempt races the GET against a fixed timeout. Attempts run strictly
//! one after another with no delay in between; a timed-out attempt is dropped
//! and charged against the budget like any other failure.

use std::sync::Arc;
use std::time::Duration;

use crate::http::Fetch;
use crate::{MagicDbError, Result};

/// A successfully downloaded archive
#[derive(Debug)]
pub struct Download {
    pub bytes: Vec<u8>,
    /// Attempts that failed before this one succeeded
    pub failed_attempts: u32,
}

pub struct Downloader {
    fetcher: Arc<dyn Fetch>,
    attempts: u32,
    attempt_timeout: Duration,
}

impl Downloader {
    pub fn new(fetcher: Arc<dyn Fetch>, attempts: u32, attempt_timeout: Duration) -> Self {
        Self {
            fetcher,
            attempts,
            attempt_timeout,
        }
    }

    /// Fetch `url`, returning `None` once every attempt has failed
    pub async fn fetch(&self, url: &str) -> Option<Download> {
        let mut failed_attempts = 0;

        for attempt in 1..=self.attempts {
            match self.attempt(url).await {
                Ok(bytes) => {
                    return Some(Download {
                        bytes,
                        failed_attempts,
                    })
                }
                Err(e) => {
                    log::error!("Download Failed: {}", e);
                    failed_attempts += 1;

                    if attempt < self.attempts {
                        log::warn!("Retrying ({}/{}) ...", attempt + 1, self.attempts);
                    }
                }
            }
        }

        None
    }

    async fn attempt(&self, url: &str) -> Result<Vec<u8>> {
        match tokio::time::timeout(self.attempt_timeout, self.fetcher.fetch(url)).await {
            Err(_) => Err(MagicDbError::Timeout {
                secs: self.attempt_timeout.as_secs_f64(),
            }),
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(None)) => Err(MagicDbError::EmptyBody {
                url: url.to_string(),
            }),
            Ok(Ok(Some(bytes))) => Ok(bytes),
        }
    }
}
