// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

use rand::Rng;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use url::Url;

use crate::robot::memory::Config;
use crate::robot::services::fetcher::{FetchError, Strategy};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
    /// Upper bound on a single attempt.
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> RetryPolicy {
        RetryPolicy {
            attempts: config.retries.max(1),
            backoff_min: config.backoff_min,
            backoff_max: config.backoff_max,
            timeout: config.fetch_timeout,
        }
    }

    /// No delay between attempts.
    pub fn immediate(attempts: usize, timeout: Duration) -> RetryPolicy {
        RetryPolicy {
            attempts: attempts.max(1),
            backoff_min: Duration::ZERO,
            backoff_max: Duration::ZERO,
            timeout,
        }
    }

    fn backoff(&self) -> Duration {
        let min = self.backoff_min.as_millis() as u64;
        let max = self.backoff_max.as_millis() as u64;
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    /// Runs `strategy` until it succeeds, hits a permanent failure, or
    /// runs out of attempts. Returns the last error seen.
    pub async fn run(&self, strategy: &dyn Strategy, url: &Url) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match timeout(self.timeout, strategy.fetch(url)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(self.timeout)),
            };

            let err = match result {
                Ok(html) => return Ok(html),
                Err(e) => e,
            };

            if !err.is_retryable() || attempt >= self.attempts {
                return Err(err);
            }

            let delay = self.backoff();
            log::debug!(
                "{} attempt {}/{} for {} failed ({}), retrying in {:?}",
                strategy.name(),
                attempt,
                self.attempts,
                url,
                err,
                delay
            );
            sleep(delay).await;
        }
    }
}

impl FetchError {
    /// Permanent failures skip the remaining attempts of a strategy.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Http(_) | FetchError::Render(_) => true,
            FetchError::Status(code) => *code >= 500 || *code == 408,
            FetchError::Blocked(_)
            | FetchError::RenderUnavailable
            | FetchError::InvalidUrl(_)
            | FetchError::NoStrategy(_)
            | FetchError::Exhausted { .. } => false,
        }
    }
}
