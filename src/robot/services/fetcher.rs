// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

//! Page retrieval.
//!
//! A [`Fetcher`] owns an ordered list of named [`Strategy`] values (cheap
//! HTTP first, headless render second by default). Each strategy is tried
//! under a bounded [`RetryPolicy`]; the first one that returns HTML wins.
//! Failures are always returned as a [`FetchError`] value.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::robot::memory::Config;

pub mod http;
pub mod render;
pub mod retry;
#[cfg(test)]
pub mod testing;

pub use http::HttpStrategy;
pub use render::RenderStrategy;
pub use retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("request blocked by remote site (status {0})")]
    Blocked(u16),
    #[error("render error: {0}")]
    Render(String),
    #[error("headless browser unavailable")]
    RenderUnavailable,
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("no fetch strategy named '{0}'")]
    NoStrategy(String),
    #[error("all fetch strategies failed for {url}: {last}")]
    Exhausted { url: String, last: String },
}

/// A single way of turning a url into HTML.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
    async fn close(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Every configured strategy, in order, until one succeeds.
    Auto,
    Http,
    Render,
}

impl FetchMode {
    fn strategy_name(&self) -> Option<&'static str> {
        match self {
            FetchMode::Auto => None,
            FetchMode::Http => Some(http::NAME),
            FetchMode::Render => Some(render::NAME),
        }
    }
}

pub struct Fetcher {
    strategies: Vec<Arc<dyn Strategy>>,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(strategies: Vec<Arc<dyn Strategy>>, retry: RetryPolicy) -> Fetcher {
        Fetcher { strategies, retry }
    }

    /// Builds the strategies named in `config.strategies`, in that order.
    ///
    /// The render engine is launched here. When it cannot be started the
    /// strategy is dropped with a warning and crawling continues over HTTP.
    pub async fn from_config(config: &Config) -> Result<Fetcher, FetchError> {
        let mut strategies: Vec<Arc<dyn Strategy>> = Vec::new();
        for name in &config.strategies {
            match name.trim().to_lowercase().as_str() {
                http::NAME => strategies.push(Arc::new(HttpStrategy::new(config.fetch_timeout)?)),
                render::NAME => match RenderStrategy::launch(config).await {
                    Ok(render) => strategies.push(Arc::new(render)),
                    Err(e) => log::warn!("Render strategy disabled: {}", e),
                },
                other => return Err(FetchError::NoStrategy(other.to_string())),
            }
        }
        Ok(Fetcher::new(strategies, RetryPolicy::from_config(config)))
    }

    pub fn strategy_names(&self) -> Vec<String> {
        self.strategies.iter().map(|s| s.name().to_string()).collect()
    }

    pub async fn fetch(&self, url: &str, mode: FetchMode) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        let selected: Vec<&Arc<dyn Strategy>> = match mode.strategy_name() {
            None => self.strategies.iter().collect(),
            Some(name) => self.strategies.iter().filter(|s| s.name() == name).collect(),
        };
        if selected.is_empty() {
            return Err(match mode.strategy_name() {
                Some(render::NAME) => FetchError::RenderUnavailable,
                Some(name) => FetchError::NoStrategy(name.to_string()),
                None => FetchError::NoStrategy("auto".to_string()),
            });
        }

        let mut last = None;
        for strategy in selected {
            match self.retry.run(strategy.as_ref(), &parsed).await {
                Ok(html) => return Ok(html),
                Err(e) => {
                    log::warn!("{} strategy failed for {}: {}", strategy.name(), url, e);
                    last = Some(e);
                }
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            last: last.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    /// Releases every strategy's resources. Call once, on shutdown.
    pub async fn close(&self) {
        for strategy in &self.strategies {
            strategy.close().await;
        }
    }
}
