// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::robot::memory::{Config, Store};
use crate::robot::services::extractor;
use crate::robot::services::fetcher::{FetchMode, Fetcher};
use crate::robot::services::search::{Operator, Query, SearchError};
use crate::robot::tools;

pub const NO_DESCRIPTION: &str = "No description available";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub url: String,
    pub description: String,
    pub rank: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum SearchOutcome {
    Results { query: String, urls: Vec<SearchResult> },
    NoResults { message: String },
}

impl SearchOutcome {
    pub fn no_results() -> SearchOutcome {
        SearchOutcome::NoResults {
            message: "no results".to_string(),
        }
    }
}

// What a live fetch of one candidate contributed.
#[derive(Default)]
struct LiveCheck {
    phrase_rank: i64,
    excerpt: Option<String>,
}

pub struct QueryEngine {
    store: Arc<dyn Store>,
    fetcher: Arc<Fetcher>,
    concurrency: usize,
    phrase_timeout: Duration,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn Store>, fetcher: Arc<Fetcher>, config: &Config) -> QueryEngine {
        QueryEngine {
            store,
            fetcher,
            concurrency: config.workers.max(1),
            phrase_timeout: config.phrase_timeout,
        }
    }

    /// Parses and evaluates a raw query. `operator` defaults to OR.
    pub async fn search(&self, raw: &str, operator: Option<&str>) -> Result<SearchOutcome, SearchError> {
        let operator = match operator {
            Some(op) if !op.trim().is_empty() => op.parse::<Operator>()?,
            _ => Operator::default(),
        };
        self.evaluate(&Query::parse(raw, operator)).await
    }

    pub async fn evaluate(&self, query: &Query) -> Result<SearchOutcome, SearchError> {
        if query.is_empty() {
            return Err(SearchError::Input("Query parameter is required.".to_string()));
        }

        let phrase_only = query.keywords.is_empty();
        let mut ranks: BTreeMap<String, i64> = if phrase_only {
            self.store
                .indexed_urls()
                .await?
                .into_iter()
                .map(|url| (url, 0))
                .collect()
        } else {
            self.keyword_candidates(query).await?
        };

        let mut stored: HashMap<String, String> = HashMap::new();
        for url in ranks.keys() {
            if let Some(description) = self.store.description(url).await?.filter(|d| !d.trim().is_empty()) {
                stored.insert(url.clone(), description);
            }
        }

        // one live fetch per url serves both the phrase count and a missing description
        let check_phrases = !query.phrases.is_empty();
        let urls: Vec<String> = ranks
            .keys()
            .filter(|url| check_phrases || !stored.contains_key(*url))
            .cloned()
            .collect();
        let mut live: HashMap<String, LiveCheck> = stream::iter(urls)
            .map(|url| async move {
                let check = self.live_check(&url, &query.phrases).await;
                (url, check)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        if check_phrases {
            for (url, rank) in ranks.iter_mut() {
                if let Some(check) = live.get(url) {
                    *rank += check.phrase_rank;
                }
            }
            if phrase_only {
                ranks.retain(|url, _| live.get(url).map_or(false, |c| c.phrase_rank > 0));
            }
        }

        if ranks.is_empty() {
            log::info!("No results found for query: {}", query.raw);
            return Ok(SearchOutcome::no_results());
        }

        let mut results = Vec::with_capacity(ranks.len());
        for (url, rank) in ranks {
            let description = match stored.remove(&url) {
                Some(description) => description,
                None => live
                    .remove(&url)
                    .and_then(|c| c.excerpt)
                    .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            };
            results.push(SearchResult { url, description, rank });
        }

        results.sort_by(|a, b| b.rank.cmp(&a.rank).then_with(|| a.url.cmp(&b.url)));
        Ok(SearchOutcome::Results {
            query: query.raw.clone(),
            urls: results,
        })
    }

    /// Sums keyword ranks per url, keeping urls that satisfy the operator.
    async fn keyword_candidates(&self, query: &Query) -> Result<BTreeMap<String, i64>, SearchError> {
        let rows = self.store.ranks_for(&query.keywords).await?;

        let mut matched: HashMap<String, (HashSet<String>, i64)> = HashMap::new();
        for row in rows {
            let entry = matched.entry(row.url).or_default();
            if entry.0.insert(row.keyword) {
                entry.1 += row.rank;
            }
        }

        Ok(matched
            .into_iter()
            .filter(|(_, (keywords, _))| match query.operator {
                Operator::And => keywords.len() == query.keywords.len(),
                Operator::Or => !keywords.is_empty(),
            })
            .map(|(url, (_, rank))| (url, rank))
            .collect())
    }

    async fn fetch_live(&self, url: &str) -> Option<String> {
        match timeout(self.phrase_timeout, self.fetcher.fetch(url, FetchMode::Auto)).await {
            Ok(Ok(html)) => Some(html),
            Ok(Err(e)) => {
                log::warn!("Live fetch of {} failed: {}", url, e);
                None
            }
            Err(_) => {
                log::warn!("Live fetch of {} timed out after {:?}", url, self.phrase_timeout);
                None
            }
        }
    }

    /// Counts phrase occurrences in the live page and keeps an excerpt.
    /// A failed or timed out fetch counts zero.
    async fn live_check(&self, url: &str, phrases: &[String]) -> LiveCheck {
        let html = match self.fetch_live(url).await {
            Some(html) => html,
            None => return LiveCheck::default(),
        };
        LiveCheck {
            phrase_rank: phrases.iter().map(|p| tools::count_whole_word(&html, p)).sum(),
            excerpt: excerpt(&html),
        }
    }
}

fn excerpt(html: &str) -> Option<String> {
    let description = extractor::extract(html, 0).description;
    if description.is_empty() {
        None
    } else {
        Some(description)
    }
}
