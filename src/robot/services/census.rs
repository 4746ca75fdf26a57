// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

//! Tag census: counts the element names of one page and replaces the
//! stored census with the result.

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::robot::memory::{HtmlTag, Store};
use crate::robot::services::fetcher::{FetchError, FetchMode, Fetcher};

#[derive(Debug, Error)]
pub enum CensusError {
    #[error("URL is required.")]
    MissingUrl,
    #[error("failed to fetch {url}: {source}")]
    Fetch { url: String, source: FetchError },
    #[error("store unavailable: {0}")]
    Persistence(#[from] crate::robot::memory::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CensusReport {
    pub url: String,
    pub unique_count: usize,
    pub tags: Vec<HtmlTag>,
}

/// `www.x` and `x` both become `https://www.x`; an explicit scheme is dropped first.
pub fn normalise_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("https://www.") {
        return Some(trimmed.to_string());
    }
    let bare = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    if bare.is_empty() {
        return None;
    }
    if bare.starts_with("www.") {
        Some(format!("https://{}", bare))
    } else {
        Some(format!("https://www.{}", bare))
    }
}

/// Lower-cased element name -> occurrences, in name order.
pub fn count_tags(html: &str) -> Vec<HtmlTag> {
    let document = Html::parse_document(html);
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for element in document.root_element().descendants().filter_map(ElementRef::wrap) {
        *counts.entry(element.value().name().to_lowercase()).or_insert(0) += 1;
    }
    counts.into_iter().map(|(tag, count)| HtmlTag { tag, count }).collect()
}

pub struct Census {
    store: Arc<dyn Store>,
    fetcher: Arc<Fetcher>,
}

impl Census {
    pub fn new(store: Arc<dyn Store>, fetcher: Arc<Fetcher>) -> Census {
        Census { store, fetcher }
    }

    pub async fn run(&self, raw_url: &str) -> Result<CensusReport, CensusError> {
        let url = normalise_url(raw_url).ok_or(CensusError::MissingUrl)?;

        log::info!("Fetching HTML content for tag census: {}", url);
        let html = self
            .fetcher
            .fetch(&url, FetchMode::Http)
            .await
            .map_err(|source| CensusError::Fetch { url: url.clone(), source })?;

        let tags = count_tags(&html);
        self.store.replace_tags(&tags).await?;
        log::info!("Tags counted for {}: {} unique", url, tags.len());

        Ok(CensusReport {
            url,
            unique_count: tags.len(),
            tags,
        })
    }
}
