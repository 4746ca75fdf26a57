// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::sync::Arc;
use url::Url;

use crate::robot::memory::{KeywordRank, PageDescription, Store};
use crate::robot::services::crawler::Frontier;
use crate::robot::services::Result;
use crate::robot::tools;

static ANCHORS: Lazy<Selector> = Lazy::new(|| match Selector::parse("a[href]") {
    Ok(s) => s,
    Err(e) => unreachable!("anchor selector failed to parse: {:?}", e),
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub ranked: usize,
    pub links: usize,
    pub enqueued: usize,
}

pub struct Indexer {
    store: Arc<dyn Store>,
    frontier: Arc<Frontier>,
}

impl Indexer {
    pub fn new(store: Arc<dyn Store>, frontier: Arc<Frontier>) -> Indexer {
        Indexer { store, frontier }
    }

    /// Stores the page's description and keyword ranks, then enqueues
    /// every outbound host.
    ///
    /// Ranks are counted over the whole `html`, not the extracted snippet,
    /// and overwrite any previous value for the same (url, keyword).
    pub async fn index(&self, url: &str, html: &str, keywords: &[String], description: &str) -> Result<IndexReport> {
        self.store
            .upsert_description(&PageDescription::new(url.to_string(), description.to_string()))
            .await?;

        let ranks: Vec<KeywordRank> = keywords
            .iter()
            .map(|keyword| KeywordRank::new(url.to_string(), keyword.clone(), tools::count_whole_word(html, keyword)))
            .collect();
        self.store.upsert_ranks(&ranks).await?;

        let links = outbound_links(url, html);
        let mut enqueued = 0;
        for link in &links {
            match self.frontier.enqueue(link).await {
                Ok(true) => enqueued += 1,
                Ok(false) => {}
                Err(e) => log::warn!("Failed to enqueue {} (found on {}): {}", link, url, e),
            }
        }

        Ok(IndexReport {
            ranked: ranks.len(),
            links: links.len(),
            enqueued,
        })
    }
}

/// Absolute form of every `<a href>` in `html`, resolved against `base`.
pub fn outbound_links(base: &str, html: &str) -> Vec<String> {
    let base = match Url::parse(base) {
        Ok(base) => base,
        Err(e) => {
            log::warn!("Cannot resolve links against {}: {}", base, e);
            return Vec::new();
        }
    };

    let document = Html::parse_document(html);
    let mut links: Vec<String> = Vec::new();
    for anchor in document.select(&ANCHORS) {
        let href = match anchor.value().attr("href") {
            Some(href) => href.trim(),
            None => continue,
        };
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        if let Ok(resolved) = base.join(href) {
            let resolved = resolved.to_string();
            if !links.contains(&resolved) {
                links.push(resolved);
            }
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::memory::MemoryStore;

    const SHOE_PAGE: &str = r##"<html><head>
        <meta name="description" content="Buy shoes online">
    </head><body>
        <p>Shoes for running. SHOES for walking.</p>
        <p>shoestring is not counted, nor is reshoes; shoes and more shoes!</p>
        <a href="/local">Local</a>
        <a href="https://partner.example/shop?ref=1">Partner</a>
        <a href="//cdn.example/x.js">CDN</a>
        <a href="mailto:help@shop.example">Mail</a>
        <a href="#top">Top</a>
    </body></html>"##;

    fn indexer() -> (Arc<MemoryStore>, Indexer) {
        let store = Arc::new(MemoryStore::new());
        let frontier = Arc::new(Frontier::new(store.clone()));
        (store.clone(), Indexer::new(store, frontier))
    }

    #[tokio::test]
    async fn ranks_count_whole_words_across_full_html() {
        let (store, indexer) = indexer();
        let keywords = vec!["shoes".to_string(), "online".to_string()];
        indexer
            .index("https://shop.example/", SHOE_PAGE, &keywords, "Buy shoes online")
            .await
            .unwrap();

        assert_eq!(store.description("https://shop.example/").await.unwrap().as_deref(), Some("Buy shoes online"));
        let ranks = store.ranks_for(&keywords).await.unwrap();
        let shoes = ranks.iter().find(|r| r.keyword == "shoes").unwrap();
        assert_eq!(shoes.rank, 5);
        let online = ranks.iter().find(|r| r.keyword == "online").unwrap();
        assert_eq!(online.rank, 1);
    }

    #[tokio::test]
    async fn re_indexing_overwrites_ranks() {
        let (store, indexer) = indexer();
        let keywords = vec!["shoes".to_string()];
        for _ in 0..2 {
            indexer.index("https://shop.example/", SHOE_PAGE, &keywords, "d").await.unwrap();
        }
        let ranks = store.ranks_for(&keywords).await.unwrap();
        assert_eq!(ranks, vec![KeywordRank::new("https://shop.example/".into(), "shoes".into(), 5)]);
    }

    #[tokio::test]
    async fn outbound_hosts_are_enqueued_once() {
        let (store, indexer) = indexer();
        let report = indexer.index("https://shop.example/", SHOE_PAGE, &[], "d").await.unwrap();

        assert_eq!(report.links, 4);
        assert_eq!(report.enqueued, 3);
        for host in ["shop.example", "partner.example", "cdn.example"] {
            assert!(store.frontier_entry(host).await.unwrap().is_some(), "{} missing", host);
        }
        let report = indexer.index("https://shop.example/", SHOE_PAGE, &[], "d").await.unwrap();
        assert_eq!(report.enqueued, 0);
    }

    #[test]
    fn links_resolve_against_page_url() {
        let links = outbound_links("https://a.example/dir/page", r#"<a href="next">n</a><a href="/root">r</a>"#);
        assert_eq!(links, vec!["https://a.example/dir/next", "https://a.example/root"]);
    }
}
