// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

//! Process-local [`Store`] used by the test-suite and by `ROBOT_STORE=memory`.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::robot::memory::{
    ErrorKind, FrontierEntry, HtmlTag, KeywordRank, PageDescription, Result, Store,
};

#[derive(Default)]
struct Tables {
    frontier: HashMap<String, FrontierEntry>,
    descriptions: BTreeMap<String, String>,
    ranks: BTreeMap<(String, String), i64>,
    tags: BTreeMap<String, i64>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| ErrorKind::Unavailable("memory store lock poisoned".to_string()).into())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.tables().map(|_| ())
    }

    async fn enqueue(&self, host: &str) -> Result<bool> {
        let mut tables = self.tables()?;
        if tables.frontier.contains_key(host) {
            return Ok(false);
        }
        let position = tables.frontier.values().map(|e| e.position).max().unwrap_or(0) + 1;
        tables
            .frontier
            .insert(host.to_string(), FrontierEntry::new(host.to_string(), position));
        Ok(true)
    }

    async fn frontier_entry(&self, host: &str) -> Result<Option<FrontierEntry>> {
        Ok(self.tables()?.frontier.get(host).cloned())
    }

    async fn next_pending(&self, exclude: &[String]) -> Result<Option<FrontierEntry>> {
        let tables = self.tables()?;
        Ok(tables
            .frontier
            .values()
            .filter(|e| !e.crawled && !exclude.contains(&e.url))
            .min_by_key(|e| e.position)
            .cloned())
    }

    async fn mark_crawled(&self, host: &str) -> Result<()> {
        if let Some(entry) = self.tables()?.frontier.get_mut(host) {
            entry.crawled = true;
        }
        Ok(())
    }

    async fn pending_count(&self) -> Result<i64> {
        Ok(self.tables()?.frontier.values().filter(|e| !e.crawled).count() as i64)
    }

    async fn upsert_description(&self, page: &PageDescription) -> Result<()> {
        self.tables()?
            .descriptions
            .insert(page.url.clone(), page.description.clone());
        Ok(())
    }

    async fn description(&self, url: &str) -> Result<Option<String>> {
        Ok(self.tables()?.descriptions.get(url).cloned())
    }

    async fn description_count(&self) -> Result<i64> {
        Ok(self.tables()?.descriptions.len() as i64)
    }

    async fn indexed_urls(&self) -> Result<Vec<String>> {
        Ok(self.tables()?.descriptions.keys().cloned().collect())
    }

    async fn upsert_ranks(&self, ranks: &[KeywordRank]) -> Result<()> {
        let mut tables = self.tables()?;
        for rank in ranks {
            tables
                .ranks
                .insert((rank.url.clone(), rank.keyword.clone()), rank.rank);
        }
        Ok(())
    }

    async fn ranks_for(&self, keywords: &[String]) -> Result<Vec<KeywordRank>> {
        let tables = self.tables()?;
        Ok(tables
            .ranks
            .iter()
            .filter(|((_, keyword), _)| keywords.contains(keyword))
            .map(|((url, keyword), rank)| KeywordRank::new(url.clone(), keyword.clone(), *rank))
            .collect())
    }

    async fn replace_tags(&self, tags: &[HtmlTag]) -> Result<()> {
        let mut tables = self.tables()?;
        tables.tags = tags.iter().map(|t| (t.tag.clone(), t.count)).collect();
        Ok(())
    }

    async fn tags(&self) -> Result<Vec<HtmlTag>> {
        Ok(self
            .tables()?
            .tags
            .iter()
            .map(|(tag, count)| HtmlTag {
                tag: tag.clone(),
                count: *count,
            })
            .collect())
    }

    async fn close(&self) {}
}

/// A store whose backend is gone: every call fails.
#[cfg(test)]
pub struct UnavailableStore;

#[cfg(test)]
impl UnavailableStore {
    fn down<T>() -> Result<T> {
        Err(ErrorKind::Unavailable("connection refused".to_string()).into())
    }
}

#[cfg(test)]
#[async_trait]
impl Store for UnavailableStore {
    async fn ping(&self) -> Result<()> {
        Self::down()
    }
    async fn enqueue(&self, _host: &str) -> Result<bool> {
        Self::down()
    }
    async fn frontier_entry(&self, _host: &str) -> Result<Option<FrontierEntry>> {
        Self::down()
    }
    async fn next_pending(&self, _exclude: &[String]) -> Result<Option<FrontierEntry>> {
        Self::down()
    }
    async fn mark_crawled(&self, _host: &str) -> Result<()> {
        Self::down()
    }
    async fn pending_count(&self) -> Result<i64> {
        Self::down()
    }
    async fn upsert_description(&self, _page: &PageDescription) -> Result<()> {
        Self::down()
    }
    async fn description(&self, _url: &str) -> Result<Option<String>> {
        Self::down()
    }
    async fn description_count(&self) -> Result<i64> {
        Self::down()
    }
    async fn indexed_urls(&self) -> Result<Vec<String>> {
        Self::down()
    }
    async fn upsert_ranks(&self, _ranks: &[KeywordRank]) -> Result<()> {
        Self::down()
    }
    async fn ranks_for(&self, _keywords: &[String]) -> Result<Vec<KeywordRank>> {
        Self::down()
    }
    async fn replace_tags(&self, _tags: &[HtmlTag]) -> Result<()> {
        Self::down()
    }
    async fn tags(&self) -> Result<Vec<HtmlTag>> {
        Self::down()
    }
    async fn close(&self) {}
}

/// Wraps a [`MemoryStore`], failing selected calls on demand.
#[cfg(test)]
pub struct FlakyStore {
    inner: MemoryStore,
    next_pending_failures: std::sync::atomic::AtomicUsize,
    rejected_description: Option<String>,
}

#[cfg(test)]
impl FlakyStore {
    pub fn new() -> FlakyStore {
        FlakyStore {
            inner: MemoryStore::new(),
            next_pending_failures: std::sync::atomic::AtomicUsize::new(0),
            rejected_description: None,
        }
    }

    /// The next `times` calls to `next_pending` fail.
    pub fn fail_next_pending(self, times: usize) -> FlakyStore {
        self.next_pending_failures
            .store(times, std::sync::atomic::Ordering::SeqCst);
        self
    }

    /// Every `upsert_description` for `url` fails.
    pub fn reject_description(mut self, url: &str) -> FlakyStore {
        self.rejected_description = Some(url.to_string());
        self
    }

    fn down<T>() -> Result<T> {
        Err(ErrorKind::Unavailable("connection reset".to_string()).into())
    }
}

#[cfg(test)]
#[async_trait]
impl Store for FlakyStore {
    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
    async fn enqueue(&self, host: &str) -> Result<bool> {
        self.inner.enqueue(host).await
    }
    async fn frontier_entry(&self, host: &str) -> Result<Option<FrontierEntry>> {
        self.inner.frontier_entry(host).await
    }
    async fn next_pending(&self, exclude: &[String]) -> Result<Option<FrontierEntry>> {
        use std::sync::atomic::Ordering;
        let failing = self
            .next_pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Self::down();
        }
        self.inner.next_pending(exclude).await
    }
    async fn mark_crawled(&self, host: &str) -> Result<()> {
        self.inner.mark_crawled(host).await
    }
    async fn pending_count(&self) -> Result<i64> {
        self.inner.pending_count().await
    }
    async fn upsert_description(&self, page: &PageDescription) -> Result<()> {
        if self.rejected_description.as_deref() == Some(page.url.as_str()) {
            return Self::down();
        }
        self.inner.upsert_description(page).await
    }
    async fn description(&self, url: &str) -> Result<Option<String>> {
        self.inner.description(url).await
    }
    async fn description_count(&self) -> Result<i64> {
        self.inner.description_count().await
    }
    async fn indexed_urls(&self) -> Result<Vec<String>> {
        self.inner.indexed_urls().await
    }
    async fn upsert_ranks(&self, ranks: &[KeywordRank]) -> Result<()> {
        self.inner.upsert_ranks(ranks).await
    }
    async fn ranks_for(&self, keywords: &[String]) -> Result<Vec<KeywordRank>> {
        self.inner.ranks_for(keywords).await
    }
    async fn replace_tags(&self, tags: &[HtmlTag]) -> Result<()> {
        self.inner.replace_tags(tags).await
    }
    async fn tags(&self) -> Result<Vec<HtmlTag>> {
        self.inner.tags().await
    }
    async fn close(&self) {}
}
