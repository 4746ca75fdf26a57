// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;

use crate::robot::memory::{self, canonical_host, FrontierEntry, Store};

/// Crawl frontier shared by every worker.
///
/// Entries handed out by [`Frontier::next`] stay claimed until
/// [`Frontier::mark_crawled`], so two workers never fetch the same host.
pub struct Frontier {
    store: Arc<dyn Store>,
    in_flight: TokioMutex<HashSet<String>>,
}

impl Frontier {
    pub fn new(store: Arc<dyn Store>) -> Frontier {
        Frontier {
            store,
            in_flight: TokioMutex::new(HashSet::new()),
        }
    }

    /// Canonicalises `raw` and inserts it when unseen. `Ok(false)` for
    /// known hosts and for input with no usable host.
    pub async fn enqueue(&self, raw: &str) -> memory::Result<bool> {
        match canonical_host(raw) {
            Some(host) => self.store.enqueue(&host).await,
            None => {
                log::debug!("Skipping link without a usable host: {}", raw);
                Ok(false)
            }
        }
    }

    /// Enqueues every seed and returns how many were new.
    pub async fn seed(&self, seeds: &[String]) -> memory::Result<usize> {
        let mut added = 0;
        for seed in seeds {
            if self.enqueue(seed).await? {
                log::info!("Seeded frontier with {}", seed);
                added += 1;
            }
        }
        Ok(added)
    }

    /// Claims the lowest-position pending entry that nobody is working on.
    pub async fn next(&self) -> memory::Result<Option<FrontierEntry>> {
        let mut in_flight = self.in_flight.lock().await;
        let exclude: Vec<String> = in_flight.iter().cloned().collect();
        let entry = self.store.next_pending(&exclude).await?;
        if let Some(entry) = &entry {
            in_flight.insert(entry.url.clone());
        }
        Ok(entry)
    }

    /// Flags the entry crawled and releases the claim (even when the store write fails).
    pub async fn mark_crawled(&self, host: &str) -> memory::Result<()> {
        let result = self.store.mark_crawled(host).await;
        self.in_flight.lock().await.remove(host);
        result
    }

    pub async fn in_flight(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    pub async fn pending(&self) -> memory::Result<i64> {
        self.store.pending_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::memory::MemoryStore;

    fn frontier() -> (Arc<MemoryStore>, Frontier) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), Frontier::new(store))
    }

    #[tokio::test]
    async fn same_site_in_any_spelling_is_one_entry() {
        let (store, frontier) = frontier();
        assert!(frontier.enqueue("https://Example.com/shoes").await.unwrap());
        assert!(!frontier.enqueue("http://example.com/boots?x=1").await.unwrap());
        assert!(!frontier.enqueue("example.com").await.unwrap());
        assert!(!frontier.enqueue("mailto:me@example.com").await.unwrap());
        assert_eq!(store.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn re_enqueue_keeps_position() {
        let (store, frontier) = frontier();
        frontier.enqueue("a.com").await.unwrap();
        frontier.enqueue("b.com").await.unwrap();
        frontier.enqueue("https://a.com/again").await.unwrap();
        assert_eq!(store.frontier_entry("a.com").await.unwrap().unwrap().position, 1);
        assert_eq!(store.frontier_entry("b.com").await.unwrap().unwrap().position, 2);
    }

    #[tokio::test]
    async fn claimed_entries_are_not_handed_out_twice() {
        let (_store, frontier) = frontier();
        frontier.seed(&["a.com".to_string(), "b.com".to_string()]).await.unwrap();

        let first = frontier.next().await.unwrap().unwrap();
        let second = frontier.next().await.unwrap().unwrap();
        assert_eq!(first.url, "a.com");
        assert_eq!(second.url, "b.com");
        assert!(frontier.next().await.unwrap().is_none());
        assert_eq!(frontier.in_flight().await, 2);

        frontier.mark_crawled("a.com").await.unwrap();
        frontier.mark_crawled("b.com").await.unwrap();
        assert_eq!(frontier.in_flight().await, 0);
        assert_eq!(frontier.pending().await.unwrap(), 0);
    }
}
