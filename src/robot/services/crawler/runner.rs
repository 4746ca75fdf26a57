// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;
use tokio::time::{sleep, Duration};

use crate::robot::memory::{Config, FrontierEntry, StartMode, Store};
use crate::robot::services::crawler::Frontier;
use crate::robot::services::extractor;
use crate::robot::services::fetcher::{FetchMode, Fetcher};
use crate::robot::services::indexer::Indexer;
use crate::robot::services::Result;

// How long an idle worker waits for busy workers to discover more hosts.
const IDLE_WAIT: Duration = Duration::from_millis(250);
// Consecutive frontier failures a worker tolerates before giving up.
const MAX_STORE_FAILURES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Fetching,
    Extracting,
    Indexing,
    Done,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            WorkerState::Idle => "idle",
            WorkerState::Fetching => "fetching",
            WorkerState::Extracting => "extracting",
            WorkerState::Indexing => "indexing",
            WorkerState::Done => "done",
        };
        write!(f, "{}", name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    FrontierEmpty,
    Threshold,
    StoreUnavailable,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CrawlReport {
    pub crawled: usize,
    pub failed: usize,
    pub indexed: usize,
    pub stop_reason: StopReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum Start {
    Finished(CrawlReport),
    Started,
    AlreadyRunning,
}

#[derive(Default)]
struct Stats {
    crawled: AtomicUsize,
    failed: AtomicUsize,
    indexed: AtomicUsize,
}

/// Drains the frontier through fetch, extract and index with `workers`
/// concurrent pipelines until it is empty or `threshold` pages are described.
pub struct Crawler {
    store: Arc<dyn Store>,
    frontier: Arc<Frontier>,
    fetcher: Arc<Fetcher>,
    indexer: Indexer,
    workers: usize,
    threshold: i64,
    max_keywords: usize,
    running: AtomicBool,
    last_report: TokioMutex<Option<CrawlReport>>,
}

impl Crawler {
    pub fn new(store: Arc<dyn Store>, fetcher: Arc<Fetcher>, config: &Config) -> Crawler {
        let frontier = Arc::new(Frontier::new(store.clone()));
        Crawler {
            indexer: Indexer::new(store.clone(), frontier.clone()),
            store,
            frontier,
            fetcher,
            workers: config.workers.max(1),
            threshold: config.threshold,
            max_keywords: config.max_keywords,
            running: AtomicBool::new(false),
            last_report: TokioMutex::new(None),
        }
    }

    pub fn frontier(&self) -> &Arc<Frontier> {
        &self.frontier
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn last_report(&self) -> Option<CrawlReport> {
        self.last_report.lock().await.clone()
    }

    /// Starts a crawl unless one is already running. An unreachable store
    /// is reported as an error before anything is claimed.
    pub async fn start(self: &Arc<Self>, mode: StartMode) -> Result<Start> {
        self.store.ping().await?;

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(Start::AlreadyRunning);
        }

        match mode {
            StartMode::Wait => Ok(Start::Finished(self.clone().run_claimed().await)),
            StartMode::Detach => {
                let crawler = self.clone();
                tokio::spawn(async move {
                    crawler.run_claimed().await;
                });
                Ok(Start::Started)
            }
        }
    }

    async fn run_claimed(self: Arc<Self>) -> CrawlReport {
        log::info!("Crawler service starting with {} workers...", self.workers);
        let started_at = Utc::now();
        let stats = Arc::new(Stats::default());

        let handles: Vec<_> = (0..self.workers)
            .map(|id| {
                let crawler = self.clone();
                let stats = stats.clone();
                tokio::spawn(async move { crawler.worker(id, &stats).await })
            })
            .collect();

        let mut stop_reason = StopReason::FrontierEmpty;
        for handle in futures::future::join_all(handles).await {
            match handle {
                Ok(StopReason::FrontierEmpty) => {}
                Ok(reason) => {
                    if stop_reason == StopReason::FrontierEmpty {
                        stop_reason = reason;
                    }
                }
                Err(e) => log::error!("Crawler worker panicked: {}", e),
            }
        }

        let report = CrawlReport {
            crawled: stats.crawled.load(Ordering::SeqCst),
            failed: stats.failed.load(Ordering::SeqCst),
            indexed: stats.indexed.load(Ordering::SeqCst),
            stop_reason,
            started_at,
            finished_at: Utc::now(),
        };
        log::info!(
            "Crawler service stopped ({:?}): {} crawled, {} indexed, {} failed",
            report.stop_reason,
            report.crawled,
            report.indexed,
            report.failed
        );

        *self.last_report.lock().await = Some(report.clone());
        self.running.store(false, Ordering::SeqCst);
        report
    }

    async fn worker(&self, id: usize, stats: &Stats) -> StopReason {
        let mut store_failures: u32 = 0;
        loop {
            log::debug!("worker {}: {}", id, WorkerState::Idle);

            match self.store.description_count().await {
                Ok(count) if count >= self.threshold => {
                    log::debug!("worker {}: {} ({} descriptions)", id, WorkerState::Done, count);
                    return StopReason::Threshold;
                }
                Ok(_) => {}
                Err(e) => log::warn!("worker {}: could not count descriptions: {}", id, e),
            }

            let entry = match self.frontier.next().await {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    if self.frontier.in_flight().await > 0 {
                        sleep(IDLE_WAIT).await;
                        continue;
                    }
                    match self.frontier.pending().await {
                        Ok(0) => {
                            log::debug!("worker {}: {}", id, WorkerState::Done);
                            return StopReason::FrontierEmpty;
                        }
                        Ok(_) => {
                            store_failures = 0;
                            continue;
                        }
                        Err(e) => {
                            if back_off(id, &mut store_failures, &e).await {
                                continue;
                            }
                            return StopReason::StoreUnavailable;
                        }
                    }
                }
                Err(e) => {
                    if back_off(id, &mut store_failures, &e).await {
                        continue;
                    }
                    return StopReason::StoreUnavailable;
                }
            };
            store_failures = 0;

            self.crawl_entry(id, &entry, stats).await;

            if let Err(e) = self.frontier.mark_crawled(&entry.url).await {
                log::error!("worker {}: failed to mark {} crawled: {}", id, entry.url, e);
            }
            stats.crawled.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Fetch, extract and index one entry. Every failure is logged and
    /// swallowed so the entry can be marked crawled regardless.
    async fn crawl_entry(&self, id: usize, entry: &FrontierEntry, stats: &Stats) {
        let url = entry.fetch_url();

        log::debug!("worker {}: {} {}", id, WorkerState::Fetching, url);
        let html = match self.fetcher.fetch(&url, FetchMode::Auto).await {
            Ok(html) => html,
            Err(e) => {
                log::warn!("Error fetching URL {}: {}", url, e);
                stats.failed.fetch_add(1, Ordering::SeqCst);
                return;
            }
        };

        log::debug!("worker {}: {} {}", id, WorkerState::Extracting, url);
        let max_keywords = self.max_keywords;
        let page = html.clone();
        let extraction = match tokio::task::spawn_blocking(move || extractor::extract(&page, max_keywords)).await {
            Ok(extraction) => extraction,
            Err(e) => {
                log::error!("Extraction of {} panicked: {}", url, e);
                stats.failed.fetch_add(1, Ordering::SeqCst);
                return;
            }
        };
        if extraction.description.is_empty() {
            log::debug!("No description found for {}", url);
        }

        log::debug!("worker {}: {} {}", id, WorkerState::Indexing, url);
        match self
            .indexer
            .index(&url, &html, &extraction.keywords, &extraction.description)
            .await
        {
            Ok(report) => {
                stats.indexed.fetch_add(1, Ordering::SeqCst);
                log::info!(
                    "Indexed URL: {} ({} keywords, {} links, {} new hosts)",
                    url,
                    report.ranked,
                    report.links,
                    report.enqueued
                );
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::SeqCst);
                log::error!("Failed to index {}: {}", url, e);
            }
        }
    }
}

/// Sleeps with a growing delay after a frontier failure. Returns `false`
/// once `MAX_STORE_FAILURES` consecutive failures have been seen.
fn back_off(
    id: usize,
    failures: &mut u32,
    e: &crate::robot::memory::Error,
) -> impl std::future::Future<Output = bool> + Send + 'static {
    *failures += 1;
    let delay = if *failures >= MAX_STORE_FAILURES {
        log::error!("worker {}: frontier unavailable after {} attempts: {}", id, failures, e);
        None
    } else {
        log::warn!("worker {}: frontier unavailable ({}/{}), retrying: {}", id, failures, MAX_STORE_FAILURES, e);
        Some(IDLE_WAIT * *failures)
    };
    async move {
        match delay {
            Some(d) => {
                sleep(d).await;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::memory::{FlakyStore, MemoryStore};
    use crate::robot::services::fetcher::testing::ScriptedStrategy;
    use crate::robot::services::fetcher::{RetryPolicy, Strategy};

    fn config(workers: usize, threshold: i64) -> Config {
        Config {
            workers,
            threshold,
            ..Config::default()
        }
    }

    fn crawler(store: Arc<dyn Store>, http: ScriptedStrategy, config: &Config) -> Arc<Crawler> {
        let strategies: Vec<Arc<dyn Strategy>> = vec![Arc::new(http)];
        let fetcher = Arc::new(Fetcher::new(strategies, RetryPolicy::immediate(2, Duration::from_secs(5))));
        Arc::new(Crawler::new(store, fetcher, config))
    }

    async fn finish(crawler: &Arc<Crawler>) -> CrawlReport {
        match crawler.start(StartMode::Wait).await.unwrap() {
            Start::Finished(report) => report,
            other => panic!("unexpected start outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_frontier_finishes_immediately() {
        let store = Arc::new(MemoryStore::new());
        let crawler = crawler(store, ScriptedStrategy::new("http"), &config(4, 500));
        let report = finish(&crawler).await;
        assert_eq!(report.crawled, 0);
        assert_eq!(report.stop_reason, StopReason::FrontierEmpty);
        assert!(!crawler.is_running());
    }

    #[tokio::test]
    async fn follows_links_to_new_hosts() {
        let store = Arc::new(MemoryStore::new());
        let http = ScriptedStrategy::new("http")
            .page(
                "https://shop.example/",
                r#"<meta name="description" content="Buy shoes online">
                   <p>shoes shoes shoes shoes</p><a href="https://blog.example/post">blog</a>"#,
            )
            .page("https://blog.example/", r#"<title>Shoe blog</title><a href="https://shop.example/">shop</a>"#);
        let crawler = crawler(store.clone(), http, &config(3, 500));
        crawler.frontier().seed(&["https://shop.example".to_string()]).await.unwrap();

        let report = finish(&crawler).await;
        assert_eq!(report.crawled, 2);
        assert_eq!(report.indexed, 2);
        assert_eq!(report.stop_reason, StopReason::FrontierEmpty);
        assert_eq!(store.pending_count().await.unwrap(), 0);
        assert_eq!(
            store.description("https://shop.example/").await.unwrap().as_deref(),
            Some("Buy shoes online")
        );
        let ranks = store.ranks_for(&["shoes".to_string()]).await.unwrap();
        assert_eq!(ranks, vec![crate::robot::memory::KeywordRank::new("https://shop.example/".into(), "shoes".into(), 5)]);
    }

    #[tokio::test]
    async fn failed_fetch_is_marked_crawled_and_skipped() {
        let store = Arc::new(MemoryStore::new());
        let http = ScriptedStrategy::new("http")
            .fail_always("https://down.example/")
            .page("https://up.example/", "<title>Up</title>");
        let crawler = crawler(store.clone(), http, &config(2, 500));
        crawler
            .frontier()
            .seed(&["down.example".to_string(), "up.example".to_string()])
            .await
            .unwrap();

        let report = finish(&crawler).await;
        assert_eq!(report.crawled, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.indexed, 1);
        assert!(store.frontier_entry("down.example").await.unwrap().unwrap().crawled);
        assert_eq!(store.description_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn stops_at_description_threshold() {
        let store = Arc::new(MemoryStore::new());
        let http = ScriptedStrategy::new("http")
            .page("https://a.example/", r#"<title>A</title><a href="https://b.example/">b</a>"#)
            .page("https://b.example/", r#"<title>B</title><a href="https://c.example/">c</a>"#)
            .page("https://c.example/", "<title>C</title>");
        let crawler = crawler(store.clone(), http, &config(1, 1));
        crawler.frontier().seed(&["a.example".to_string()]).await.unwrap();

        let report = finish(&crawler).await;
        assert_eq!(report.stop_reason, StopReason::Threshold);
        assert_eq!(report.indexed, 1);
        assert_eq!(store.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn second_start_while_running_is_refused() {
        let store = Arc::new(MemoryStore::new());
        let crawler = crawler(store, ScriptedStrategy::new("http"), &config(1, 500));
        crawler.running.store(true, Ordering::SeqCst);
        assert!(matches!(crawler.start(StartMode::Wait).await.unwrap(), Start::AlreadyRunning));
    }

    #[tokio::test]
    async fn detached_start_returns_before_the_crawl_ends() {
        let store = Arc::new(MemoryStore::new());
        let http = ScriptedStrategy::new("http")
            .page("https://slow.example/", "<title>Slow</title>")
            .delay(Duration::from_millis(50));
        let crawler = crawler(store.clone(), http, &config(1, 500));
        crawler.frontier().seed(&["slow.example".to_string()]).await.unwrap();

        assert!(matches!(crawler.start(StartMode::Detach).await.unwrap(), Start::Started));
        for _ in 0..100 {
            if !crawler.is_running() {
                break;
            }
            sleep(Duration::from_millis(20)).await;
        }
        let report = crawler.last_report().await.unwrap();
        assert_eq!(report.indexed, 1);
        assert_eq!(store.description("https://slow.example/").await.unwrap().as_deref(), Some("Slow"));
    }

    #[tokio::test]
    async fn frontier_blip_does_not_end_the_crawl() {
        let store = Arc::new(FlakyStore::new().fail_next_pending(1));
        let http = ScriptedStrategy::new("http").page("https://a.example/", "<title>A</title>");
        let crawler = crawler(store.clone(), http, &config(1, 500));
        crawler.frontier().seed(&["a.example".to_string()]).await.unwrap();

        let report = finish(&crawler).await;
        assert_eq!(report.stop_reason, StopReason::FrontierEmpty);
        assert_eq!(report.crawled, 1);
        assert_eq!(report.indexed, 1);
        assert_eq!(store.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn persistent_frontier_failure_stops_the_worker() {
        let store = Arc::new(FlakyStore::new().fail_next_pending(usize::MAX));
        let crawler = crawler(store.clone(), ScriptedStrategy::new("http"), &config(1, 500));
        crawler.frontier().seed(&["a.example".to_string()]).await.unwrap();

        let report = finish(&crawler).await;
        assert_eq!(report.stop_reason, StopReason::StoreUnavailable);
        assert_eq!(report.crawled, 0);
        assert!(!crawler.is_running());
    }

    #[tokio::test]
    async fn index_failure_skips_only_that_page() {
        let store = Arc::new(FlakyStore::new().reject_description("https://bad.example/"));
        let http = ScriptedStrategy::new("http")
            .page("https://bad.example/", "<title>Bad</title>")
            .page("https://good.example/", "<title>Good</title>");
        let crawler = crawler(store.clone(), http, &config(2, 500));
        crawler
            .frontier()
            .seed(&["bad.example".to_string(), "good.example".to_string()])
            .await
            .unwrap();

        let report = finish(&crawler).await;
        assert_eq!(report.stop_reason, StopReason::FrontierEmpty);
        assert_eq!(report.crawled, 2);
        assert_eq!(report.indexed, 1);
        assert_eq!(report.failed, 1);
        assert!(store.frontier_entry("bad.example").await.unwrap().unwrap().crawled);
        assert_eq!(store.description("https://good.example/").await.unwrap().as_deref(), Some("Good"));
        assert_eq!(store.pending_count().await.unwrap(), 0);
    }
}
