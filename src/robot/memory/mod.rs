// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

pub mod config;
pub mod frontier;
pub mod page;
pub mod pg;
pub mod volatile;

// Re-export types for convenience
pub use config::{Config, PostgresServer, StartMode, StoreKind};
pub use frontier::{canonical_host, FrontierEntry};
pub use page::{HtmlTag, KeywordRank, PageDescription, DESCRIPTION_LIMIT};
pub use pg::PostgresStore;
pub use volatile::MemoryStore;
#[cfg(test)]
pub use volatile::{FlakyStore, UnavailableStore};

// ===== Shared error_chain! block =====
use error_chain::error_chain;
error_chain! {
    foreign_links {
        Io(std::io::Error);
        TokioPg(tokio_postgres::Error);
        Pool(deadpool_postgres::PoolError);
        CreatePool(deadpool_postgres::CreatePoolError);
    }

    errors {
        Unavailable(msg: String) {
            description("store unavailable")
            display("store unavailable: {}", msg)
        }
    }
}

use async_trait::async_trait;
use std::sync::Arc;

/// Persistent state of the crawler and the search index.
///
/// All writes are single-statement upserts keyed by host, url or
/// (url, keyword), so concurrent workers never lose each other's updates.
/// Frontier methods take hosts that already went through [`canonical_host`].
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<()>;

    /// Inserts `host` at position max + 1. Returns `false` (and changes
    /// nothing) when the host is already present.
    async fn enqueue(&self, host: &str) -> Result<bool>;
    async fn frontier_entry(&self, host: &str) -> Result<Option<FrontierEntry>>;
    /// Lowest-position entry that is not crawled and not in `exclude`.
    async fn next_pending(&self, exclude: &[String]) -> Result<Option<FrontierEntry>>;
    async fn mark_crawled(&self, host: &str) -> Result<()>;
    async fn pending_count(&self) -> Result<i64>;

    async fn upsert_description(&self, page: &PageDescription) -> Result<()>;
    async fn description(&self, url: &str) -> Result<Option<String>>;
    async fn description_count(&self) -> Result<i64>;
    async fn indexed_urls(&self) -> Result<Vec<String>>;

    /// Overwrites (never accumulates) the rank of each (url, keyword).
    async fn upsert_ranks(&self, ranks: &[KeywordRank]) -> Result<()>;
    async fn ranks_for(&self, keywords: &[String]) -> Result<Vec<KeywordRank>>;

    async fn replace_tags(&self, tags: &[HtmlTag]) -> Result<()>;
    async fn tags(&self) -> Result<Vec<HtmlTag>>;

    async fn close(&self);
}

/// Opens the store selected by `config.store`, creating tables when needed.
pub async fn open(config: &Config) -> Result<Arc<dyn Store>> {
    match config.store {
        StoreKind::Memory => {
            log::info!("Using in-memory store (nothing is persisted)");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreKind::Postgres => {
            let store = PostgresStore::connect(&config.postgres).await?;
            store.build_tables().await?;
            Ok(Arc::new(store))
        }
    }
}
