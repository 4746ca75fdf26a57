// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

use async_trait::async_trait;
use deadpool_postgres::{ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

use crate::robot::memory::{
    FrontierEntry, HtmlTag, KeywordRank, PageDescription, PostgresServer, Result, Store,
};

// Serialises frontier inserts so that "max + 1" never hands out the same position twice.
const FRONTIER_LOCK: i64 = 0x524f_424f_54;

pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    pub async fn connect(server: &PostgresServer) -> Result<PostgresStore> {
        let (host, port) = server.host_and_port();

        let mut cfg = deadpool_postgres::Config::new();
        cfg.host = Some(host);
        cfg.port = port;
        cfg.user = Some(server.username.clone());
        cfg.password = Some(server.password.clone());
        cfg.dbname = Some(server.db_name.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(deadpool_postgres::PoolConfig::new(server.pool_size.max(1)));

        let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;
        let store = PostgresStore { pool };
        store.ping().await?;
        log::info!("POSTGRES: connected to {}", server);
        Ok(store)
    }

    async fn client(&self) -> Result<Object> {
        Ok(self.pool.get().await?)
    }

    /// Creates every table and index this service needs; safe to run on every boot.
    pub async fn build_tables(&self) -> Result<()> {
        let client = self.client().await?;

        let tables = [
            (FrontierEntry::sql_table_name(), FrontierEntry::sql_build_statement(), FrontierEntry::sql_indexes(), FrontierEntry::migrations()),
            (PageDescription::sql_table_name(), PageDescription::sql_build_statement(), PageDescription::sql_indexes(), PageDescription::migrations()),
            (KeywordRank::sql_table_name(), KeywordRank::sql_build_statement(), KeywordRank::sql_indexes(), KeywordRank::migrations()),
            (HtmlTag::sql_table_name(), HtmlTag::sql_build_statement(), HtmlTag::sql_indexes(), HtmlTag::migrations()),
        ];

        for (table_name, build_statement, indexes, migrations) in tables {
            client.batch_execute(build_statement).await?;
            log::info!("POSTGRES: CREATED '{}' TABLE", table_name);

            for idx_sql in indexes {
                match client.batch_execute(idx_sql).await {
                    Ok(_) => log::debug!("POSTGRES: Created index for '{}': {}", table_name, idx_sql),
                    Err(e) => log::warn!("POSTGRES: Failed to create index for '{}': {:?} ({})", table_name, idx_sql, e),
                }
            }

            for migration in migrations {
                if migration.trim().is_empty() {
                    continue;
                }
                match client.batch_execute(migration).await {
                    Ok(_) => log::info!("POSTGRES: MIGRATED '{}' TABLE", table_name),
                    Err(e) => log::warn!("POSTGRES: Migration failed for '{}': {:?}", table_name, e),
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn ping(&self) -> Result<()> {
        let client = self.client().await?;
        client.execute("SELECT 1", &[]).await?;
        Ok(())
    }

    async fn enqueue(&self, host: &str) -> Result<bool> {
        let mut client = self.client().await?;
        let tx = client.transaction().await?;
        tx.execute("SELECT pg_advisory_xact_lock($1)", &[&FRONTIER_LOCK]).await?;
        let inserted = tx
            .execute(
                "INSERT INTO robot_url (url, position, crawled)
                 SELECT $1, COALESCE(MAX(position), 0) + 1, FALSE FROM robot_url
                 ON CONFLICT (url) DO NOTHING",
                &[&host],
            )
            .await?;
        tx.commit().await?;
        Ok(inserted > 0)
    }

    async fn frontier_entry(&self, host: &str) -> Result<Option<FrontierEntry>> {
        let client = self.client().await?;
        let row = client
            .query_opt("SELECT url, position, crawled FROM robot_url WHERE url = $1", &[&host])
            .await?;
        Ok(row.as_ref().map(FrontierEntry::from_row))
    }

    async fn next_pending(&self, exclude: &[String]) -> Result<Option<FrontierEntry>> {
        let client = self.client().await?;
        let exclude: Vec<&str> = exclude.iter().map(String::as_str).collect();
        let row = client
            .query_opt(
                "SELECT url, position, crawled FROM robot_url
                 WHERE crawled = FALSE AND NOT (url = ANY($1))
                 ORDER BY position ASC LIMIT 1",
                &[&exclude],
            )
            .await?;
        Ok(row.as_ref().map(FrontierEntry::from_row))
    }

    async fn mark_crawled(&self, host: &str) -> Result<()> {
        let client = self.client().await?;
        client
            .execute("UPDATE robot_url SET crawled = TRUE WHERE url = $1", &[&host])
            .await?;
        Ok(())
    }

    async fn pending_count(&self) -> Result<i64> {
        let client = self.client().await?;
        let row = client
            .query_one("SELECT COUNT(*) FROM robot_url WHERE crawled = FALSE", &[])
            .await?;
        Ok(row.get(0))
    }

    async fn upsert_description(&self, page: &PageDescription) -> Result<()> {
        let client = self.client().await?;
        client
            .execute(
                "INSERT INTO url_description (url, description) VALUES ($1, $2)
                 ON CONFLICT (url) DO UPDATE SET description = EXCLUDED.description",
                &[&page.url, &page.description],
            )
            .await?;
        Ok(())
    }

    async fn description(&self, url: &str) -> Result<Option<String>> {
        let client = self.client().await?;
        let row = client
            .query_opt("SELECT url, description FROM url_description WHERE url = $1 LIMIT 1", &[&url])
            .await?;
        Ok(row.as_ref().map(|r| PageDescription::from_row(r).description))
    }

    async fn description_count(&self) -> Result<i64> {
        let client = self.client().await?;
        let row = client.query_one("SELECT COUNT(*) FROM url_description", &[]).await?;
        Ok(row.get(0))
    }

    async fn indexed_urls(&self) -> Result<Vec<String>> {
        let client = self.client().await?;
        let rows = client
            .query("SELECT url FROM url_description ORDER BY url", &[])
            .await?;
        Ok(rows.iter().map(|r| r.get("url")).collect())
    }

    async fn upsert_ranks(&self, ranks: &[KeywordRank]) -> Result<()> {
        if ranks.is_empty() {
            return Ok(());
        }
        let mut client = self.client().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare(
                "INSERT INTO url_keyword (url, keyword, rank) VALUES ($1, $2, $3)
                 ON CONFLICT (url, keyword) DO UPDATE SET rank = EXCLUDED.rank",
            )
            .await?;
        for rank in ranks {
            tx.execute(&stmt, &[&rank.url, &rank.keyword, &rank.rank]).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn ranks_for(&self, keywords: &[String]) -> Result<Vec<KeywordRank>> {
        if keywords.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.client().await?;
        let keywords: Vec<&str> = keywords.iter().map(String::as_str).collect();
        let rows = client
            .query(
                "SELECT url, keyword, rank FROM url_keyword WHERE keyword = ANY($1)",
                &[&keywords],
            )
            .await?;
        Ok(rows.iter().map(KeywordRank::from_row).collect())
    }

    async fn replace_tags(&self, tags: &[HtmlTag]) -> Result<()> {
        let mut client = self.client().await?;
        let tx = client.transaction().await?;
        tx.execute("DELETE FROM html_tags", &[]).await?;
        let stmt = tx
            .prepare("INSERT INTO html_tags (tag, count) VALUES ($1, $2)")
            .await?;
        for tag in tags {
            tx.execute(&stmt, &[&tag.tag, &tag.count]).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn tags(&self) -> Result<Vec<HtmlTag>> {
        let client = self.client().await?;
        let rows = client
            .query("SELECT tag, count FROM html_tags ORDER BY tag", &[])
            .await?;
        Ok(rows.iter().map(HtmlTag::from_row).collect())
    }

    async fn close(&self) {
        self.pool.close();
        log::info!("POSTGRES: connection pool closed");
    }
}
