// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = ();
    fn from_str(input: &str) -> std::result::Result<StoreKind, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreKind::Postgres),
            "memory" | "mem" => Ok(StoreKind::Memory),
            _ => Err(()),
        }
    }
}

/// What `GET /start` does with the crawl it triggers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Answer once the crawl loop reaches Done.
    Wait,
    /// Spawn the crawl and answer immediately.
    Detach,
}

impl FromStr for StartMode {
    type Err = ();
    fn from_str(input: &str) -> std::result::Result<StartMode, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "wait" | "sync" => Ok(StartMode::Wait),
            "detach" | "async" => Ok(StartMode::Detach),
            _ => Err(()),
        }
    }
}

// PostgresServer config struct
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PostgresServer {
    pub db_name: String,
    pub username: String,
    pub password: String,
    pub address: String,
    pub pool_size: usize,
}

impl Default for PostgresServer {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresServer {
    pub fn new() -> PostgresServer {
        PostgresServer {
            db_name: env_or("PG_DBNAME", "robot"),
            username: env_or("PG_USER", "robot"),
            password: env_or("PG_PASS", "robot"),
            address: env_or("PG_ADDRESS", "localhost"),
            pool_size: env_parse("PG_POOL_SIZE", 16),
        }
    }

    /// Splits `address` into host and optional port.
    pub fn host_and_port(&self) -> (String, Option<u16>) {
        match self.address.rsplit_once(':') {
            Some((host, port)) => match port.parse::<u16>() {
                Ok(port) => (host.to_string(), Some(port)),
                Err(_) => (self.address.clone(), None),
            },
            None => (self.address.clone(), None),
        }
    }
}

impl fmt::Display for PostgresServer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "postgresql://{}@{}/{}", self.username, self.address, self.db_name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub store: StoreKind,
    pub postgres: PostgresServer,
    pub http_address: String,
    pub seeds: Vec<String>,
    pub autostart: bool,
    pub start_mode: StartMode,
    /// Crawl worker pool size (W).
    pub workers: usize,
    /// Stop once this many descriptions are stored (N).
    pub threshold: i64,
    /// Keyword budget per page (K).
    pub max_keywords: usize,
    /// Fetch strategies, in fallback order.
    pub strategies: Vec<String>,
    pub retries: usize,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
    pub fetch_timeout: Duration,
    pub phrase_timeout: Duration,
    pub chrome: Option<PathBuf>,
    pub render_settle: Duration,
    pub version_installed: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store: StoreKind::Postgres,
            postgres: PostgresServer::new(),
            http_address: "0.0.0.0:12348".to_string(),
            seeds: Vec::new(),
            autostart: true,
            start_mode: StartMode::Wait,
            workers: default_workers(),
            threshold: 500,
            max_keywords: 10,
            strategies: vec!["http".to_string(), "render".to_string()],
            retries: 3,
            backoff_min: Duration::from_millis(1000),
            backoff_max: Duration::from_millis(10_000),
            fetch_timeout: Duration::from_secs(30),
            phrase_timeout: Duration::from_secs(45),
            chrome: None,
            render_settle: Duration::from_millis(1500),
            version_installed: option_env!("CARGO_PKG_VERSION").unwrap_or("unknown").to_string(),
        }
    }
}

impl Config {
    /// Reads every `ROBOT_*` and `PG_*` variable, keeping defaults for the rest.
    pub fn from_env() -> Config {
        let defaults = Config::default();
        Config {
            store: env_parse("ROBOT_STORE", defaults.store),
            postgres: PostgresServer::new(),
            http_address: env_or("ROBOT_HTTP_ADDRESS", &defaults.http_address),
            seeds: env_list("ROBOT_SEEDS").unwrap_or(defaults.seeds),
            autostart: env_bool("ROBOT_AUTOSTART", defaults.autostart),
            start_mode: env_parse("ROBOT_START_MODE", defaults.start_mode),
            workers: env_parse("ROBOT_WORKERS", defaults.workers).max(1),
            threshold: env_parse("ROBOT_THRESHOLD", defaults.threshold),
            max_keywords: env_parse("ROBOT_MAX_KEYWORDS", defaults.max_keywords),
            strategies: env_list("ROBOT_STRATEGIES").unwrap_or(defaults.strategies),
            retries: env_parse("ROBOT_RETRIES", defaults.retries).max(1),
            backoff_min: Duration::from_millis(env_parse("ROBOT_BACKOFF_MIN_MS", 1000)),
            backoff_max: Duration::from_millis(env_parse("ROBOT_BACKOFF_MAX_MS", 10_000)),
            fetch_timeout: Duration::from_secs(env_parse("ROBOT_FETCH_TIMEOUT_SECS", 30)),
            phrase_timeout: Duration::from_secs(env_parse("ROBOT_PHRASE_TIMEOUT_SECS", 45)),
            chrome: env::var("ROBOT_CHROME").ok().filter(|s| !s.trim().is_empty()).map(PathBuf::from),
            render_settle: Duration::from_millis(env_parse("ROBOT_RENDER_SETTLE_MS", 1500)),
            version_installed: defaults.version_installed,
        }
    }
}

fn default_workers() -> usize {
    num_cpus::get().clamp(5, 10)
}

fn env_or(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                log::warn!("Ignoring invalid value for ${}: '{}'", name, value);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                log::warn!("Ignoring invalid value for ${}: '{}'", name, value);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_list(name: &str) -> Option<Vec<String>> {
    let value = env::var(name).ok()?;
    Some(
        value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store_and_start_mode() {
        assert_eq!("Memory".parse::<StoreKind>(), Ok(StoreKind::Memory));
        assert_eq!("pg".parse::<StoreKind>(), Ok(StoreKind::Postgres));
        assert!("redis".parse::<StoreKind>().is_err());
        assert_eq!("detach".parse::<StartMode>(), Ok(StartMode::Detach));
        assert_eq!(" WAIT ".parse::<StartMode>(), Ok(StartMode::Wait));
    }

    #[test]
    fn splits_host_and_port() {
        let mut server = PostgresServer::new();
        server.address = "db.internal:6543".to_string();
        assert_eq!(server.host_and_port(), ("db.internal".to_string(), Some(6543)));
        server.address = "localhost".to_string();
        assert_eq!(server.host_and_port(), ("localhost".to_string(), None));
    }

    #[test]
    fn defaults_match_crawl_constants() {
        let config = Config::default();
        assert_eq!(config.threshold, 500);
        assert_eq!(config.max_keywords, 10);
        assert_eq!(config.retries, 3);
        assert!((5..=10).contains(&config.workers));
        assert_eq!(config.strategies, vec!["http", "render"]);
    }
}
