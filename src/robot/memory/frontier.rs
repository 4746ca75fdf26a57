// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use url::Url;

/// A discovered host waiting in (or already drained from) the crawl frontier.
///
/// `url` always holds a canonical host (see [`canonical_host`]), never a full url.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub position: i64,
    pub crawled: bool,
}

impl FrontierEntry {
    pub fn new(url: String, position: i64) -> FrontierEntry {
        FrontierEntry {
            url,
            position,
            crawled: false,
        }
    }

    /// The url a fetcher should request for this entry.
    pub fn fetch_url(&self) -> String {
        format!("https://{}/", self.url)
    }

    pub fn sql_table_name() -> String {
        "robot_url".to_string()
    }

    pub fn sql_build_statement() -> &'static str {
        "CREATE TABLE IF NOT EXISTS robot_url (
            url varchar NOT NULL PRIMARY KEY,
            position BIGINT NOT NULL UNIQUE,
            crawled BOOLEAN NOT NULL DEFAULT FALSE
        );"
    }

    pub fn sql_indexes() -> Vec<&'static str> {
        vec![
            "CREATE INDEX IF NOT EXISTS idx_robot_url_pending ON robot_url (crawled, position);",
        ]
    }

    pub fn migrations() -> Vec<&'static str> {
        vec![]
    }

    pub fn from_row(row: &Row) -> FrontierEntry {
        FrontierEntry {
            url: row.get("url"),
            position: row.get("position"),
            crawled: row.get("crawled"),
        }
    }
}

/// Reduces a seed, a link or a bare host to the frontier's unique key.
///
/// Scheme, credentials, path, query and fragment are dropped; the host is
/// lower-cased and loses any trailing dot; a non-default port is kept.
/// `None` when no host can be recovered.
///
/// Every frontier write and lookup goes through this function. Mixing raw
/// urls and hosts would let the same site be crawled more than once.
pub fn canonical_host(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = if raw.contains("://") {
        Url::parse(raw).ok()?
    } else if has_opaque_scheme(raw) {
        return None;
    } else {
        Url::parse(&format!("https://{}", raw.trim_start_matches('/'))).ok()?
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }

    let host = parsed.host_str()?.trim_end_matches('.').to_lowercase();
    if host.is_empty() {
        return None;
    }

    match parsed.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

// mailto:, javascript:, tel:, data: ... but not `host:port`
fn has_opaque_scheme(raw: &str) -> bool {
    let (scheme, rest) = match raw.split_once(':') {
        Some(parts) => parts,
        None => return false,
    };
    let scheme_like = scheme.chars().next().map_or(false, |c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '.' || c == '-');
    let port: String = rest.chars().take_while(|c| *c != '/').collect();
    let is_port = !port.is_empty() && port.chars().all(|c| c.is_ascii_digit());
    scheme_like && !is_port
}
