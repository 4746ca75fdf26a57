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

/// Maximum stored description length, in characters.
pub const DESCRIPTION_LIMIT: usize = 200;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PageDescription {
    pub url: String,
    pub description: String,
}

impl PageDescription {
    pub fn new(url: String, description: String) -> PageDescription {
        PageDescription {
            url,
            description: crate::robot::tools::truncate_chars(&description, DESCRIPTION_LIMIT),
        }
    }

    pub fn sql_table_name() -> String {
        "url_description".to_string()
    }

    pub fn sql_build_statement() -> &'static str {
        "CREATE TABLE IF NOT EXISTS url_description (
            url varchar NOT NULL PRIMARY KEY,
            description varchar(200) NOT NULL
        );"
    }

    pub fn sql_indexes() -> Vec<&'static str> {
        vec![]
    }

    pub fn migrations() -> Vec<&'static str> {
        vec![]
    }

    pub fn from_row(row: &Row) -> PageDescription {
        PageDescription {
            url: row.get("url"),
            description: row.get("description"),
        }
    }
}

/// Occurrence count of one keyword inside one crawled page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KeywordRank {
    pub url: String,
    pub keyword: String,
    pub rank: i64,
}

impl KeywordRank {
    pub fn new(url: String, keyword: String, rank: i64) -> KeywordRank {
        KeywordRank { url, keyword, rank }
    }

    pub fn sql_table_name() -> String {
        "url_keyword".to_string()
    }

    pub fn sql_build_statement() -> &'static str {
        "CREATE TABLE IF NOT EXISTS url_keyword (
            url varchar NOT NULL,
            keyword varchar NOT NULL,
            rank BIGINT NOT NULL,
            UNIQUE (url, keyword)
        );"
    }

    pub fn sql_indexes() -> Vec<&'static str> {
        vec![
            "CREATE INDEX IF NOT EXISTS idx_url_keyword_keyword ON url_keyword (keyword);",
        ]
    }

    pub fn migrations() -> Vec<&'static str> {
        vec![]
    }

    pub fn from_row(row: &Row) -> KeywordRank {
        KeywordRank {
            url: row.get("url"),
            keyword: row.get("keyword"),
            rank: row.get("rank"),
        }
    }
}

/// One row of the most recent tag census.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HtmlTag {
    pub tag: String,
    pub count: i64,
}

impl HtmlTag {
    pub fn sql_table_name() -> String {
        "html_tags".to_string()
    }

    pub fn sql_build_statement() -> &'static str {
        "CREATE TABLE IF NOT EXISTS html_tags (
            tag varchar NOT NULL PRIMARY KEY,
            count BIGINT NOT NULL
        );"
    }

    pub fn sql_indexes() -> Vec<&'static str> {
        vec![]
    }

    pub fn migrations() -> Vec<&'static str> {
        vec![]
    }

    pub fn from_row(row: &Row) -> HtmlTag {
        HtmlTag {
            tag: row.get("tag"),
            count: row.get("count"),
        }
    }
}
