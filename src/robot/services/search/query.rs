// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::robot::services::extractor;
use crate::robot::services::search::SearchError;
use crate::robot::tools;

// a quoted span is one term, anything else splits on whitespace
static TERMS: Lazy<Regex> = Lazy::new(|| match Regex::new(r#""[^"]+"|'[^']+'|\S+"#) {
    Ok(re) => re,
    Err(e) => unreachable!("query term regex failed to compile: {}", e),
});

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    And,
    #[default]
    Or,
}

impl FromStr for Operator {
    type Err = SearchError;
    fn from_str(input: &str) -> Result<Operator, SearchError> {
        match input.trim().to_uppercase().as_str() {
            "AND" => Ok(Operator::And),
            "OR" => Ok(Operator::Or),
            other => Err(SearchError::Input(format!(
                "Unsupported operator '{}'. Use AND or OR.",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub raw: String,
    pub keywords: Vec<String>,
    pub phrases: Vec<String>,
    pub operator: Operator,
}

impl Query {
    /// Splits `raw` into plain keywords and quoted phrases.
    ///
    /// Keywords are cleaned, lower-cased and length-filtered the same way page
    /// keywords are at extraction time; phrases keep their case (matching ignores it).
    pub fn parse(raw: &str, operator: Operator) -> Query {
        let mut keywords: Vec<String> = Vec::new();
        let mut phrases: Vec<String> = Vec::new();

        for term in TERMS.find_iter(raw).map(|m| m.as_str()) {
            if is_quoted(term) {
                let phrase = tools::collapse_whitespace(&term[1..term.len() - 1]);
                if !phrase.is_empty() && !phrases.contains(&phrase) {
                    phrases.push(phrase);
                }
                continue;
            }
            for token in extractor::clean(term).split_whitespace() {
                if token.chars().count() < extractor::MIN_KEYWORD_LEN {
                    continue;
                }
                let token = token.to_lowercase();
                if !keywords.contains(&token) {
                    keywords.push(token);
                }
            }
        }

        Query {
            raw: raw.to_string(),
            keywords,
            phrases,
            operator,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.phrases.is_empty()
    }
}

fn is_quoted(term: &str) -> bool {
    term.len() >= 2
        && ((term.starts_with('"') && term.ends_with('"'))
            || (term.starts_with('\'') && term.ends_with('\'')))
}
