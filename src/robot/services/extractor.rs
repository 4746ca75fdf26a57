// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

//! Keyword and description extraction.
//!
//! The description is the first non-empty of: meta description (or
//! `og:description`), `<title>`, the first heading, the body text. Keywords
//! come from the meta keywords tag plus the source that won the description
//! (every heading, when the headings win).

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::robot::memory::DESCRIPTION_LIMIT;
use crate::robot::tools;

/// Shorter tokens are never indexed.
pub const MIN_KEYWORD_LEN: usize = 3;
const SKIPPED_TEXT: [&str; 5] = ["script", "style", "noscript", "template", "svg"];

static META: Lazy<Selector> = Lazy::new(|| selector("meta"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static HEADINGS: Lazy<Selector> = Lazy::new(|| selector("h1, h2, h3, h4, h5, h6"));
static BODY: Lazy<Selector> = Lazy::new(|| selector("body"));

static TAGS: Lazy<Regex> = Lazy::new(|| regex("<[^>]*>"));
static LINK_ATTRS: Lazy<Regex> = Lazy::new(|| regex(r#"(?i)\b(?:src|href)\s*=\s*(?:"[^"]*"|'[^']*'|\S+)"#));
static PUNCTUATION: Lazy<Regex> = Lazy::new(|| regex(r"[\p{P}\p{S}]+"));

fn selector(css: &str) -> Selector {
    match Selector::parse(css) {
        Ok(s) => s,
        Err(e) => unreachable!("static selector {:?} failed to parse: {:?}", css, e),
    }
}

fn regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(r) => r,
        Err(e) => unreachable!("static regex {:?} failed to compile: {}", pattern, e),
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    pub keywords: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionSource {
    Meta,
    Title,
    Heading,
    Body,
    Nothing,
}

/// Ordered, de-duplicated keyword budget. Stops accepting tokens once full.
struct Keywords {
    limit: usize,
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl Keywords {
    fn new(limit: usize) -> Keywords {
        Keywords {
            limit,
            seen: HashSet::new(),
            ordered: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.ordered.len() >= self.limit
    }

    fn add(&mut self, text: &str) {
        if self.is_full() {
            return;
        }
        for token in clean(text).split_whitespace() {
            if token.chars().count() < MIN_KEYWORD_LEN {
                continue;
            }
            let token = token.to_lowercase();
            if self.seen.insert(token.clone()) {
                self.ordered.push(token);
                if self.is_full() {
                    return;
                }
            }
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

/// Strips markup, link attribute fragments and punctuation from a candidate string.
pub fn clean(text: &str) -> String {
    let text = TAGS.replace_all(text, " ");
    let text = LINK_ATTRS.replace_all(&text, " ");
    PUNCTUATION.replace_all(&text, " ").into_owned()
}

fn meta_content(document: &Html, names: &[&str]) -> Option<String> {
    for meta in document.select(&META) {
        let element = meta.value();
        let key = element
            .attr("name")
            .or_else(|| element.attr("property"))
            .map(|k| k.trim().to_lowercase());
        if let Some(key) = key {
            if names.contains(&key.as_str()) {
                if let Some(content) = element.attr("content") {
                    let content = tools::collapse_whitespace(content);
                    if !content.is_empty() {
                        return Some(content);
                    }
                }
            }
        }
    }
    None
}

/// Text of an element, skipping script-like children.
fn visible_text(element: ElementRef) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    tools::collapse_whitespace(&out)
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) => {
                if SKIPPED_TEXT.contains(&el.name()) {
                    continue;
                }
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
            }
            _ => {}
        }
    }
}

/// Pulls at most `max_keywords` keywords and a description out of `html`.
pub fn extract(html: &str, max_keywords: usize) -> Extraction {
    extract_with_source(html, max_keywords).0
}

pub fn extract_with_source(html: &str, max_keywords: usize) -> (Extraction, DescriptionSource) {
    let document = Html::parse_document(html);
    let mut keywords = Keywords::new(max_keywords);

    if let Some(meta_keywords) = meta_content(&document, &["keywords"]) {
        keywords.add(&meta_keywords);
    }

    let mut source = DescriptionSource::Nothing;
    let mut description = String::new();

    if let Some(meta) = meta_content(&document, &["description", "og:description"]) {
        keywords.add(&meta);
        description = meta;
        source = DescriptionSource::Meta;
    }

    if description.is_empty() {
        if let Some(title) = document.select(&TITLE).next() {
            let title = visible_text(title);
            if !title.is_empty() {
                keywords.add(&title);
                description = title;
                source = DescriptionSource::Title;
            }
        }
    }

    if description.is_empty() {
        for heading in document.select(&HEADINGS) {
            let text = visible_text(heading);
            if text.is_empty() {
                continue;
            }
            keywords.add(&text);
            if description.is_empty() {
                description = text;
                source = DescriptionSource::Heading;
            }
        }
    }

    if description.is_empty() {
        let body = document.select(&BODY).next().map(visible_text).unwrap_or_default();
        if !body.is_empty() {
            keywords.add(&body);
            description = body;
            source = DescriptionSource::Body;
        }
    }

    let extraction = Extraction {
        keywords: keywords.into_vec(),
        description: tools::truncate_chars(&description, DESCRIPTION_LIMIT),
    };
    (extraction, source)
}
