// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

//! Small text helpers shared by the extractor, the indexer and the query engine.

use regex::RegexBuilder;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Counts case-insensitive, whole-word occurrences of `needle` in `haystack`.
///
/// A match counts only when the characters on either side of it are not
/// alphanumeric (or `_`). Works for multi-word phrases as well.
pub fn count_whole_word(haystack: &str, needle: &str) -> i64 {
    let needle = needle.trim();
    if needle.is_empty() || haystack.is_empty() {
        return 0;
    }

    let re = match RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re,
        Err(e) => {
            log::warn!("could not build matcher for '{}': {}", needle, e);
            return 0;
        }
    };

    let mut count = 0;
    for m in re.find_iter(haystack) {
        let before = haystack[..m.start()].chars().next_back();
        let after = haystack[m.end()..].chars().next();
        let open = before.map_or(true, |c| !is_word_char(c));
        let close = after.map_or(true, |c| !is_word_char(c));
        if open && close {
            count += 1;
        }
    }
    count
}

/// Collapses every run of whitespace into a single space and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `max` characters (never splits a code point).
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_whole_words_only() {
        let html = "Shoes! shoes, SHOES; shoestring reshoes shoes_x shoes";
        assert_eq!(count_whole_word(html, "shoes"), 4);
    }

    #[test]
    fn counts_phrases_case_insensitively() {
        let text = "Running Shoes for sale. running shoes everywhere, runningshoes";
        assert_eq!(count_whole_word(text, "running shoes"), 2);
    }

    #[test]
    fn empty_needle_counts_nothing() {
        assert_eq!(count_whole_word("anything", "   "), 0);
        assert_eq!(count_whole_word("", "x"), 0);
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert_eq!(count_whole_word("a (b) c (b)", "(b)"), 2);
        assert_eq!(count_whole_word("c++ and c", "c++"), 1);
    }

    #[test]
    fn truncation_is_char_safe() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 200), "short");
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(collapse_whitespace("  a \n\t b   c "), "a b c");
    }
}
