//! Word extraction for the local index. Distinct from `tokenizer::tokenize`
//! — this extracts retrieval keys, including a per-ideograph breakdown for
//! short CJK queries.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static CJK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[一-龥]{2,}").unwrap());
static ASCII_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z]{2,}").unwrap());
static ALNUM_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9]{2,}").unwrap());

#[must_use]
pub fn is_cjk_char(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

#[must_use]
pub fn contains_cjk(s: &str) -> bool {
    s.chars().any(is_cjk_char)
}

/// Extracts every ≥2-char CJK run *and* every single ideograph within it,
/// plus ≥2-char ASCII runs and ≥2-char alphanumeric runs. Lowercased.
#[must_use]
pub fn extract_index_words(text: &str) -> BTreeSet<String> {
    let mut words = BTreeSet::new();

    for m in CJK_RUN.find_iter(text) {
        let run = m.as_str().to_lowercase();
        for ch in run.chars() {
            words.insert(ch.to_string());
        }
        words.insert(run);
    }

    for m in ASCII_RUN.find_iter(text) {
        words.insert(m.as_str().to_lowercase());
    }

    for m in ALNUM_RUN.find_iter(text) {
        words.insert(m.as_str().to_lowercase());
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cjk_run_yields_whole_run_and_each_character() {
        let words = extract_index_words("记忆系统");
        assert!(words.contains("记忆系统"));
        assert!(words.contains("记"));
        assert!(words.contains("忆"));
        assert!(words.contains("系"));
        assert!(words.contains("统"));
    }

    #[test]
    fn ascii_and_alphanumeric_runs_are_lowercased() {
        let words = extract_index_words("Cache42 DB");
        assert!(words.contains("cache42"));
        assert!(words.contains("db"));
    }

    #[test]
    fn single_character_runs_are_dropped() {
        let words = extract_index_words("a b c database");
        assert!(!words.contains("a"));
        assert!(words.contains("database"));
    }
}
