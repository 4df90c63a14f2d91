//! Tokenizer (C1): extracts content-bearing terms from mixed CJK/Latin text
//! for the weight store.
//!
//! This is intentionally a different extraction than the Local Index's word
//! extraction (`index::extract_index_words`) — the two must not be unified.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::constants::MIN_WORD_LENGTH;

static CJK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[一-龥]{2,}").unwrap());
static ASCII_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z]{2,}").unwrap());

/// A part-of-speech tag emitted by a pluggable tagger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosTag {
    Noun,
    ProperNoun,
    NounCompound,
    ForeignWord,
    Other,
}

impl PosTag {
    /// Tag set: `n, nr, nz, eng, noun, NN, NNS, NNP, NNPS, FW`.
    #[must_use]
    pub fn is_content_bearing(self) -> bool {
        matches!(
            self,
            PosTag::Noun | PosTag::ProperNoun | PosTag::NounCompound | PosTag::ForeignWord
        )
    }
}

/// A single tagged token from a part-of-speech tagger.
#[derive(Debug, Clone)]
pub struct TaggedToken {
    pub text: String,
    pub tag: PosTag,
}

/// Pluggable part-of-speech tagger capability. The core treats tagger
/// failure as silent degradation to the fallback path, never a raised error.
pub trait PosTagger: Send + Sync {
    fn tag(&self, text: &str) -> Vec<TaggedToken>;
}

/// A tagger that never finds anything, forcing the fallback path. Useful as
/// the default when no real tagger is configured.
pub struct NullTagger;

impl PosTagger for NullTagger {
    fn tag(&self, _text: &str) -> Vec<TaggedToken> {
        Vec::new()
    }
}

static CJK_STOPWORDS: &[&str] = &[
    "的", "了", "在", "是", "我", "有", "和", "就", "不", "人", "都", "一", "一个", "上", "也",
    "很", "到", "说", "要", "去", "你", "会", "着", "没有", "看", "好", "自己", "这",
];

static EN_STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "be", "been", "being",
    "have", "has", "had", "do", "does", "did", "will", "would", "could", "should", "may",
    "might", "must", "can", "this", "that", "these", "those", "of", "to", "in", "on", "for",
    "with", "as", "at", "by", "from", "it", "its", "we", "you", "they", "i", "he", "she",
];

/// Extract candidate content terms from raw text.
///
/// Preferred path: ask `tagger` for nouns/foreign words. If the tagger
/// returns nothing (including the `NullTagger` default), fall back to regex
/// extraction of CJK/ASCII runs filtered against fixed stop-word lists.
/// Never raises; deterministic for identical input and tagger state.
///
/// `min_word_length` is `keywords.minWordLength` (§6); callers without a
/// loaded config may pass `constants::MIN_WORD_LENGTH`.
#[must_use]
pub fn tokenize(text: &str, tagger: &dyn PosTagger, min_word_length: usize) -> BTreeSet<String> {
    let tagged = tagger.tag(text);
    let from_tagger: BTreeSet<String> = tagged
        .into_iter()
        .filter(|t| t.tag.is_content_bearing())
        .map(|t| t.text.to_lowercase())
        .filter(|t| t.chars().count() >= min_word_length)
        .collect();

    if !from_tagger.is_empty() {
        return from_tagger;
    }

    fallback_tokenize(text)
}

fn fallback_tokenize(text: &str) -> BTreeSet<String> {
    let mut terms = BTreeSet::new();

    for m in CJK_RUN.find_iter(text) {
        let lower = m.as_str().to_lowercase();
        if !CJK_STOPWORDS.contains(&lower.as_str()) {
            terms.insert(lower);
        }
    }

    for m in ASCII_RUN.find_iter(text) {
        let lower = m.as_str().to_lowercase();
        if !EN_STOPWORDS.contains(&lower.as_str()) {
            terms.insert(lower);
        }
    }

    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_extracts_ascii_and_cjk_runs() {
        let terms = tokenize("memory system database cache", &NullTagger, MIN_WORD_LENGTH);
        assert!(terms.contains("memory"));
        assert!(terms.contains("system"));
        assert!(terms.contains("database"));
        assert!(terms.contains("cache"));
    }

    #[test]
    fn fallback_drops_stopwords() {
        let terms = tokenize("the cache and the database", &NullTagger, MIN_WORD_LENGTH);
        assert!(!terms.contains("the"));
        assert!(!terms.contains("and"));
        assert!(terms.contains("cache"));
    }

    #[test]
    fn fallback_extracts_cjk_runs() {
        let terms = tokenize("记忆系统 database", &NullTagger, MIN_WORD_LENGTH);
        assert!(terms.contains("记忆系统"));
        assert!(terms.contains("database"));
    }

    struct StubTagger;
    impl PosTagger for StubTagger {
        fn tag(&self, _text: &str) -> Vec<TaggedToken> {
            vec![
                TaggedToken { text: "Rust".into(), tag: PosTag::ForeignWord },
                TaggedToken { text: "is".into(), tag: PosTag::Other },
            ]
        }
    }

    #[test]
    fn tagger_path_filters_non_content_tags() {
        let terms = tokenize("Rust is great", &StubTagger, MIN_WORD_LENGTH);
        assert_eq!(terms.len(), 1);
        assert!(terms.contains("rust"));
    }

    #[test]
    fn tagger_failure_degrades_to_fallback() {
        struct EmptyTagger;
        impl PosTagger for EmptyTagger {
            fn tag(&self, _text: &str) -> Vec<TaggedToken> {
                Vec::new()
            }
        }
        let terms = tokenize("memory cache", &EmptyTagger, MIN_WORD_LENGTH);
        assert!(terms.contains("memory"));
    }
}
