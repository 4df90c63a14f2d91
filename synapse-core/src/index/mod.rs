//! Local Inverted Index (C2): incremental on-disk word-to-file index with a
//! strict 100 ms query budget.

mod cache;
mod words;

pub use cache::{IndexCache, IndexedFile};
pub use words::extract_index_words;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{EngineConfig, EnginePaths};
use crate::constants::{LOCAL_SEARCH_BUDGET, MAX_SEARCH_RESULTS};
use crate::error::Result;

/// A single ranked match.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub file: String,
    pub score: i64,
    pub snippet: String,
}

/// Outcome of a (possibly timed-out) query.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub elapsed: Duration,
    pub timed_out: bool,
}

/// The incremental, in-memory inverted index built from the on-disk cache.
pub struct LocalIndex {
    root: PathBuf,
    cache: IndexCache,
    /// word -> set of workspace-relative file paths containing it
    word_index: BTreeMap<String, Vec<String>>,
    /// Effective query budget: `localSearch.maxExecutionTime` clamped to the
    /// `LOCAL_SEARCH_BUDGET` hard ceiling (§4.2/§5) so a misconfigured value
    /// can only shorten the budget, never lengthen it past the documented
    /// 100 ms contract.
    budget: Duration,
}

impl LocalIndex {
    /// Load the on-disk cache (if any), rescan `.md` files under the active
    /// memory directory and the archive directory, and rebuild the
    /// in-memory word index. Cheap when nothing changed since the cache was
    /// last written.
    pub fn load_or_build(paths: &EnginePaths, config: &EngineConfig) -> Result<Self> {
        let mut cache = cache::load(&paths.local_index_cache()).unwrap_or_else(|e| {
            warn!(error = %e, "local index cache unreadable, rebuilding from scratch");
            IndexCache::default()
        });

        let mut changed = false;
        for dir in [paths.active_memory_dir(), paths.archive_dir()] {
            changed |= Self::rescan_dir(&dir, &paths.root, &mut cache);
        }

        if changed {
            cache.last_build_time = crate::types::now_millis();
            if let Err(e) = cache::save(&paths.local_index_cache(), &cache) {
                warn!(error = %e, "failed to persist local index cache");
            }
        }

        let word_index = Self::build_word_index(&cache);
        let budget = Duration::from_millis(config.local_search.max_execution_time_ms).min(LOCAL_SEARCH_BUDGET);

        Ok(Self {
            root: paths.root.clone(),
            cache,
            word_index,
            budget,
        })
    }

    fn rescan_dir(dir: &Path, workspace_root: &Path, cache: &mut IndexCache) -> bool {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return false;
        };
        let mut changed = false;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let mtime = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);

            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();

            let needs_reparse = cache
                .files
                .get(&name)
                .map(|f| f.mtime != mtime)
                .unwrap_or(true);

            if !needs_reparse {
                continue;
            }

            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            let words: Vec<String> = extract_index_words(&content).into_iter().collect();
            let relative = path
                .strip_prefix(workspace_root)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();

            debug!(file = %name, words = words.len(), "reindexed file");
            cache.files.insert(
                name,
                IndexedFile {
                    mtime,
                    path: relative,
                    words,
                },
            );
            changed = true;
        }
        changed
    }

    fn build_word_index(cache: &IndexCache) -> BTreeMap<String, Vec<String>> {
        let mut index: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for file in cache.files.values() {
            for word in &file.words {
                index.entry(word.clone()).or_default().push(file.path.clone());
            }
        }
        index
    }

    fn files_containing(&self, word: &str) -> &[String] {
        self.word_index
            .get(word)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Score and rank file matches for one or more (possibly Hebbian-expanded)
    /// query strings, within the 100 ms execution budget.
    pub async fn search(&self, queries: &[String]) -> SearchOutcome {
        let start = Instant::now();
        let queries = queries.to_vec();
        match tokio::time::timeout(self.budget, async { self.search_sync(&queries) }).await
        {
            Ok(results) => SearchOutcome {
                results,
                elapsed: start.elapsed(),
                timed_out: false,
            },
            Err(_) => SearchOutcome {
                results: Vec::new(),
                elapsed: start.elapsed(),
                timed_out: true,
            },
        }
    }

    fn search_sync(&self, queries: &[String]) -> Vec<SearchResult> {
        let mut scores: BTreeMap<String, i64> = BTreeMap::new();
        let mut snippet_source: BTreeMap<String, String> = BTreeMap::new();

        for query in queries {
            let lower = query.to_lowercase();
            let has_cjk = words::contains_cjk(&lower);

            if has_cjk {
                for file in self.files_containing(&lower) {
                    *scores.entry(file.clone()).or_insert(0) += 10;
                    snippet_source.entry(file.clone()).or_insert_with(|| lower.clone());
                }
                for ch in lower.chars().filter(|c| words::is_cjk_char(*c)) {
                    let ch_str = ch.to_string();
                    for file in self.files_containing(&ch_str) {
                        *scores.entry(file.clone()).or_insert(0) += 1;
                        snippet_source.entry(file.clone()).or_insert_with(|| lower.clone());
                    }
                }
            } else {
                let tokens: Vec<&str> = lower
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|t| t.len() > 2)
                    .collect();
                for token in tokens {
                    for file in self.files_containing(token) {
                        *scores.entry(file.clone()).or_insert(0) += 1;
                        snippet_source
                            .entry(file.clone())
                            .or_insert_with(|| token.to_string());
                    }
                }
            }
        }

        let mut ranked: Vec<(String, i64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(MAX_SEARCH_RESULTS);

        ranked
            .into_iter()
            .map(|(file, score)| {
                let needle = snippet_source.get(&file).cloned().unwrap_or_default();
                let snippet = self.extract_snippet(&file, &needle);
                SearchResult {
                    file,
                    score,
                    snippet,
                }
            })
            .collect()
    }

    /// The line containing the first match plus its neighbours; falls back
    /// to the first three lines when spreading-only matches leave nothing
    /// to anchor on. Failures are reported in-band, never raised.
    fn extract_snippet(&self, relative_file: &str, needle: &str) -> String {
        let path = self.root.join(relative_file);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => return format!("<snippet unavailable: {e}>"),
        };
        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return String::new();
        }

        let needle_lower = needle.to_lowercase();
        let hit = lines
            .iter()
            .position(|l| l.to_lowercase().contains(&needle_lower));

        match hit {
            Some(idx) => {
                let start = idx.saturating_sub(1);
                let end = (idx + 1).min(lines.len() - 1);
                lines[start..=end].join("\n")
            }
            None => lines.iter().take(3).copied().collect::<Vec<_>>().join("\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_log(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[tokio::test]
    async fn search_ranks_files_by_token_hits() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("engine");
        fs::create_dir_all(root.join("../workspace/memory/archive")).unwrap();
        let active = root.join("../workspace/memory");
        write_log(&active, "2025-01-01.md", "database cache database system");
        write_log(&active, "2025-01-02.md", "database");

        let paths = EnginePaths::new(&root);
        let index = LocalIndex::load_or_build(&paths, &EngineConfig::default()).unwrap();
        let outcome = index.search(&["database".to_string()]).await;
        assert!(!outcome.timed_out);
        assert!(!outcome.results.is_empty());
        assert_eq!(outcome.results[0].file, "2025-01-01.md");
    }

    #[tokio::test]
    async fn search_scores_cjk_query_both_whole_and_per_character() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("engine");
        fs::create_dir_all(root.join("../workspace/memory/archive")).unwrap();
        let active = root.join("../workspace/memory");
        write_log(&active, "2025-01-01.md", "记忆系统很重要");

        let paths = EnginePaths::new(&root);
        let index = LocalIndex::load_or_build(&paths, &EngineConfig::default()).unwrap();
        let outcome = index.search(&["记忆".to_string()]).await;
        assert!(!outcome.results.is_empty());
    }

    #[tokio::test]
    async fn unchanged_files_are_not_reparsed_on_rebuild() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("engine");
        fs::create_dir_all(root.join("../workspace/memory/archive")).unwrap();
        let active = root.join("../workspace/memory");
        write_log(&active, "2025-01-01.md", "database cache");

        let paths = EnginePaths::new(&root);
        let _first = LocalIndex::load_or_build(&paths, &EngineConfig::default()).unwrap();
        let cache_path = paths.local_index_cache();
        assert!(cache_path.exists());
        let first_write = fs::metadata(&cache_path).unwrap().modified().unwrap();

        std::thread::sleep(Duration::from_millis(10));
        let _second = LocalIndex::load_or_build(&paths, &EngineConfig::default()).unwrap();
        let second_write = fs::metadata(&cache_path).unwrap().modified().unwrap();
        assert_eq!(first_write, second_write);
    }
}
