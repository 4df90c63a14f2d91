//! Distillation Pipeline (C6): log ingestion, term extraction, store
//! mutation, archiving, and triggering of incremental vector indexing.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{EngineConfig, EnginePaths};
use crate::embedder::Embedder;
use crate::observer::Observer;
use crate::store::SynapseStore;
use crate::tokenizer::{self, PosTagger};

static SPECIAL_CONCEPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(crate::constants::SPECIAL_CONCEPT_PATTERN).unwrap());
static DAILY_LOG_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}\.md$").unwrap());
static LEADING_MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\-\*#\s]+").unwrap());

/// Summary of one distillation run, returned to the CLI surface.
#[derive(Debug, Clone, Serialize)]
pub struct DistillSummary {
    pub logs_processed: usize,
    pub terms_seen: usize,
    pub active_concept_count: usize,
    pub instincts_promoted: usize,
}

/// Run the full distillation pass: ingest logs, extract terms, mutate the
/// store, archive processed files, and trigger incremental vector indexing.
///
/// `force` includes today's log in the pass (normally excluded so an
/// in-progress day's file isn't archived mid-write). Every step is
/// best-effort: a single log's failure to parse or archive is logged and
/// does not abort the remaining logs.
pub async fn distill(
    paths: &EnginePaths,
    config: &EngineConfig,
    store: &mut SynapseStore,
    tagger: &dyn PosTagger,
    embedder: &dyn Embedder,
    force: bool,
) -> DistillSummary {
    let promoted = if config.features.enable_observer {
        Observer::batch_analyze(paths, store, config.observer.min_observations_for_instinct)
    } else {
        Vec::new()
    };

    let logs = enumerate_logs(&paths.active_memory_dir(), force);
    let mut file_to_terms: HashMap<String, Vec<String>> = HashMap::new();
    let mut terms_seen = 0usize;
    let mut processed = Vec::new();

    for log_path in &logs {
        let name = log_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let content = match std::fs::read_to_string(log_path) {
            Ok(c) => c,
            Err(e) => {
                warn!(file = %name, error = %e, "failed to read log, skipping");
                continue;
            }
        };

        let mut terms: Vec<String> =
            tokenizer::tokenize(&content, tagger, config.keywords.min_word_length)
                .into_iter()
                .collect();

        for line in content.lines() {
            if SPECIAL_CONCEPT.is_match(line) {
                let stripped = LEADING_MARKUP.replace(line, "");
                let concept: String = stripped.to_lowercase().chars().take(50).collect();
                if !concept.trim().is_empty() {
                    terms.push(concept);
                }
            }
        }

        for term in &terms {
            let is_special = SPECIAL_CONCEPT.is_match(term);
            store.reinforce_on_observation(term, &name, is_special, config.ltd.initial_weight);
        }
        terms_seen += terms.len();
        file_to_terms.insert(name.clone(), terms);
        processed.push((log_path.clone(), name, content));
    }

    for (path, name, _content) in &processed {
        if let Err(e) = archive_log(path, &paths.archive_dir()) {
            warn!(file = %name, error = %e, "failed to archive log, leaving in place");
        }
    }

    store.predictive_ltd();
    store.build_hebbian_links(&file_to_terms);
    store.apply_ltd(config);
    store.persist(paths).await;

    if config.features.enable_vector_search && embedder.is_available() {
        let today_name = chrono::Utc::now().format("%Y-%m-%d.md").to_string();
        let today_content = processed
            .iter()
            .find(|(_, name, _)| *name == today_name)
            .map(|(_, _, content)| content.clone())
            .or_else(|| std::fs::read_to_string(paths.active_memory_dir().join(&today_name)).ok());

        if let Some(content) = today_content {
            if let Err(e) = embedder.incremental_index(&today_name, &content).await {
                warn!(error = %e, "incremental vector indexing failed");
            }
        }
    }

    info!(
        logs_processed = processed.len(),
        terms_seen,
        active_concepts = store.hot.len(),
        instincts_promoted = promoted.len(),
        "distillation complete"
    );

    DistillSummary {
        logs_processed: processed.len(),
        terms_seen,
        active_concept_count: store.hot.len(),
        instincts_promoted: promoted.len(),
    }
}

fn enumerate_logs(active_dir: &Path, force: bool) -> Vec<std::path::PathBuf> {
    let Ok(entries) = std::fs::read_dir(active_dir) else {
        return Vec::new();
    };
    let today = chrono::Utc::now().format("%Y-%m-%d.md").to_string();

    let mut logs: Vec<_> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            DAILY_LOG_NAME.is_match(name) && (force || name != today)
        })
        .collect();
    logs.sort();
    logs
}

fn archive_log(path: &Path, archive_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(archive_dir)?;
    let name = path.file_name().unwrap_or_default();
    std::fs::rename(path, archive_dir.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::embedder::NullEmbedder;
    use crate::tokenizer::NullTagger;
    use std::fs;

    fn setup() -> (tempfile::TempDir, EnginePaths) {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("engine");
        fs::create_dir_all(root.join("../workspace/memory/archive")).unwrap();
        let paths = EnginePaths::new(&root);
        (tmp, paths)
    }

    #[tokio::test]
    async fn cold_start_ingest_creates_concepts_and_links() {
        let (_tmp, paths) = setup();
        fs::write(
            paths.active_memory_dir().join("2025-01-01.md"),
            "memory system database cache",
        )
        .unwrap();

        let mut store = SynapseStore::default();
        let config = EngineConfig::default();
        let tagger = NullTagger;
        let embedder = NullEmbedder;

        let summary = distill(&paths, &config, &mut store, &tagger, &embedder, true).await;
        assert_eq!(summary.logs_processed, 1);
        assert!(store.hot.contains_key("memory"));
        assert!(store.hot.contains_key("database"));
        assert_eq!(store.hot["memory"].synapses["database"], 1);
        assert!(!paths.active_memory_dir().join("2025-01-01.md").exists());
        assert!(paths.archive_dir().join("2025-01-01.md").exists());
    }

    #[tokio::test]
    async fn special_line_contributes_boosted_concept() {
        let (_tmp, paths) = setup();
        fs::write(
            paths.active_memory_dir().join("2025-01-01.md"),
            "- IMPORTANT: retry on 429",
        )
        .unwrap();

        let mut store = SynapseStore::default();
        let config = EngineConfig::default();
        let tagger = NullTagger;
        let embedder = NullEmbedder;

        distill(&paths, &config, &mut store, &tagger, &embedder, true).await;
        let key = "important: retry on 429";
        assert!(store.hot.contains_key(key));
        assert_eq!(store.hot[key].weight, 1.5);
    }

    #[tokio::test]
    async fn today_file_excluded_unless_forced() {
        let (_tmp, paths) = setup();
        let today_name = chrono::Utc::now().format("%Y-%m-%d.md").to_string();
        fs::write(paths.active_memory_dir().join(&today_name), "memory").unwrap();

        let mut store = SynapseStore::default();
        let config = EngineConfig::default();
        let tagger = NullTagger;
        let embedder = NullEmbedder;

        let summary = distill(&paths, &config, &mut store, &tagger, &embedder, false).await;
        assert_eq!(summary.logs_processed, 0);
        assert!(paths.active_memory_dir().join(&today_name).exists());
    }

    #[tokio::test]
    async fn empty_active_dir_is_a_no_op() {
        let (_tmp, paths) = setup();
        let mut store = SynapseStore::default();
        let config = EngineConfig::default();
        let tagger = NullTagger;
        let embedder = NullEmbedder;

        let summary = distill(&paths, &config, &mut store, &tagger, &embedder, true).await;
        assert_eq!(summary.logs_processed, 0);
        assert_eq!(summary.terms_seen, 0);
        assert!(store.hot.is_empty());
    }
}
