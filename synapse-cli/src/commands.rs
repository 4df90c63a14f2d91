//! Command handlers for the engine's external command surface.
//!
//! Every handler owns exactly one `EngineConfig` and one `SynapseStore`,
//! per the "single owned store object per invocation" design note.

use std::io::Read as _;
use std::path::Path;

use serde::Serialize;

use synapse_core::config::{EngineConfig, EnginePaths};
use synapse_core::embedder::{Embedder, LocalVectorEmbedder, NullEmbedder};
use synapse_core::index::LocalIndex;
use synapse_core::observer::Observer;
use synapse_core::store::SynapseStore;
use synapse_core::tokenizer::NullTagger;
use synapse_core::types::{ObservationData, ObservationKind};
use synapse_core::{distill, recall};

use crate::errors::{helpers, EnhancedError};
use crate::output::{Output, OutputFormat};

fn load_store(paths: &EnginePaths) -> anyhow::Result<SynapseStore> {
    SynapseStore::load(paths).context_with_help(
        "Failed to load the synapse store",
        helpers::ENGINE_DIR_HELP,
    )
}

/// A strict, user-facing failure: invalid CLI arguments exit non-zero
/// with a usage message, unlike the lenient engine interior.
fn usage_error<T>(msg: &str, help: &[&str]) -> anyhow::Result<T> {
    use colored::Colorize;
    let mut out = msg.red().bold().to_string();
    if !help.is_empty() {
        out.push_str(&format!("\n\n{}", "Usage:".yellow().bold()));
        for h in help {
            out.push_str(&format!("\n  {h}"));
        }
    }
    Err(anyhow::anyhow!(out))
}

fn build_embedder(config: &EngineConfig) -> Box<dyn Embedder> {
    if config.features.enable_vector_search {
        Box::new(LocalVectorEmbedder::with_config(256, &config.vector_search_api))
    } else {
        Box::new(NullEmbedder)
    }
}

#[derive(Debug, Serialize)]
struct DistillView(distill::DistillSummary);

impl Output for DistillView {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(
            writer,
            "distilled {} log(s): {} terms seen, {} active concepts, {} instincts promoted",
            self.0.logs_processed, self.0.terms_seen, self.0.active_concept_count, self.0.instincts_promoted
        )?;
        Ok(())
    }
}

pub async fn run_distill(
    paths: &EnginePaths,
    config: &EngineConfig,
    force: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut store = load_store(paths)?;
    let tagger = NullTagger;
    let embedder = build_embedder(config);
    let summary = distill::distill(paths, config, &mut store, &tagger, embedder.as_ref(), force).await;
    format.print_output(&DistillView(summary))
}

#[derive(Debug, Serialize)]
struct RecallView(recall::RecallResponse);

impl Output for RecallView {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        let r = &self.0;
        writeln!(writer, "source: {} (mode: {})", r.source, r.scoring_mode)?;
        if r.is_fast_mode {
            writeln!(writer, "(fast mode — vector search timed out)")?;
        }
        if !r.activated_concepts.is_empty() {
            writeln!(writer, "activated: {}", r.activated_concepts.join(", "))?;
        }
        for rule in &r.pinned_rules {
            writeln!(writer, "[pinned] {}: {}", rule.keyword, rule.rule)?;
        }
        for item in &r.search_results {
            writeln!(writer, "- {} {}", item.file, item.content)?;
        }
        if r.search_results.is_empty() {
            writeln!(writer, "(no results)")?;
        }
        Ok(())
    }
}

pub async fn run_recall(
    paths: &EnginePaths,
    config: &EngineConfig,
    query: &str,
    deep: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut store = load_store(paths)?;
    let index = LocalIndex::load_or_build(paths, config).context_with_help(
        "Failed to build the local index",
        helpers::ENGINE_DIR_HELP,
    )?;
    let embedder = build_embedder(config);
    let options = recall::RecallOptions {
        deep,
        revive_limit: 5,
    };
    let response = recall::recall(query, options, paths, config, &mut store, &index, embedder.as_ref()).await;
    format.print_output(&RecallView(response))
}

pub async fn run_deep_recall(
    paths: &EnginePaths,
    config: &EngineConfig,
    query: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut store = load_store(paths)?;
    let revived = store.deep_recall(&[query.to_string()], 5, config);
    let archive_context = SynapseStore::scan_archive_for_context(&paths.archive_dir(), query);
    store.persist(paths).await;

    #[derive(Serialize)]
    struct View {
        query: String,
        revived_count: usize,
        revived: Vec<String>,
        archive_context: Vec<(String, Vec<String>)>,
    }
    impl Output for View {
        fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
            writeln!(writer, "revived {} latent concept(s) for \"{}\"", self.revived_count, self.query)?;
            for r in &self.revived {
                writeln!(writer, "- {r}")?;
            }
            Ok(())
        }
    }
    let view = View {
        query: query.to_string(),
        revived_count: revived.len(),
        revived,
        archive_context,
    };
    format.print_output(&view)
}

pub async fn run_latent_stats(paths: &EnginePaths, format: OutputFormat) -> anyhow::Result<()> {
    let store = load_store(paths)?;
    let now = synapse_core::types::now_millis();

    #[derive(Serialize)]
    struct View {
        total_latent: usize,
        oldest_archive: Option<i64>,
        newest_archive: Option<i64>,
        average_age_days: f64,
    }
    impl Output for View {
        fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
            writeln!(
                writer,
                "{} latent concept(s), average age {:.1} days",
                self.total_latent, self.average_age_days
            )?;
            Ok(())
        }
    }

    let archived_at: Vec<i64> = store.cold.values().map(|l| l.archived_at).collect();
    let average_age_days = if archived_at.is_empty() {
        0.0
    } else {
        let total_ms: i64 = archived_at.iter().map(|a| now - a).sum();
        (total_ms as f64 / archived_at.len() as f64) / 86_400_000.0
    };

    let view = View {
        total_latent: archived_at.len(),
        oldest_archive: archived_at.iter().min().copied(),
        newest_archive: archived_at.iter().max().copied(),
        average_age_days,
    };
    format.print_output(&view)
}

pub async fn run_forget(paths: &EnginePaths, config: &EngineConfig, format: OutputFormat) -> anyhow::Result<()> {
    let mut store = load_store(paths)?;
    let before = store.hot.len();
    store.apply_ltd(config);
    store.persist(paths).await;
    let after = store.hot.len();

    #[derive(Serialize)]
    struct View {
        demoted: usize,
        remaining_hot: usize,
    }
    impl Output for View {
        fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
            writeln!(writer, "demoted {} concept(s); {} remain hot", self.demoted, self.remaining_hot)?;
            Ok(())
        }
    }
    format.print_output(&View {
        demoted: before.saturating_sub(after),
        remaining_hot: after,
    })
}

pub async fn run_pin_exp(
    paths: &EnginePaths,
    arg: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let Some((keyword, rule)) = arg
        .split_once(':')
        .filter(|(k, r)| !k.trim().is_empty() && !r.trim().is_empty())
    else {
        return usage_error("Invalid pin-exp arguments", helpers::PIN_EXP_USAGE_HELP);
    };

    let mut store = load_store(paths)?;
    store.pin(keyword.trim(), rule.trim());
    store.persist(paths).await;

    #[derive(Serialize)]
    struct View {
        keyword: String,
    }
    impl Output for View {
        fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
            writeln!(writer, "pinned \"{}\"", self.keyword)?;
            Ok(())
        }
    }
    format.print_output(&View {
        keyword: keyword.trim().to_string(),
    })
}

pub async fn run_memorize(
    paths: &EnginePaths,
    config: &EngineConfig,
    args: &[String],
    format: OutputFormat,
) -> anyhow::Result<()> {
    let joined = args.join(" ");
    let (concept, content) = if let Some((k, v)) = joined.split_once(':') {
        (k.trim().to_string(), v.trim().to_string())
    } else if args.len() >= 2 {
        (args[0].clone(), args[1..].join(" "))
    } else {
        (String::new(), String::new())
    };

    if concept.is_empty() || content.is_empty() {
        return usage_error("Invalid memorize arguments", helpers::MEMORIZE_USAGE_HELP);
    }

    let mut store = load_store(paths)?;
    store.memorize(&concept, &content, config);
    store.persist(paths).await;

    #[derive(Serialize)]
    struct View {
        concept: String,
    }
    impl Output for View {
        fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
            writeln!(writer, "memorized \"{}\"", self.concept)?;
            Ok(())
        }
    }
    format.print_output(&View { concept })
}

pub async fn run_get_pinned(paths: &EnginePaths, format: OutputFormat) -> anyhow::Result<()> {
    let store = load_store(paths)?;
    #[derive(Serialize)]
    struct PinnedEntry {
        keyword: String,
        rule: String,
        weight: f64,
    }
    #[derive(Serialize)]
    struct View(Vec<PinnedEntry>);
    impl Output for View {
        fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
            for entry in &self.0 {
                writeln!(writer, "{} ({:.2}): {}", entry.keyword, entry.weight, entry.rule)?;
            }
            Ok(())
        }
    }
    let view = View(
        store
            .pinned_rules()
            .into_iter()
            .map(|(keyword, rule, weight)| PinnedEntry { keyword, rule, weight })
            .collect(),
    );
    format.print_output(&view)
}

pub async fn run_get_top_concepts(paths: &EnginePaths, n: usize, format: OutputFormat) -> anyhow::Result<()> {
    let store = load_store(paths)?;
    #[derive(Serialize)]
    struct ConceptEntry {
        concept: String,
        weight: f64,
    }
    #[derive(Serialize)]
    struct View(Vec<ConceptEntry>);
    impl Output for View {
        fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
            for entry in &self.0 {
                writeln!(writer, "{:.3}  {}", entry.weight, entry.concept)?;
            }
            Ok(())
        }
    }
    let view = View(
        store
            .top_concepts(n)
            .into_iter()
            .map(|(concept, weight)| ConceptEntry { concept, weight })
            .collect(),
    );
    format.print_output(&view)
}

/// One line of an externally supplied session trace: `{ "type": ..., "data": { ... } }`.
#[derive(Debug, serde::Deserialize)]
struct TraceLine {
    #[serde(rename = "type")]
    kind: ObservationKind,
    #[serde(default)]
    data: ObservationData,
}

pub async fn run_observe(
    paths: &EnginePaths,
    config: &EngineConfig,
    file: Option<&Path>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let mut ingested = 0usize;
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TraceLine>(line) {
            Ok(trace) => {
                Observer::record(paths, trace.kind, trace.data);
                ingested += 1;
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed trace line");
            }
        }
    }

    let mut store = load_store(paths)?;
    let promoted = Observer::batch_analyze(paths, &mut store, config.observer.min_observations_for_instinct);
    store.persist(paths).await;

    #[derive(Serialize)]
    struct View {
        ingested: usize,
        instincts_promoted: usize,
    }
    impl Output for View {
        fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
            writeln!(
                writer,
                "ingested {} observation(s), promoted {} instinct(s)",
                self.ingested, self.instincts_promoted
            )?;
            Ok(())
        }
    }
    format.print_output(&View {
        ingested,
        instincts_promoted: promoted.len(),
    })
}
