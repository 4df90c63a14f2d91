//! Recall Pipeline (C7): direct+spreading activation, the vector-vs-local
//! race, pinned-rule injection, and dynamic re-ranking.

use serde::Serialize;

use std::time::Duration;

use crate::config::{EngineConfig, EnginePaths};
use crate::constants::{SPREADING_TOP_N, VECTOR_SEARCH_TIMEOUT};
use crate::embedder::Embedder;
use crate::index::LocalIndex;
use crate::observer::Observer;
use crate::store::SynapseStore;
use crate::types::{now_millis, ObservationData, ObservationKind};

/// Caller-facing options for a recall.
#[derive(Debug, Clone, Copy)]
pub struct RecallOptions {
    pub deep: bool,
    pub revive_limit: usize,
}

impl Default for RecallOptions {
    fn default() -> Self {
        Self {
            deep: false,
            revive_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PinnedRuleHit {
    pub keyword: String,
    pub rule: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConceptWeight {
    pub concept: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecallResultItem {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "finalScore")]
    pub final_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeepRecallInfo {
    pub source: &'static str,
    pub query: String,
    pub revived_count: usize,
    pub revived_memories: Vec<String>,
    pub archive_context: Vec<(String, Vec<String>)>,
    pub remaining_latent: usize,
}

/// The stable recall response shape.
#[derive(Debug, Clone, Serialize)]
pub struct RecallResponse {
    pub source: String,
    pub activated_concepts: Vec<String>,
    pub pinned_rules: Vec<PinnedRuleHit>,
    pub search_results: Vec<RecallResultItem>,
    pub weights_snapshot: Vec<ConceptWeight>,
    pub scoring_mode: &'static str,
    pub is_fast_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_recall: Option<DeepRecallInfo>,
}

/// Run the full recall pipeline: activation, the vector-vs-local race,
/// pinned-rule injection, and re-ranking.
///
/// Activation and LTP are committed to the in-memory store and persisted
/// *before* the external search race begins, so recall counts reflect the
/// attempt even if the vector search times out.
pub async fn recall(
    query: &str,
    options: RecallOptions,
    paths: &EnginePaths,
    config: &EngineConfig,
    store: &mut SynapseStore,
    index: &LocalIndex,
    embedder: &dyn Embedder,
) -> RecallResponse {
    let activated = store.direct_activation(query);
    for concept in &activated {
        store.reinforce_on_recall(concept);
    }

    let hebbian_terms = store.spreading_activation(&query.to_lowercase(), SPREADING_TOP_N);

    let mut expanded = vec![query.to_string()];
    expanded.extend(hebbian_terms);

    store.persist(paths).await;

    // `vectorSearchApi.timeout` (§6) is the operator-configurable request
    // budget; clamped to the hard 3s race deadline (§4.7/§5) so an override
    // can only shorten the race, never lengthen it.
    let vector_timeout =
        Duration::from_millis(config.vector_search_api.timeout_ms).min(VECTOR_SEARCH_TIMEOUT);

    let local_fut = index.search(&expanded);
    let vector_fut = tokio::time::timeout(vector_timeout, embedder.search(query));

    let (local_outcome, vector_outcome) = tokio::join!(local_fut, vector_fut);

    let vector_timed_out = vector_outcome.is_err();

    let vector_hit = match vector_outcome {
        Ok(Ok(resp)) if resp.ok && !resp.results.is_empty() => Some(resp),
        _ => None,
    };

    let (source, is_fast_mode, mut results) = if let Some(resp) = vector_hit {
        let items = resp
            .results
            .into_iter()
            .map(|m| RecallResultItem {
                file: m.file,
                score: None,
                similarity: Some(m.similarity),
                content: m.preview,
                final_score: None,
            })
            .collect::<Vec<_>>();
        ("silicon-embed".to_string(), false, items)
    } else {
        let items = local_outcome
            .results
            .into_iter()
            .map(|r| RecallResultItem {
                file: r.file,
                score: Some(r.score),
                similarity: None,
                content: r.snippet,
                final_score: None,
            })
            .collect::<Vec<_>>();
        ("local-file-search".to_string(), vector_timed_out, items)
    };

    if source == "local-file-search" {
        apply_dynamic_ranking(&mut results, &expanded, store, config);
    }

    let deep_recall = if options.deep {
        let revived = store.deep_recall(&expanded, options.revive_limit, config);
        let archive_context = SynapseStore::scan_archive_for_context(&paths.archive_dir(), query);
        let remaining_latent = store.cold.len();
        Some(DeepRecallInfo {
            source: "deep_recall",
            query: query.to_string(),
            revived_count: revived.len(),
            revived_memories: revived,
            archive_context,
            remaining_latent,
        })
    } else {
        None
    };

    let lowered_query = query.to_lowercase();
    let pinned_rules = store
        .pinned_rules()
        .into_iter()
        .filter(|(keyword, _, _)| {
            if lowered_query.trim().is_empty() {
                return false;
            }
            let k = keyword.to_lowercase();
            k.contains(&lowered_query) || lowered_query.contains(&k)
        })
        .map(|(keyword, rule, _)| PinnedRuleHit { keyword, rule })
        .collect();

    let weights_snapshot = activated
        .iter()
        .filter_map(|c| store.hot.get(c).map(|r| ConceptWeight {
            concept: c.clone(),
            weight: r.weight,
        }))
        .collect();

    Observer::record(
        paths,
        ObservationKind::Workflow,
        ObservationData {
            context: Some(query.to_string()),
            ..Default::default()
        },
    );

    let source_label = match &deep_recall {
        Some(_) => format!("{source} + deep_recall"),
        None => source.clone(),
    };

    RecallResponse {
        source: source_label,
        activated_concepts: activated,
        pinned_rules,
        search_results: results,
        weights_snapshot,
        scoring_mode: if source == "silicon-embed" {
            "similarity"
        } else {
            "dynamic-keyword"
        },
        is_fast_mode,
        deep_recall,
    }
}

/// §4.7.1: `final_score = (similarity ?? 0.5) * dynamic_weight`, where
/// `dynamic_weight(term) = min(1 + ln(count+1) / (1 + decay_factor*days_since_last_seen), max_weight_multiplier)`,
/// taking the maximum over every query-derived term present in the
/// result's content and found in the store. `decay_factor` and
/// `max_weight_multiplier` come from `keywords` config (§6).
fn apply_dynamic_ranking(
    results: &mut [RecallResultItem],
    query_terms: &[String],
    store: &SynapseStore,
    config: &EngineConfig,
) {
    let now = now_millis();
    for item in results.iter_mut() {
        let content_lower = item.content.to_lowercase();
        let best = query_terms
            .iter()
            .filter(|t| content_lower.contains(t.as_str()))
            .filter_map(|t| store.hot.get(t))
            .map(|record| {
                let days_since = ((now - record.last_seen).max(0) as f64) / 86_400_000.0;
                (1.0 + ((record.count + 1) as f64).ln()
                    / (1.0 + config.keywords.decay_factor * days_since))
                    .min(config.keywords.max_weight_multiplier)
            })
            .fold(1.0_f64, f64::max);

        let similarity = item.similarity.map(f64::from).unwrap_or(0.5);
        item.final_score = Some(similarity * best);
    }
    results.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
