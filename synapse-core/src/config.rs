//! Central configuration record for the memory engine.
//!
//! One `EngineConfig` is constructed per CLI invocation and threaded by
//! reference through every pipeline call rather than rebuilt per-operation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LtdConfig {
    pub decay_rate: f64,
    pub forget_threshold: f64,
    pub revived_weight: f64,
    pub initial_weight: f64,
}

impl Default for LtdConfig {
    fn default() -> Self {
        Self {
            decay_rate: constants::LTD_DECAY_RATE,
            forget_threshold: constants::FORGET_THRESHOLD,
            revived_weight: constants::REVIVED_WEIGHT,
            initial_weight: constants::INITIAL_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    pub min_observations_for_instinct: usize,
    pub confidence_base: f64,
    pub confidence_increment: f64,
    pub confidence_decrement: f64,
    pub confidence_decay_weekly: f64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            min_observations_for_instinct: constants::MIN_OBSERVATIONS_FOR_INSTINCT,
            confidence_base: constants::CONFIDENCE_BASE,
            confidence_increment: constants::CONFIDENCE_INCREMENT,
            confidence_decrement: constants::CONFIDENCE_DECREMENT,
            confidence_decay_weekly: constants::CONFIDENCE_DECAY_WEEKLY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordsConfig {
    pub min_word_length: usize,
    pub max_weight_multiplier: f64,
    pub decay_factor: f64,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            min_word_length: constants::MIN_WORD_LENGTH,
            max_weight_multiplier: constants::MAX_WEIGHT_MULTIPLIER,
            decay_factor: constants::KEYWORD_DECAY_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSearchConfig {
    pub max_execution_time_ms: u64,
}

impl Default for LocalSearchConfig {
    fn default() -> Self {
        Self {
            max_execution_time_ms: constants::LOCAL_SEARCH_BUDGET.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSearchApiConfig {
    pub timeout_ms: u64,
    pub max_results: usize,
    pub chunk_size: usize,
}

impl Default for VectorSearchApiConfig {
    fn default() -> Self {
        Self {
            timeout_ms: constants::VECTOR_SEARCH_API_TIMEOUT_MS,
            max_results: constants::MAX_SEARCH_RESULTS,
            chunk_size: constants::EMBED_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub enable_vector_search: bool,
    pub enable_observer: bool,
    pub enable_auto_distill: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            enable_vector_search: true,
            enable_observer: true,
            enable_auto_distill: false,
        }
    }
}

/// Central configuration record for the engine. Unknown TOML keys are
/// ignored rather than rejected so forward-incompatible configs degrade
/// gracefully.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub ltd: LtdConfig,
    pub observer: ObserverConfig,
    pub keywords: KeywordsConfig,
    #[serde(rename = "localSearch")]
    pub local_search: LocalSearchConfig,
    #[serde(rename = "vectorSearchApi")]
    pub vector_search_api: VectorSearchApiConfig,
    pub features: FeaturesConfig,
    /// Initial weight for an explicit `memorize`. Defaults to 2.5 per the
    /// Open Question resolution documented in DESIGN.md.
    pub memorize_initial_weight: Option<f64>,
}

impl EngineConfig {
    /// Load configuration from an optional TOML file, falling back to
    /// defaults for any field the file omits or when the file is absent.
    /// A malformed file is a configuration error (surfaced, not swallowed —
    /// this is a user/operator-facing entry point, not the lenient engine
    /// interior).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| crate::error::Error::Configuration(format!("{}: {e}", path.display())))
    }

    #[must_use]
    pub fn memorize_weight(&self) -> f64 {
        self.memorize_initial_weight
            .unwrap_or(constants::MEMORIZE_INITIAL_WEIGHT)
    }
}

/// Filesystem layout rooted at the "engine directory".
#[derive(Debug, Clone)]
pub struct EnginePaths {
    pub root: PathBuf,
}

impl EnginePaths {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn hot_weights(&self) -> PathBuf {
        self.root.join("synapse_weights.json")
    }

    #[must_use]
    pub fn latent_weights(&self) -> PathBuf {
        self.root.join("latent_weights.json")
    }

    #[must_use]
    pub fn observations_log(&self) -> PathBuf {
        self.root.join("observations.jsonl")
    }

    #[must_use]
    pub fn local_index_cache(&self) -> PathBuf {
        self.root.join("local_index_cache.json")
    }

    #[must_use]
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(".observer.lock")
    }

    #[must_use]
    pub fn instincts_dir(&self) -> PathBuf {
        self.root.join("instincts")
    }

    #[must_use]
    pub fn active_memory_dir(&self) -> PathBuf {
        self.root.join("../workspace/memory")
    }

    #[must_use]
    pub fn archive_dir(&self) -> PathBuf {
        self.active_memory_dir().join("archive")
    }
}
