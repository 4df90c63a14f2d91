//! Default constants for the memory engine, mirroring the documented
//! configuration defaults.

use std::time::Duration;

/// Multiplicative weight decay applied to every non-pinned hot record once
/// per distillation (`ltd.decayRate`).
pub const LTD_DECAY_RATE: f64 = 0.90;

/// Weight below which a non-pinned hot record is demoted to the latent
/// store (`ltd.forgetThreshold`).
pub const FORGET_THRESHOLD: f64 = 0.2;

/// Weight assigned to a concept revived from the latent store
/// (`ltd.revivedWeight`).
pub const REVIVED_WEIGHT: f64 = 0.5;

/// Weight assigned to a brand-new concept on first appearance
/// (`ltd.initialWeight`).
pub const INITIAL_WEIGHT: f64 = 1.0;

/// Reinforcement applied on recall (LTP).
pub const LTP_INCREMENT: f64 = 0.1;

/// Extra weight added on top of the base increment for lines matching the
/// special-concept keyword regex.
pub const SPECIAL_CONCEPT_BOOST: f64 = 0.5;

/// Initial weight for an explicit `memorize` record. Source documentation
/// disagreed between 2.5 and 5.0; this implementation defaults to 2.5 and
/// exposes it as configuration.
pub const MEMORIZE_INITIAL_WEIGHT: f64 = 2.5;

/// Minimum total observation count before the Observer's batch pass runs at all.
pub const MIN_OBSERVATIONS_FOR_INSTINCT: usize = 5;

/// Minimum group size within a batch pass before an instinct is synthesised.
pub const MIN_GROUP_SIZE_FOR_INSTINCT: usize = 3;

pub const CONFIDENCE_BASE: f64 = 0.3;
pub const CONFIDENCE_INCREMENT: f64 = 0.05;
pub const CONFIDENCE_DECREMENT: f64 = 0.1;
pub const CONFIDENCE_DECAY_WEEKLY: f64 = 0.02;

/// Minimum content-term length kept by the tokenizer.
pub const MIN_WORD_LENGTH: usize = 2;

/// Cap on the dynamic re-ranking weight multiplier.
pub const MAX_WEIGHT_MULTIPLIER: f64 = 2.0;

/// Decay factor used in the dynamic re-ranking weight formula.
pub const KEYWORD_DECAY_FACTOR: f64 = 0.1;

/// Hard execution budget for a single local-index query.
pub const LOCAL_SEARCH_BUDGET: Duration = Duration::from_millis(100);

/// Hard architectural deadline for the vector-vs-local recall race (§4.7/§5).
/// This is a ceiling, not a default to expose verbatim: `vectorSearchApi.timeout`
/// (below) is the operator-configurable knob, clamped to this value so a
/// misconfigured override can only shorten the race, never lengthen it past
/// the documented 3-second contract.
pub const VECTOR_SEARCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Default for the `vectorSearchApi.timeout` configuration key (§6). Distinct
/// from `VECTOR_SEARCH_TIMEOUT`: this is the Embedder's own request budget,
/// which may be configured longer than the race's hard deadline without
/// affecting it (see `recall::recall`'s effective-timeout computation).
pub const VECTOR_SEARCH_API_TIMEOUT_MS: u64 = 5000;

/// Maximum number of results returned by the local index or the vector search.
pub const MAX_SEARCH_RESULTS: usize = 5;

/// Soft paragraph-grouping limit (characters) used when chunking text for embedding.
pub const EMBED_CHUNK_SIZE: usize = 1000;

/// Number of partners returned by Hebbian spreading activation.
pub const SPREADING_TOP_N: usize = 3;

/// Number of retry attempts for the advisory lock before a mutation is abandoned.
pub const LOCK_MAX_RETRIES: u32 = 5;

/// Sleep between lock acquisition attempts.
pub const LOCK_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Literal keyword regex source matching special-concept lines.
pub const SPECIAL_CONCEPT_PATTERN: &str =
    r"(?i)IMPORTANT|TODO|DECISION|LESSON|REMEMBER|重要|决策|教训|记住";
