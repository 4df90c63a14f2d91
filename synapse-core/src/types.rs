//! Data model: synapse records, latent records, observation records, and
//! instinct records.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Milliseconds since the Unix epoch. Kept as a plain integer (rather than
/// `chrono::DateTime`) because the persisted JSON shape is a flat number.
pub type Millis = i64;

#[must_use]
pub fn now_millis() -> Millis {
    chrono::Utc::now().timestamp_millis()
}

/// A concept record in the hot store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Synapse {
    pub weight: f64,
    pub count: u64,
    #[serde(default)]
    pub recall_count: u64,
    pub first_seen: Millis,
    pub last_seen: Millis,
    pub last_access: Millis,
    #[serde(default)]
    pub refs: BTreeSet<String>,
    #[serde(default)]
    pub synapses: BTreeMap<String, i64>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub rule: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub evidence: Option<Vec<String>>,
    #[serde(default)]
    pub revived_from: Option<String>,
    #[serde(default)]
    pub revived_at: Option<Millis>,
    #[serde(default)]
    pub memorized_at: Option<Millis>,
}

impl Synapse {
    /// A fresh organic concept born on first appearance in a log.
    #[must_use]
    pub fn new_organic(weight: f64, source_file: &str, now: Millis) -> Self {
        let mut refs = BTreeSet::new();
        refs.insert(source_file.to_string());
        Self {
            weight,
            count: 1,
            recall_count: 0,
            first_seen: now,
            last_seen: now,
            last_access: now,
            refs,
            synapses: BTreeMap::new(),
            pinned: false,
            rule: None,
            domain: None,
            source: None,
            trigger: None,
            evidence: None,
            revived_from: None,
            revived_at: None,
            memorized_at: None,
        }
    }

    #[must_use]
    pub fn satisfies_invariants(&self) -> bool {
        self.weight >= 0.0 && self.first_seen <= self.last_seen && self.last_seen <= self.last_access
    }
}

/// A concept record in the cold (latent) store: the organic record plus the
/// weight it had at the moment of demotion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Latent {
    #[serde(flatten)]
    pub synapse: Synapse,
    pub archived_at: Millis,
    pub original_weight: f64,
}

/// The Observer's append-only observation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub timestamp: Millis,
    #[serde(rename = "type")]
    pub kind: ObservationKind,
    pub data: ObservationData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    UserCorrection,
    ErrorResolution,
    Workflow,
    ToolPreference,
}

impl ObservationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserCorrection => "user_correction",
            Self::ErrorResolution => "error_resolution",
            Self::Workflow => "workflow",
            Self::ToolPreference => "tool_preference",
        }
    }
}

/// Free-form payload carried by an observation. `pattern`/`error_type`/
/// `workflow_hash`/`task_type` are the fields the batch pass groups by, in
/// that priority order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservationData {
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default, rename = "errorType")]
    pub error_type: Option<String>,
    #[serde(default, rename = "workflowHash")]
    pub workflow_hash: Option<String>,
    #[serde(default, rename = "taskType")]
    pub task_type: Option<String>,
}

impl ObservationData {
    /// `key <- data.pattern ?? data.errorType ?? data.workflowHash ?? data.taskType ?? "default"`
    #[must_use]
    pub fn group_key(&self) -> &str {
        self.pattern
            .as_deref()
            .or(self.error_type.as_deref())
            .or(self.workflow_hash.as_deref())
            .or(self.task_type.as_deref())
            .unwrap_or("default")
    }
}
