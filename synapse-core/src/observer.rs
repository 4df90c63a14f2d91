//! Observer (C5): append-only observation log plus batch promotion of
//! recurrent patterns into pinned synapses.

use std::collections::BTreeMap;
use std::path::Path;

use rand::Rng;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::EnginePaths;
use crate::constants::MIN_GROUP_SIZE_FOR_INSTINCT;
use crate::error::Result;
use crate::store::SynapseStore;
use crate::types::{now_millis, Observation, ObservationData, ObservationKind};

/// A single promoted instinct, returned so the distillation pipeline can
/// report what changed.
#[derive(Debug, Clone, Serialize)]
pub struct PromotedInstinct {
    pub id: String,
    pub trigger: String,
    pub confidence: f64,
    pub evidence_count: usize,
}

struct Template {
    id: &'static str,
    trigger: &'static str,
    action: &'static str,
    domain: &'static str,
}

fn template_for(kind: ObservationKind) -> Template {
    match kind {
        ObservationKind::UserCorrection => Template {
            id: "user-correct",
            trigger: "user correction pattern",
            action: "auto-correct",
            domain: "user_preference",
        },
        ObservationKind::ErrorResolution => Template {
            id: "error-resolve",
            trigger: "error",
            action: "auto-resolve",
            domain: "error_handling",
        },
        ObservationKind::Workflow => Template {
            id: "workflow",
            trigger: "workflow",
            action: "auto-execute",
            domain: "workflow",
        },
        ObservationKind::ToolPreference => Template {
            id: "tool-pref",
            trigger: "task",
            action: "use preferred tool for",
            domain: "tool_usage",
        },
    }
}

/// Records observations and periodically promotes recurrent ones into
/// pinned synapses. Holds no state of its own beyond the filesystem paths —
/// the Synapse Store it mutates is passed in at call time.
pub struct Observer;

impl Observer {
    /// Append one observation to `observations.jsonl`. Synchronous,
    /// best-effort: any failure is logged and swallowed, never propagated.
    pub fn record(paths: &EnginePaths, kind: ObservationKind, data: ObservationData) {
        let observation = Observation {
            id: new_observation_id(),
            timestamp: now_millis(),
            kind,
            data,
        };
        if let Err(e) = append_line(&paths.observations_log(), &observation) {
            warn!(error = %e, "failed to record observation");
        }
    }

    /// Read the observation log, group by `(type, key)`, and synthesise an
    /// instinct for every group of size ≥3, provided the log holds at least
    /// `min_observations` records in total. Truncates the log on success.
    /// Never raises — a read failure is logged and treated as "no-op".
    pub fn batch_analyze(
        paths: &EnginePaths,
        store: &mut SynapseStore,
        min_observations: usize,
    ) -> Vec<PromotedInstinct> {
        let observations = match read_log(&paths.observations_log()) {
            Ok(obs) => obs,
            Err(e) => {
                warn!(error = %e, "failed to read observation log, skipping batch analysis");
                return Vec::new();
            }
        };

        if observations.len() < min_observations {
            return Vec::new();
        }

        let mut groups: BTreeMap<(ObservationKind, String), Vec<&Observation>> = BTreeMap::new();
        for obs in &observations {
            let key = obs.data.group_key().to_string();
            groups.entry((obs.kind, key)).or_default().push(obs);
        }

        let mut promoted = Vec::new();
        for ((kind, key), members) in groups {
            if members.len() < MIN_GROUP_SIZE_FOR_INSTINCT {
                continue;
            }
            let template = template_for(kind);
            let sanitized = sanitize_key(&key);
            let id = format!("{}-{sanitized}", template.id);
            let trigger = format!("{}: {key}", template.trigger);
            let rule = format!("{}: {key}", template.action);
            let confidence = confidence_bucket(members.len());
            let evidence: Vec<String> = members.iter().map(|o| o.id.clone()).collect();

            store.upsert_instinct(&id, &rule, &trigger, template.domain, evidence.clone());
            info!(id = %id, confidence, evidence = evidence.len(), "promoted instinct");
            promoted.push(PromotedInstinct {
                id,
                trigger,
                confidence,
                evidence_count: evidence.len(),
            });
        }

        if !promoted.is_empty() {
            if let Err(e) = std::fs::write(&paths.observations_log(), b"") {
                warn!(error = %e, "failed to truncate observation log after promotion");
            }
        }

        promoted
    }
}

fn confidence_bucket(group_size: usize) -> f64 {
    match group_size {
        0..=2 => 0.3,
        3..=5 => 0.5,
        6..=10 => 0.7,
        _ => 0.85,
    }
}

fn sanitize_key(key: &str) -> String {
    static NON_WORD: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = NON_WORD.get_or_init(|| Regex::new(r"[^\w]+").unwrap());
    re.replace_all(&key.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

fn new_observation_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("obs_{}_{}", now_millis(), suffix.to_lowercase())
}

fn append_line(path: &Path, observation: &Observation) -> Result<()> {
    use std::io::Write;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let line = serde_json::to_string(observation)?;
    writeln!(file, "{line}")?;
    Ok(())
}

fn read_log(path: &Path) -> Result<Vec<Observation>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    let mut out = Vec::new();
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Observation>(line) {
            Ok(o) => out.push(o),
            Err(e) => warn!(error = %e, "skipping malformed observation line"),
        }
    }
    Ok(out)
}
