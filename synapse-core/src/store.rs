//! Synapse Store (C4): hot+cold weight maps, Hebbian links, LTP/LTD,
//! persistence.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{EngineConfig, EnginePaths};
use crate::error::Result;
use crate::lock::FileLock;
use crate::types::{now_millis, Latent, Millis, Synapse};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct HotFile(BTreeMap<String, Synapse>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ColdFile(BTreeMap<String, Latent>);

/// In-memory hot/cold weight maps plus the configuration governing
/// reinforcement, decay, and demotion. One `SynapseStore` is owned per CLI
/// invocation, loaded at the start and persisted at defined checkpoints.
#[derive(Debug, Default)]
pub struct SynapseStore {
    pub hot: HashMap<String, Synapse>,
    pub cold: HashMap<String, Latent>,
}

impl SynapseStore {
    /// Load both weight files. A corrupt file is treated as empty — the
    /// next successful write repairs it.
    pub fn load(paths: &EnginePaths) -> Result<Self> {
        let hot = load_json::<HotFile>(&paths.hot_weights())
            .unwrap_or_default()
            .0
            .into_iter()
            .collect();
        let cold = load_json::<ColdFile>(&paths.latent_weights())
            .unwrap_or_default()
            .0
            .into_iter()
            .collect();
        Ok(Self { hot, cold })
    }

    /// Persist both weight files under the advisory lock. Never raises —
    /// failures are logged and the prior on-disk state is left intact.
    pub async fn persist(&self, paths: &EnginePaths) {
        let lock = FileLock::acquire(&paths.lock_file()).await;
        let _lock = match lock {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, "failed to acquire lock for persistence, mutation dropped");
                return;
            }
        };

        if let Err(e) = save_json(&paths.hot_weights(), &HotFile(self.hot.clone().into_iter().collect())) {
            warn!(error = %e, "failed to persist hot weights");
        }
        if let Err(e) = save_json(
            &paths.latent_weights(),
            &ColdFile(self.cold.clone().into_iter().collect()),
        ) {
            warn!(error = %e, "failed to persist latent weights");
        }
    }

    /// If `term` currently lives in the cold store, revive it into hot,
    /// preserving its organic fields (`first_seen`, `refs`, `count`, ...),
    /// so a subsequent upsert never leaves the same key in both stores at
    /// once (§3/§8: "a concept key appears in at most one of {hot, cold}
    /// at any instant").
    fn revive_if_cold(&mut self, term: &str) {
        if let Some(latent) = self.cold.remove(term) {
            self.hot.insert(term.to_string(), latent.synapse);
        }
    }

    /// Distill-time reinforcement: create or update the hot record for
    /// `term`, observed in `source_file`. Leaves `first_seen` untouched
    /// once set. Special-concept lines add an extra boost on top.
    pub fn reinforce_on_observation(
        &mut self,
        term: &str,
        source_file: &str,
        is_special: bool,
        initial_weight: f64,
    ) {
        self.revive_if_cold(term);
        let now = now_millis();
        let is_new = !self.hot.contains_key(term);
        let entry = self
            .hot
            .entry(term.to_string())
            .or_insert_with(|| Synapse::new_organic(initial_weight, source_file, now));

        if !is_new {
            entry.count += 1;
        }
        entry.refs.insert(source_file.to_string());
        entry.last_seen = now;
        entry.last_access = now;
        if is_special {
            entry.weight += crate::constants::SPECIAL_CONCEPT_BOOST;
        }
    }

    /// Recall-time reinforcement (LTP).
    pub fn reinforce_on_recall(&mut self, term: &str) {
        if let Some(entry) = self.hot.get_mut(term) {
            entry.last_access = now_millis();
            entry.weight += crate::constants::LTP_INCREMENT;
            entry.recall_count += 1;
        }
    }

    /// Hebbian co-occurrence linkage: every unordered pair in `file_to_terms`
    /// gets its link strength incremented symmetrically in both directions.
    pub fn build_hebbian_links(&mut self, file_to_terms: &HashMap<String, Vec<String>>) {
        let now = now_millis();
        for terms in file_to_terms.values() {
            for i in 0..terms.len() {
                for j in (i + 1)..terms.len() {
                    let (a, b) = (&terms[i], &terms[j]);
                    if a == b {
                        continue;
                    }
                    self.link_pair(a, b, now);
                }
            }
        }
    }

    fn link_pair(&mut self, a: &str, b: &str, now: Millis) {
        self.revive_if_cold(a);
        self.revive_if_cold(b);
        self.hot
            .entry(a.to_string())
            .or_insert_with(|| blank_linked_record(now))
            .synapses
            .entry(b.to_string())
            .and_modify(|w| *w += 1)
            .or_insert(1);
        self.hot
            .entry(b.to_string())
            .or_insert_with(|| blank_linked_record(now))
            .synapses
            .entry(a.to_string())
            .and_modify(|w| *w += 1)
            .or_insert(1);
    }

    /// Top `top_n` partners of `term` by link strength; empty when absent.
    #[must_use]
    pub fn spreading_activation(&self, term: &str, top_n: usize) -> Vec<String> {
        let Some(record) = self.hot.get(term) else {
            return Vec::new();
        };
        let mut partners: Vec<(&String, &i64)> = record.synapses.iter().collect();
        partners.sort_by(|a, b| b.1.cmp(a.1));
        partners
            .into_iter()
            .take(top_n)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Every hot key substring-matching `query` (either direction, case
    /// insensitive), sorted by descending weight, top 5.
    #[must_use]
    pub fn direct_activation(&self, query: &str) -> Vec<String> {
        let q = query.to_lowercase();
        if q.trim().is_empty() {
            return Vec::new();
        }
        let mut matches: Vec<(&String, f64)> = self
            .hot
            .iter()
            .filter(|(k, _)| {
                let k = k.to_lowercase();
                k.contains(&q) || q.contains(&k)
            })
            .map(|(k, v)| (k, v.weight))
            .collect();
        matches.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        matches.into_iter().take(5).map(|(k, _)| k.clone()).collect()
    }

    /// Penalty for concepts recalled but not subsequently reinforced.
    /// Resets `recall_count` on every record.
    pub fn predictive_ltd(&mut self) {
        for record in self.hot.values_mut() {
            if !record.pinned
                && record.recall_count >= 3
                && (record.count as f64) < 0.5 * (record.recall_count as f64)
            {
                record.weight -= 0.1 * record.recall_count as f64;
            }
            record.recall_count = 0;
        }
    }

    /// Multiplicative decay, then demotion of weak, non-pinned concepts into
    /// the latent store.
    pub fn apply_ltd(&mut self, config: &EngineConfig) {
        let now = now_millis();
        let mut to_demote = Vec::new();

        for (key, record) in &mut self.hot {
            if record.pinned {
                continue;
            }
            record.weight *= config.ltd.decay_rate;
            if record.weight < config.ltd.forget_threshold {
                to_demote.push(key.clone());
            }
        }

        for key in to_demote {
            if let Some(record) = self.hot.remove(&key) {
                let original_weight = record.weight;
                self.cold.insert(
                    key,
                    Latent {
                        synapse: record,
                        archived_at: now,
                        original_weight,
                    },
                );
            }
        }
    }

    /// Revive up to `limit` latent matches for `queries` into hot, plus a
    /// bounded scan of archive files for literal line matches.
    #[must_use]
    pub fn deep_recall(&mut self, queries: &[String], limit: usize, config: &EngineConfig) -> Vec<String> {
        let lowered: Vec<String> = queries
            .iter()
            .map(|q| q.to_lowercase())
            .filter(|q| !q.trim().is_empty())
            .collect();

        let mut matches: Vec<(String, f64)> = self
            .cold
            .iter()
            .filter(|(k, _)| {
                let k = k.to_lowercase();
                lowered.iter().any(|q| k.contains(q.as_str()) || q.contains(&k))
            })
            .map(|(k, v)| (k.clone(), v.original_weight))
            .collect();
        matches.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(limit);

        let now = now_millis();
        let mut revived = Vec::new();
        for (key, _) in matches {
            if let Some(latent) = self.cold.remove(&key) {
                let mut synapse = latent.synapse;
                synapse.weight = config.ltd.revived_weight;
                synapse.last_access = now;
                synapse.revived_from = Some("latent".to_string());
                synapse.revived_at = Some(now);
                self.hot.insert(key.clone(), synapse);
                revived.push(key);
            }
        }
        revived
    }

    /// Up to the first 10 archive files, each contributing up to 3 matching
    /// lines containing the (case-insensitive) query.
    #[must_use]
    pub fn scan_archive_for_context(archive_dir: &Path, query: &str) -> Vec<(String, Vec<String>)> {
        let needle = query.to_lowercase();
        let Ok(entries) = std::fs::read_dir(archive_dir) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for entry in entries.flatten().take(10) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            let lines: Vec<String> = content
                .lines()
                .filter(|l| l.to_lowercase().contains(&needle))
                .take(3)
                .map(str::to_string)
                .collect();
            if !lines.is_empty() {
                out.push((
                    path.file_name().unwrap_or_default().to_string_lossy().into_owned(),
                    lines,
                ));
            }
        }
        out
    }

    /// Upsert a pinned rule. Never decayed, never demoted.
    pub fn pin(&mut self, term: &str, rule: &str) {
        self.revive_if_cold(term);
        let now = now_millis();
        let entry = self
            .hot
            .entry(term.to_string())
            .or_insert_with(|| Synapse::new_organic(1.0, "pinned", now));
        entry.pinned = true;
        entry.rule = Some(rule.to_string());
        entry.weight = entry.weight.max(1.0);
    }

    /// Explicit memorize: bypasses extraction, inserts a pinned record at an
    /// elevated initial weight.
    pub fn memorize(&mut self, concept: &str, content: &str, config: &EngineConfig) {
        self.revive_if_cold(concept);
        let now = now_millis();
        let entry = self
            .hot
            .entry(concept.to_string())
            .or_insert_with(|| Synapse::new_organic(config.memorize_weight(), "explicit_memorize", now));
        entry.pinned = true;
        entry.rule = Some(content.to_string());
        entry.source = Some("explicit_memorize".to_string());
        entry.weight = config.memorize_weight();
        entry.memorized_at = Some(now);
    }

    /// All pinned rules, for `get-pinned`.
    #[must_use]
    pub fn pinned_rules(&self) -> Vec<(String, String, f64)> {
        self.hot
            .iter()
            .filter(|(_, v)| v.pinned)
            .map(|(k, v)| (k.clone(), v.rule.clone().unwrap_or_default(), v.weight))
            .collect()
    }

    /// Top-N hot concepts by weight, for `get-top-concepts`.
    #[must_use]
    pub fn top_concepts(&self, n: usize) -> Vec<(String, f64)> {
        let mut all: Vec<(&String, f64)> = self.hot.iter().map(|(k, v)| (k, v.weight)).collect();
        all.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        all.into_iter().take(n).map(|(k, w)| (k.clone(), w)).collect()
    }

    /// Upsert a pinned instinct promoted by the Observer.
    pub fn upsert_instinct(
        &mut self,
        id: &str,
        rule: &str,
        trigger: &str,
        domain: &str,
        evidence: Vec<String>,
    ) {
        self.revive_if_cold(id);
        let now = now_millis();
        let entry = self
            .hot
            .entry(id.to_string())
            .or_insert_with(|| Synapse::new_organic(1.0, "observer", now));
        entry.pinned = true;
        entry.rule = Some(rule.to_string());
        entry.trigger = Some(trigger.to_string());
        entry.domain = Some(domain.to_string());
        entry.count = evidence.len() as u64;
        entry.evidence = Some(evidence);
    }
}

fn blank_linked_record(now: Millis) -> Synapse {
    let mut r = Synapse::new_organic(0.5, "hebbian", now);
    r.synapses.clear();
    r.refs.clear();
    r.count = 0;
    r
}

fn load_json<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw).unwrap_or_default())
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}
