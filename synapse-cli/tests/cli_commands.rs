//! End-to-end tests over the command surface.
//!
//! Each test drives the compiled `brain-synapse` binary against a scratch
//! engine directory, mirroring the filesystem layout the CLI expects:
//! `<engine>/../workspace/memory` for active logs and `.../archive` for
//! distilled ones.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;

struct Scratch {
    _tmp: tempfile::TempDir,
    engine_dir: PathBuf,
}

impl Scratch {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let engine_dir = tmp.path().join("engine");
        fs::create_dir_all(engine_dir.join("../workspace/memory/archive")).unwrap();
        Self {
            _tmp: tmp,
            engine_dir,
        }
    }

    fn active_dir(&self) -> PathBuf {
        self.engine_dir.join("../workspace/memory")
    }

    fn write_log(&self, name: &str, content: &str) {
        fs::write(self.active_dir().join(name), content).unwrap();
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("brain-synapse").unwrap();
        cmd.arg("--engine-dir").arg(&self.engine_dir);
        cmd
    }
}

fn hot_weights(engine_dir: &Path) -> serde_json::Value {
    let raw = fs::read_to_string(engine_dir.join("synapse_weights.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
#[serial]
fn distill_force_ingests_a_log_and_archives_it() {
    let scratch = Scratch::new();
    scratch.write_log("2025-01-01.md", "memory system database cache");

    scratch
        .cmd()
        .args(["distill", "--force", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"logs_processed\": 1"));

    assert!(!scratch.active_dir().join("2025-01-01.md").exists());
    assert!(scratch.active_dir().join("archive/2025-01-01.md").exists());

    let weights = hot_weights(&scratch.engine_dir);
    assert!(weights.get("memory").is_some());
    assert!(weights.get("database").is_some());
}

#[test]
#[serial]
fn recall_after_distill_returns_local_results() {
    let scratch = Scratch::new();
    scratch.write_log("2025-01-01.md", "database cache layer design");
    scratch
        .cmd()
        .args(["distill", "--force"])
        .assert()
        .success();

    scratch
        .cmd()
        .args(["recall", "database", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("local-file-search"));
}

#[test]
#[serial]
fn pin_exp_requires_a_colon() {
    let scratch = Scratch::new();
    scratch
        .cmd()
        .args(["pin-exp", "no-colon-here"])
        .assert()
        .failure();
}

#[test]
#[serial]
fn pin_exp_then_get_pinned_round_trips() {
    let scratch = Scratch::new();
    scratch
        .cmd()
        .args(["pin-exp", "retry:always retry on 429"])
        .assert()
        .success();

    scratch
        .cmd()
        .args(["get-pinned", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("retry"))
        .stdout(predicate::str::contains("always retry on 429"));
}

#[test]
#[serial]
fn memorize_rejects_missing_content() {
    let scratch = Scratch::new();
    scratch
        .cmd()
        .args(["memorize", "concept-only"])
        .assert()
        .failure();
}

#[test]
#[serial]
fn memorize_with_colon_syntax_persists_pinned_record() {
    let scratch = Scratch::new();
    scratch
        .cmd()
        .args(["memorize", "quant-strategy:always hedge with options"])
        .assert()
        .success();

    let weights = hot_weights(&scratch.engine_dir);
    let record = &weights["quant-strategy"];
    assert_eq!(record["pinned"], serde_json::json!(true));
    assert_eq!(record["weight"], serde_json::json!(2.5));
}

#[test]
#[serial]
fn forget_demotes_weak_concepts_to_latent() {
    let scratch = Scratch::new();
    scratch.write_log("2025-01-01.md", "ephemeral");
    scratch
        .cmd()
        .args(["distill", "--force"])
        .assert()
        .success();

    // Repeated forgets eventually decay the organic concept below threshold.
    for _ in 0..30 {
        scratch.cmd().arg("forget").assert().success();
    }

    // decay_rate 0.9 from an initial weight of 1.0 crosses forget_threshold
    // 0.2 after ~16 multiplicative passes (one already ran inside distill);
    // 30 "forget" calls is comfortably past that.
    scratch
        .cmd()
        .args(["latent-stats", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_latent\": 1"));
}

#[test]
#[serial]
fn get_top_concepts_honors_n_argument() {
    let scratch = Scratch::new();
    scratch.write_log("2025-01-01.md", "alpha beta gamma delta epsilon");
    scratch
        .cmd()
        .args(["distill", "--force"])
        .assert()
        .success();

    scratch
        .cmd()
        .args(["get-top-concepts", "2", "--format", "json"])
        .assert()
        .success();
}

#[test]
#[serial]
fn observe_requires_three_similar_records_to_promote_an_instinct() {
    let scratch = Scratch::new();
    let trace: String = (0..5)
        .map(|_| {
            serde_json::json!({
                "type": "error_resolution",
                "data": { "errorType": "ETIMEDOUT" }
            })
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n");

    scratch
        .cmd()
        .arg("observe")
        .write_stdin(trace)
        .assert()
        .success()
        .stdout(predicate::str::contains("instincts_promoted"));

    let weights = hot_weights(&scratch.engine_dir);
    assert!(weights.get("error-resolve-etimedout").is_some());
}

#[test]
#[serial]
fn deep_recall_standalone_runs_without_error() {
    let scratch = Scratch::new();
    scratch
        .cmd()
        .args(["deep-recall", "nothing-here", "--format", "json"])
        .assert()
        .success();
}
