//! Engine-directory resolution and configuration loading for the CLI
//! surface.

use std::path::{Path, PathBuf};

use synapse_core::config::{EngineConfig, EnginePaths};

/// Resolve the engine directory and load its configuration file, if any.
///
/// Resolution order: an explicit `--engine-dir` flag, then the
/// `BRAIN_SYNAPSE_DIR` environment variable, then `.brain-synapse` under the
/// current directory.
pub fn resolve_paths(engine_dir: Option<&Path>) -> EnginePaths {
    let root = engine_dir.map(Path::to_path_buf).unwrap_or_else(default_root);
    EnginePaths::new(root)
}

fn default_root() -> PathBuf {
    if let Ok(dir) = std::env::var("BRAIN_SYNAPSE_DIR") {
        return PathBuf::from(dir);
    }
    PathBuf::from(".brain-synapse")
}

/// Load `brain-synapse.toml` from the engine directory, falling back to
/// defaults when absent.
pub fn load_config(paths: &EnginePaths) -> anyhow::Result<EngineConfig> {
    let config_path = paths.root.join("brain-synapse.toml");
    Ok(EngineConfig::load(Some(&config_path))?)
}
