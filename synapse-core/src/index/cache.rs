//! On-disk shape of `local_index_cache.json`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedFile {
    pub mtime: i64,
    pub path: String,
    pub words: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexCache {
    #[serde(rename = "lastBuildTime", default)]
    pub last_build_time: i64,
    #[serde(default)]
    pub files: BTreeMap<String, IndexedFile>,
}

pub fn load(path: &Path) -> Result<IndexCache> {
    if !path.exists() {
        return Ok(IndexCache::default());
    }
    let raw = std::fs::read_to_string(path)?;
    // A corrupt cache is treated as empty, never raised.
    Ok(serde_json::from_str(&raw).unwrap_or_default())
}

pub fn save(path: &Path, cache: &IndexCache) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, cache)?;
    Ok(())
}
