//! Embedder (C3): the external vector-search collaborator.
//!
//! Only the trait and a local, credential-gated default implementation live
//! here — the real HTTP transport to Voyage/HF/SiliconFlow is a separate,
//! pluggable concern. Absence of credentials is not an error: callers see
//! `is_available() == false` and proceed local-only.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingMatch {
    pub file: String,
    pub preview: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingSearchResponse {
    pub ok: bool,
    pub results: Vec<EmbeddingMatch>,
}

/// Pluggable vector embedding capability.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Order-preserving batch embedding. Default implementation embeds
    /// sequentially; a real HTTP provider would override this for a single
    /// batched request.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }

    /// Idempotently index a file's chunks for later vector search.
    /// Deduplicates by `(file, preview[:200])`.
    async fn incremental_index(&self, file: &str, content: &str) -> Result<()>;

    async fn search(&self, query: &str) -> Result<EmbeddingSearchResponse>;

    /// Whether this embedder is configured and reachable. Absence of
    /// credentials must make this return `false`, not an error.
    fn is_available(&self) -> bool;
}

/// Credential-gated local embedder: present so the recall pipeline always
/// has a concrete `Embedder` to race against, but one that reports
/// unavailable unless at least one of the documented environment variables
/// is set (`VOYAGE_API_KEY`, `HF_TOKEN`, `SILICONFLOW_API_KEY`).
///
/// Chunks are paragraph-grouped up to `vectorSearchApi.chunkSize` and stored
/// in an in-process vector cache; cosine similarity is computed locally
/// against that cache, matching the "persisted vector cache" contract
/// without requiring network access.
pub struct LocalVectorEmbedder {
    dimension: usize,
    cache: Mutex<HashMap<(String, String), (Vec<f32>, String)>>,
    /// `vectorSearchApi.maxResults` (§6): cap on returned matches.
    max_results: usize,
    /// `vectorSearchApi.chunkSize` (§6): soft paragraph-grouping limit used
    /// when chunking text for embedding.
    chunk_size: usize,
}

impl LocalVectorEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self::with_config(dimension, &crate::config::VectorSearchApiConfig::default())
    }

    #[must_use]
    pub fn with_config(dimension: usize, config: &crate::config::VectorSearchApiConfig) -> Self {
        Self {
            dimension,
            cache: Mutex::new(HashMap::new()),
            max_results: config.max_results,
            chunk_size: config.chunk_size,
        }
    }

    #[must_use]
    pub fn credentials_present() -> bool {
        ["VOYAGE_API_KEY", "HF_TOKEN", "SILICONFLOW_API_KEY"]
            .iter()
            .any(|k| std::env::var(k).is_ok())
    }

    /// Deterministic bag-of-characters hashing embedding — a stand-in for a
    /// real model, sufficient to support local cosine-similarity search
    /// without a network round trip.
    fn hash_embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dimension];
        for (i, byte) in text.as_bytes().iter().enumerate() {
            let idx = (usize::from(*byte) + i) % self.dimension;
            v[idx] += 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }

    fn chunk(&self, content: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        for paragraph in content.split("\n\n") {
            if current.len() + paragraph.len() > self.chunk_size && !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl Embedder for LocalVectorEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.hash_embed(text))
    }

    async fn incremental_index(&self, file: &str, content: &str) -> Result<()> {
        if !self.is_available() {
            return Ok(());
        }
        let mut cache = self.cache.lock().expect("embedder cache poisoned");
        for chunk in self.chunk(content) {
            let preview: String = chunk.chars().take(200).collect();
            let key = (file.to_string(), preview.clone());
            if cache.contains_key(&key) {
                continue;
            }
            let vector = self.hash_embed(&chunk);
            cache.insert(key, (vector, preview));
        }
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<EmbeddingSearchResponse> {
        if !self.is_available() {
            return Ok(EmbeddingSearchResponse::default());
        }
        let query_vec = self.hash_embed(query);
        let cache = self.cache.lock().expect("embedder cache poisoned");
        let mut results: Vec<EmbeddingMatch> = cache
            .iter()
            .map(|((file, _preview), (vector, preview))| EmbeddingMatch {
                file: file.clone(),
                preview: preview.clone(),
                similarity: cosine_similarity(&query_vec, vector),
            })
            .collect();
        results.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(self.max_results);
        Ok(EmbeddingSearchResponse { ok: true, results })
    }

    fn is_available(&self) -> bool {
        Self::credentials_present()
    }
}

/// An embedder that is always unavailable — useful for tests exercising the
/// "local-only" fallback path deterministically.
pub struct NullEmbedder;

#[async_trait]
impl Embedder for NullEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(Vec::new())
    }

    async fn incremental_index(&self, _file: &str, _content: &str) -> Result<()> {
        Ok(())
    }

    async fn search(&self, _query: &str) -> Result<EmbeddingSearchResponse> {
        Ok(EmbeddingSearchResponse::default())
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn null_embedder_is_never_available() {
        let e = NullEmbedder;
        assert!(!e.is_available());
        let resp = e.search("anything").await.unwrap();
        assert!(!resp.ok);
        assert!(resp.results.is_empty());
    }

    // Mutates process-wide environment variables, so it must not interleave
    // with any other test that reads or writes them.
    #[test]
    #[serial_test::serial]
    fn local_vector_embedder_requires_a_credential_env_var() {
        for key in ["VOYAGE_API_KEY", "HF_TOKEN", "SILICONFLOW_API_KEY"] {
            std::env::remove_var(key);
        }
        let embedder = LocalVectorEmbedder::new(32);
        assert!(!embedder.is_available());

        std::env::set_var("HF_TOKEN", "test-token");
        assert!(embedder.is_available());
        std::env::remove_var("HF_TOKEN");
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn incremental_index_is_a_no_op_without_credentials() {
        for key in ["VOYAGE_API_KEY", "HF_TOKEN", "SILICONFLOW_API_KEY"] {
            std::env::remove_var(key);
        }
        let embedder = LocalVectorEmbedder::new(32);
        embedder.incremental_index("a.md", "some content").await.unwrap();
        let resp = embedder.search("content").await.unwrap();
        assert!(resp.results.is_empty());
    }
}
