//! EmbeddingPort (C2, §4.2) — turns text into fixed-dimension vectors.

use async_trait::async_trait;

use crate::error::{EngineError, EngineResult};

#[async_trait]
pub trait EmbeddingPort: Send + Sync {
    /// Embed a single query string at search time.
    async fn embed_query(&self, text: &str) -> EngineResult<Vec<f32>>;

    /// Embed a batch of documents at ingest time, one vector per input, in
    /// the same order (§4.2).
    async fn embed_documents(&self, texts: &[String]) -> EngineResult<Vec<Vec<f32>>>;

    /// The dimension every vector this port returns must have.
    fn dimension(&self) -> usize;
}

/// Validates a returned vector against the port's declared dimension,
/// converting a mismatch into `contract_violation` the way §4.2 requires.
/// Adapters call this on every value they are about to return.
pub fn validate_dimension(vector: &[f32], expected: usize) -> EngineResult<()> {
    if vector.len() != expected {
        return Err(EngineError::ContractViolation(format!(
            "embedding has dimension {} but expected {}",
            vector.len(),
            expected
        )));
    }
    Ok(())
}

/// HTTP-backed adapter grounded in the teacher's `GeminiEmbeddings`/
/// `OpenAiEmbeddings` clients (`llm/provider/gemini_embeddings.rs`): a
/// `reqwest::Client`, an API key captured at construction, and a single
/// `base_url`/`model` pair. Generic over the wire format by delegating to
/// a small closure-free request builder so it isn't tied to one vendor's
/// JSON shape — concrete vendor SDKs are out of scope (§1), this is the
/// shape every such adapter takes.
pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
}

impl HttpEmbeddingClient {
    pub fn new(api_key: String, base_url: String, model: String, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
            dimension,
        }
    }

    fn embed_url(&self) -> String {
        format!("{}/embed?model={}&key={}", self.base_url, self.model, self.api_key)
    }
}

#[async_trait]
impl EmbeddingPort for HttpEmbeddingClient {
    async fn embed_query(&self, text: &str) -> EngineResult<Vec<f32>> {
        let vectors = self.embed_documents(std::slice::from_ref(&text.to_string())).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::UpstreamUnavailable("embedding service returned no vector".into()))
    }

    async fn embed_documents(&self, texts: &[String]) -> EngineResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({ "inputs": texts });

        let response = self
            .client
            .post(self.embed_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(EngineError::UpstreamUnavailable(format!(
                "embedding service returned {status}"
            )));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(e.to_string()))?;

        let vectors = parsed
            .get("embeddings")
            .and_then(|v| v.as_array())
            .ok_or_else(|| EngineError::UpstreamUnavailable("missing embeddings array".into()))?
            .iter()
            .map(|entry| {
                entry
                    .as_array()
                    .map(|arr| arr.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
                    .unwrap_or_default()
            })
            .collect::<Vec<Vec<f32>>>();

        for vector in &vectors {
            validate_dimension(vector, self.dimension)?;
        }

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic in-process embedding for tests — a content-derived hash
/// projected into `dimension` buckets. Never calls out to the network, so
/// tests that exercise `VectorProvider` end-to-end don't need live
/// credentials.
pub struct MockEmbeddingClient {
    dimension: usize,
}

impl MockEmbeddingClient {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingPort for MockEmbeddingClient {
    async fn embed_query(&self, text: &str) -> EngineResult<Vec<f32>> {
        Ok(hash_embed(text, self.dimension))
    }

    async fn embed_documents(&self, texts: &[String]) -> EngineResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_embed(t, self.dimension)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn hash_embed(text: &str, dimension: usize) -> Vec<f32> {
    use sha2::{Digest, Sha256};
    let mut vector = vec![0.0f32; dimension];
    let mut seed = text.as_bytes().to_vec();
    let mut i = 0;
    while i < dimension {
        let mut hasher = Sha256::new();
        hasher.update(&seed);
        let digest = hasher.finalize();
        for byte in digest.iter() {
            if i >= dimension {
                break;
            }
            vector[i] = (*byte as f32 / 255.0) * 2.0 - 1.0;
            i += 1;
        }
        seed = digest.to_vec();
    }
    vector
}
