use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::EmbeddingModel;
use super::StorageError;

/// Standard embedding dimension for all-MiniLM-L6-v2
pub const EMBEDDING_DIM: usize = 384;

// ═══════════════════════════════════════════════════════════
// Ollama embedder: default backend
// ═══════════════════════════════════════════════════════════

/// Embeddings served by a local Ollama instance (`/api/embed`).
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    dimension: usize,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    /// Must be called outside an async context (blocking client).
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, StorageError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::ModelInit(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimension: EMBEDDING_DIM,
            client,
        })
    }

    /// Override the expected vector size for models other than all-MiniLM.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                StorageError::EmbeddingConnection(self.base_url.clone())
            } else {
                StorageError::Embedding(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StorageError::Embedding(format!("HTTP {status}: {body}")));
        }

        let parsed: EmbedResponse = response
            .json()
            .map_err(|e| StorageError::Embedding(format!("Response parsing: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(StorageError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }

        Ok(parsed.embeddings)
    }
}

impl EmbeddingModel for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        self.request(&[text])?
            .pop()
            .ok_or_else(|| StorageError::Embedding("Empty embedding response".into()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ═══════════════════════════════════════════════════════════
// ONNX Embedder: behind `onnx-embeddings` feature
// ═══════════════════════════════════════════════════════════

/// Longest token sequence fed to the sentence encoder (BERT position limit).
pub const MAX_SEQUENCE_TOKENS: usize = 512;

#[cfg(feature = "onnx-embeddings")]
mod onnx {
    use super::{mean_pool, EmbeddingModel, StorageError, EMBEDDING_DIM, MAX_SEQUENCE_TOKENS};
    use ort::session::Session;
    use std::path::Path;
    use std::sync::Mutex;
    use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

    /// Sentence embeddings computed in-process from an exported
    /// sentence-transformers model directory (`model.onnx` + `tokenizer.json`).
    ///
    /// The directory name is recorded as the model id, so an index built
    /// with one export is flagged when queried with another.
    pub struct OnnxEmbedder {
        model_id: String,
        session: Mutex<Session>,
        tokenizer: Tokenizer,
    }

    impl OnnxEmbedder {
        pub fn load(model_dir: &Path) -> Result<Self, StorageError> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");
            for required in [&model_path, &tokenizer_path] {
                if !required.exists() {
                    return Err(StorageError::ModelNotFound(required.clone()));
                }
            }

            let session = Session::builder()
                .map_err(|e: ort::Error| StorageError::ModelInit(e.to_string()))?
                .with_intra_threads(2)
                .map_err(|e: ort::Error| StorageError::ModelInit(e.to_string()))?
                .commit_from_file(&model_path)
                .map_err(|e: ort::Error| StorageError::ModelInit(format!("ONNX load failed: {e}")))?;

            let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| StorageError::ModelInit(format!("Tokenizer load failed: {e}")))?;
            // Batches are padded to their longest member
            tokenizer.with_padding(Some(PaddingParams::default()));
            tokenizer
                .with_truncation(Some(TruncationParams {
                    max_length: MAX_SEQUENCE_TOKENS,
                    ..TruncationParams::default()
                }))
                .map_err(|e| StorageError::ModelInit(format!("Tokenizer truncation: {e}")))?;

            let model_id = model_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "onnx".into());

            tracing::info!(model = %model_id, dir = %model_dir.display(), "ONNX embedder loaded");
            Ok(Self {
                model_id,
                session: Mutex::new(session),
                tokenizer,
            })
        }

        /// One forward pass for the whole batch.
        fn infer_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
            use ort::value::TensorRef;

            let encodings = self
                .tokenizer
                .encode_batch(texts.to_vec(), true)
                .map_err(|e| StorageError::Tokenization(e.to_string()))?;

            let batch = encodings.len();
            let seq_len = encodings.first().map(|e| e.len()).unwrap_or(0);
            let flatten = |field: fn(&tokenizers::Encoding) -> &[u32]| -> Vec<i64> {
                encodings
                    .iter()
                    .flat_map(|e| field(e).iter().map(|&v| v as i64))
                    .collect()
            };
            let ids = flatten(tokenizers::Encoding::get_ids);
            let mask = flatten(tokenizers::Encoding::get_attention_mask);
            let types = flatten(tokenizers::Encoding::get_type_ids);

            let to_array = |data: Vec<i64>| {
                ndarray::Array2::from_shape_vec((batch, seq_len), data)
                    .map_err(|e| StorageError::Embedding(e.to_string()))
            };
            let ids_array = to_array(ids)?;
            let mask_array = to_array(mask.clone())?;
            let type_array = to_array(types)?;

            let ids_tensor = TensorRef::from_array_view(&ids_array)
                .map_err(|e| StorageError::Embedding(e.to_string()))?;
            let mask_tensor = TensorRef::from_array_view(&mask_array)
                .map_err(|e| StorageError::Embedding(e.to_string()))?;
            let type_tensor = TensorRef::from_array_view(&type_array)
                .map_err(|e| StorageError::Embedding(e.to_string()))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| StorageError::Embedding("Session lock poisoned".into()))?;
            let outputs = session
                .run(ort::inputs![ids_tensor, mask_tensor, type_tensor])
                .map_err(|e| StorageError::Embedding(format!("ONNX inference failed: {e}")))?;
            let (shape, hidden) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| StorageError::Embedding(format!("Output extraction: {e}")))?;

            let dims: Vec<i64> = shape.iter().copied().collect();
            let expected = [batch as i64, seq_len as i64, EMBEDDING_DIM as i64];
            if dims != expected {
                return Err(StorageError::Embedding(format!(
                    "Unexpected output shape {dims:?}, expected {expected:?}"
                )));
            }

            let per_text = seq_len * EMBEDDING_DIM;
            Ok((0..batch)
                .map(|i| {
                    mean_pool(
                        &hidden[i * per_text..(i + 1) * per_text],
                        &mask[i * seq_len..(i + 1) * seq_len],
                        EMBEDDING_DIM,
                    )
                })
                .collect())
        }
    }

    impl EmbeddingModel for OnnxEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
            self.infer_batch(&[text])?
                .pop()
                .ok_or_else(|| StorageError::Embedding("Empty embedding output".into()))
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            self.infer_batch(texts)
        }

        fn dimension(&self) -> usize {
            EMBEDDING_DIM
        }

        fn model_name(&self) -> &str {
            &self.model_id
        }
    }
}

#[cfg(feature = "onnx-embeddings")]
pub use onnx::OnnxEmbedder;

/// The embedding backend this build uses: local ONNX when the
/// `onnx-embeddings` feature is on, Ollama otherwise.
pub fn embedder_for(
    config: &crate::config::AppConfig,
) -> Result<Box<dyn EmbeddingModel + Send + Sync>, StorageError> {
    #[cfg(feature = "onnx-embeddings")]
    {
        let _ = config;
        Ok(Box::new(OnnxEmbedder::load(&crate::config::embedding_model_dir())?))
    }

    #[cfg(not(feature = "onnx-embeddings"))]
    {
        Ok(Box::new(OllamaEmbedder::new(
            &config.ollama_url,
            &config.embed_model,
            config.llm_timeout,
        )?))
    }
}

// ═══════════════════════════════════════════════════════════
// Mock embedder: deterministic, no model required
// ═══════════════════════════════════════════════════════════

/// Mock embedding model for testing: produces deterministic bag-of-words vectors.
///
/// Texts sharing words land close together, so retrieval ordering is
/// meaningful in tests.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            dimension: EMBEDDING_DIM,
        }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingModel for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        Ok(deterministic_vector(text, self.dimension))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        Ok(texts
            .iter()
            .map(|t| deterministic_vector(t, self.dimension))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

/// Each lowercase word becomes a one-hot "token state" in a hashed bucket;
/// the states go through the same pooling as the ONNX encoder output.
fn deterministic_vector(text: &str, dim: usize) -> Vec<f32> {
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let mut token_states = vec![0.0f32; words.len() * dim];
    for (i, word) in words.iter().enumerate() {
        // FNV-1a
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.to_lowercase().bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        token_states[i * dim + (hash % dim as u64) as usize] = 1.0;
    }

    mean_pool(&token_states, &vec![1; words.len()], dim)
}

/// Attention-masked mean over per-token states (`mask.len()` rows of `dim`),
/// then L2-normalized. Padding rows (mask 0) do not contribute.
pub(crate) fn mean_pool(token_states: &[f32], mask: &[i64], dim: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; dim];
    let mut weight = 0.0f32;

    for (row, &m) in token_states.chunks_exact(dim).zip(mask) {
        if m == 0 {
            continue;
        }
        weight += 1.0;
        for (p, v) in pooled.iter_mut().zip(row) {
            *p += v;
        }
    }

    if weight > 0.0 {
        for p in &mut pooled {
            *p /= weight;
        }
    }
    l2_normalize(&mut pooled);
    pooled
}

fn l2_normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in vec.iter_mut() {
            *val /= norm;
        }
    }
}
