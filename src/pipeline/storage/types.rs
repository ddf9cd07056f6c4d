use serde::{Deserialize, Serialize};

use super::StorageError;
use crate::models::ReferenceCategory;

/// A reference document loaded from the data directory.
#[derive(Debug, Clone)]
pub struct ReferenceDocument {
    pub content: String,
    pub source: String,
    pub filename: String,
    pub category: ReferenceCategory,
}

/// A chunk of a reference document
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub content: String,
    pub chunk_index: usize,
    pub char_offset: usize,
}

/// A stored chunk with its provenance, ready to be embedded.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub content: String,
    pub source: String,
    pub filename: String,
    pub category: ReferenceCategory,
    pub chunk_index: usize,
}

/// A search hit from the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub content: String,
    pub filename: String,
    pub score: f32,
}

/// Chunking strategy trait
pub trait Chunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk>;
}

/// Embedding model abstraction
pub trait EmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError>;
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError>;
    fn dimension(&self) -> usize;
    /// Identifier recorded in the index so queries use the same model.
    fn model_name(&self) -> &str;
}

/// Allow `Box<dyn EmbeddingModel>` to be used as `&impl EmbeddingModel`.
impl EmbeddingModel for Box<dyn EmbeddingModel + Send + Sync> {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        (**self).embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Vector search over the reference index
pub trait VectorSearch {
    fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>, StorageError>;
}
