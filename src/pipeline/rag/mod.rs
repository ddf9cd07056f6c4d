pub mod ollama;
pub mod retrieval;
pub mod prompt;
pub mod orchestrator;

pub use ollama::{MockLlmClient, OllamaClient};
pub use orchestrator::{LabReportRag, LlmGenerate};
pub use retrieval::RetrievalIndex;

use thiserror::Error;

use crate::pipeline::storage::StorageError;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Ollama connection failed: {0}")]
    OllamaConnection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    OllamaError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Vector search failed: {0}")]
    VectorSearch(String),

    #[error("Reference index error: {0}")]
    Storage(#[from] StorageError),
}
