use super::RagError;
use crate::pipeline::storage::types::{EmbeddingModel, ScoredChunk, VectorSearch};

pub const NO_REFERENCE_DATA: &str = "No medical reference data available.";
pub const NO_RELEVANT_INFO: &str = "No relevant information found.";
pub const RETRIEVAL_ERROR: &str = "Error retrieving medical information.";

/// Embedding model paired with the vector store it was used to build.
pub struct RetrievalIndex {
    embedder: Box<dyn EmbeddingModel + Send + Sync>,
    store: Box<dyn VectorSearch + Send + Sync>,
}

impl RetrievalIndex {
    pub fn new(
        embedder: Box<dyn EmbeddingModel + Send + Sync>,
        store: Box<dyn VectorSearch + Send + Sync>,
    ) -> Self {
        Self { embedder, store }
    }

    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>, RagError> {
        semantic_search(query, self.embedder.as_ref(), self.store.as_ref(), top_k)
    }
}

/// Run semantic search using a vector store.
pub fn semantic_search(
    query_text: &str,
    embedder: &dyn EmbeddingModel,
    vector_store: &dyn VectorSearch,
    top_k: usize,
) -> Result<Vec<ScoredChunk>, RagError> {
    let query_embedding = embedder
        .embed(query_text)
        .map_err(|e| RagError::EmbeddingFailed(e.to_string()))?;

    vector_store
        .search(&query_embedding, top_k)
        .map_err(|e| RagError::VectorSearch(e.to_string()))
}

/// Reference passages for `query`, joined by blank lines.
///
/// Never fails: a missing index, an empty result and a retrieval error each
/// produce a fixed placeholder so generation can still proceed.
pub fn retrieve_context(index: Option<&RetrievalIndex>, query: &str, top_k: usize) -> String {
    let Some(index) = index else {
        return NO_REFERENCE_DATA.to_string();
    };

    match index.search(query, top_k) {
        Ok(hits) if hits.is_empty() => NO_RELEVANT_INFO.to_string(),
        Ok(hits) => {
            tracing::debug!(query, hits = hits.len(), "Retrieved reference context");
            hits.into_iter()
                .map(|h| h.content)
                .collect::<Vec<_>>()
                .join("\n\n")
        }
        Err(e) => {
            tracing::warn!(error = %e, "Reference retrieval failed");
            RETRIEVAL_ERROR.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferenceCategory;
    use crate::pipeline::storage::embedder::MockEmbedder;
    use crate::pipeline::storage::types::ChunkRecord;
    use crate::pipeline::storage::vectordb::SqliteVectorStore;
    use crate::pipeline::storage::StorageError;

    fn index_with(texts: &[&str]) -> RetrievalIndex {
        let embedder = MockEmbedder::new();
        let store = SqliteVectorStore::open_in_memory().unwrap();
        let records: Vec<ChunkRecord> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| ChunkRecord {
                content: t.to_string(),
                source: format!("data/lab_markers/{i}.txt"),
                filename: format!("{i}.txt"),
                category: ReferenceCategory::LabMarkers,
                chunk_index: 0,
            })
            .collect();
        let embeddings = embedder.embed_batch(texts).unwrap();
        store.store_chunks(&records, &embeddings).unwrap();
        RetrievalIndex::new(Box::new(embedder), Box::new(store))
    }

    struct BrokenEmbedder;

    impl EmbeddingModel for BrokenEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, StorageError> {
            Err(StorageError::Embedding("model offline".into()))
        }
        fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
            Err(StorageError::Embedding("model offline".into()))
        }
        fn dimension(&self) -> usize {
            384
        }
        fn model_name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn no_index_returns_placeholder() {
        assert_eq!(retrieve_context(None, "glucose", 3), NO_REFERENCE_DATA);
    }

    #[test]
    fn empty_index_returns_no_relevant_info() {
        let index = index_with(&[]);
        assert_eq!(retrieve_context(Some(&index), "glucose", 3), NO_RELEVANT_INFO);
    }

    #[test]
    fn hits_are_joined_by_blank_line() {
        let index = index_with(&["Glucose is blood sugar.", "Iron builds hemoglobin."]);
        let context = retrieve_context(Some(&index), "glucose blood sugar", 2);
        assert_eq!(context, "Glucose is blood sugar.\n\nIron builds hemoglobin.");
    }

    #[test]
    fn top_k_limits_hits() {
        let index = index_with(&["a glucose", "b glucose", "c glucose"]);
        let context = retrieve_context(Some(&index), "glucose", 1);
        assert!(!context.contains("\n\n"));
    }

    #[test]
    fn embedding_failure_returns_error_placeholder() {
        let index = RetrievalIndex::new(
            Box::new(BrokenEmbedder),
            Box::new(SqliteVectorStore::open_in_memory().unwrap()),
        );
        assert_eq!(retrieve_context(Some(&index), "glucose", 3), RETRIEVAL_ERROR);
    }

    #[test]
    fn semantic_search_maps_embedding_error() {
        let store = SqliteVectorStore::open_in_memory().unwrap();
        let result = semantic_search("q", &BrokenEmbedder, &store, 3);
        assert!(matches!(result, Err(RagError::EmbeddingFailed(_))));
    }
}
