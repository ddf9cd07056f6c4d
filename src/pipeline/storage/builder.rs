use std::path::Path;

use super::chunker::ReferenceChunker;
use super::loader::load_documents;
use super::types::{ChunkRecord, Chunker, EmbeddingModel, VectorSearch};
use super::vectordb::{SqliteVectorStore, META_BUILT_AT, META_DIMENSION, META_MODEL};
use super::StorageError;
use crate::models::ReferenceCategory;

/// Texts per embedding request.
const EMBED_BATCH: usize = 32;

/// Queries run against a freshly built index as a smoke test.
pub const PROBE_QUERIES: [&str; 3] = [
    "What does low hemoglobin mean?",
    "What foods are high in iron?",
    "Normal range for glucose",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    pub documents: usize,
    pub chunks: usize,
}

/// Build the reference index from `data_dir/{lab_markers,nutrition,conditions}`.
///
/// Returns `Ok(None)` when there is nothing to index. A missing `data_dir` is
/// created with its category subdirectories so the user knows where to put
/// documents. The existing index is only replaced once every chunk has been
/// embedded.
pub fn build_index(
    data_dir: &Path,
    store: &SqliteVectorStore,
    embedder: &dyn EmbeddingModel,
) -> Result<Option<BuildReport>, StorageError> {
    if !data_dir.is_dir() {
        for category in ReferenceCategory::ALL {
            std::fs::create_dir_all(data_dir.join(category.as_str()))?;
        }
        tracing::warn!(
            dir = %data_dir.display(),
            "Created reference data directory; add .txt documents and rebuild the index"
        );
        return Ok(None);
    }

    let mut documents = Vec::new();
    for category in ReferenceCategory::ALL {
        let docs = load_documents(&data_dir.join(category.as_str()), category)?;
        tracing::info!(category = %category, count = docs.len(), "Loaded reference documents");
        documents.extend(docs);
    }

    if documents.is_empty() {
        tracing::warn!(dir = %data_dir.display(), "No reference documents found");
        return Ok(None);
    }

    let chunker = ReferenceChunker::new();
    let records: Vec<ChunkRecord> = documents
        .iter()
        .flat_map(|doc| {
            chunker.chunk(&doc.content).into_iter().map(|chunk| ChunkRecord {
                content: chunk.content,
                source: doc.source.clone(),
                filename: doc.filename.clone(),
                category: doc.category,
                chunk_index: chunk.chunk_index,
            })
        })
        .collect();

    if records.is_empty() {
        return Err(StorageError::EmptyChunks);
    }
    tracing::info!(documents = documents.len(), chunks = records.len(), "Chunked reference corpus");

    let mut embeddings = Vec::with_capacity(records.len());
    for (i, batch) in records.chunks(EMBED_BATCH).enumerate() {
        let texts: Vec<&str> = batch.iter().map(|r| r.content.as_str()).collect();
        embeddings.extend(embedder.embed_batch(&texts)?);
        tracing::debug!(
            done = ((i + 1) * EMBED_BATCH).min(records.len()),
            total = records.len(),
            "Embedding progress"
        );
    }

    store.reset()?;
    let stored = store.store_chunks(&records, &embeddings)?;
    store.set_meta(META_MODEL, embedder.model_name())?;
    store.set_meta(META_DIMENSION, &embedder.dimension().to_string())?;
    store.set_meta(META_BUILT_AT, &chrono::Utc::now().to_rfc3339())?;

    tracing::info!(chunks = stored, model = embedder.model_name(), "Reference index built");

    Ok(Some(BuildReport {
        documents: documents.len(),
        chunks: stored,
    }))
}

/// Run [`PROBE_QUERIES`] against the index, logging hit counts and previews.
/// Returns the number of hits per query.
pub fn probe_index(
    store: &dyn VectorSearch,
    embedder: &dyn EmbeddingModel,
) -> Result<Vec<usize>, StorageError> {
    let mut counts = Vec::with_capacity(PROBE_QUERIES.len());
    for query in PROBE_QUERIES {
        let hits = store.search(&embedder.embed(query)?, 2)?;
        let preview: String = hits
            .first()
            .map(|h| h.content.chars().take(150).collect())
            .unwrap_or_default();
        tracing::info!(query, hits = hits.len(), preview = %preview, "Probe query");
        counts.push(hits.len());
    }
    Ok(counts)
}
