//! Persistent reference index: chunk text, provenance and embeddings in SQLite.
//!
//! Embeddings are stored as little-endian `f32` blobs. Search is a linear
//! cosine scan, which is plenty for a few thousand reference chunks.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::types::{ChunkRecord, ScoredChunk, VectorSearch};
use super::StorageError;

/// Rows per insert transaction.
const INSERT_BATCH: usize = 100;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS reference_chunks (
        id          TEXT PRIMARY KEY,
        source      TEXT NOT NULL,
        filename    TEXT NOT NULL,
        category    TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        content     TEXT NOT NULL,
        embedding   BLOB NOT NULL
    );
    CREATE TABLE IF NOT EXISTS index_meta (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

pub const META_MODEL: &str = "embedding_model";
pub const META_DIMENSION: &str = "dimension";
pub const META_BUILT_AT: &str = "built_at";

/// SQLite-backed vector store for the reference corpus.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) the index file.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory index (for testing).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch("PRAGMA journal_mode=DELETE;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::VectorDb("Connection lock poisoned".into()))
    }

    /// Drop every chunk and metadata entry.
    pub fn reset(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM reference_chunks; DELETE FROM index_meta;")?;
        Ok(())
    }

    /// Insert chunks with their embeddings. Ids continue from the current count
    /// as `doc_{n}`. Returns the number of rows written.
    pub fn store_chunks(
        &self,
        records: &[ChunkRecord],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, StorageError> {
        if records.len() != embeddings.len() {
            return Err(StorageError::VectorDb(
                "Chunk count does not match embedding count".into(),
            ));
        }

        let mut conn = self.lock()?;
        let mut next_id: i64 =
            conn.query_row("SELECT COUNT(*) FROM reference_chunks", [], |row| row.get(0))?;

        let pairs: Vec<(&ChunkRecord, &Vec<f32>)> = records.iter().zip(embeddings).collect();
        for batch in pairs.chunks(INSERT_BATCH) {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO reference_chunks
                     (id, source, filename, category, chunk_index, content, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                for (record, embedding) in batch {
                    stmt.execute(params![
                        format!("doc_{next_id}"),
                        record.source,
                        record.filename,
                        record.category.as_str(),
                        record.chunk_index as i64,
                        record.content,
                        encode_embedding(embedding),
                    ])?;
                    next_id += 1;
                }
            }
            tx.commit()?;
            tracing::debug!(rows = batch.len(), "Stored chunk batch");
        }

        Ok(records.len())
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM reference_chunks", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO index_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn meta(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

impl VectorSearch for SqliteVectorStore {
    fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>, StorageError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, content, filename, embedding FROM reference_chunks")?;
        let rows = stmt.query_map([], |row| {
            let blob: Vec<u8> = row.get(3)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                blob,
            ))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (chunk_id, content, filename, blob) = row?;
            let embedding = decode_embedding(&blob)?;
            scored.push(ScoredChunk {
                chunk_id,
                content,
                filename,
                score: cosine_similarity(query_embedding, &embedding),
            });
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(blob: &[u8]) -> Result<Vec<f32>, StorageError> {
    if blob.len() % 4 != 0 {
        return Err(StorageError::VectorDb(format!(
            "Corrupt embedding blob ({} bytes)",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
