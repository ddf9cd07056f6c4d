//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::AppContext;
use crate::pipeline::storage::vectordb::SqliteVectorStore;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub index_ready: bool,
    pub indexed_chunks: usize,
    pub version: &'static str,
}

/// `GET /api/health`: liveness plus reference index status.
///
/// Reads the index file directly so it never triggers model loading.
pub async fn check(State(ctx): State<AppContext>) -> Result<Json<HealthResponse>, ApiError> {
    let config = ctx.config.clone();
    let indexed_chunks = tokio::task::spawn_blocking(move || {
        if !config.index_exists() {
            return 0;
        }
        match SqliteVectorStore::open(&config.index_path).and_then(|store| store.count()) {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read reference index");
                0
            }
        }
    })
    .await?;

    Ok(Json(HealthResponse {
        status: "ok",
        index_ready: indexed_chunks > 0,
        indexed_chunks,
        version: crate::config::APP_VERSION,
    }))
}
