//! Shared state for the HTTP layer.

use std::sync::{Arc, Mutex};

use axum::http::header::{HeaderName, SET_COOKIE};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::LabResult;
use crate::pipeline::extraction::{LabReportExtractor, PdfExtractor, PdfTextExtractor};
use crate::pipeline::rag::LabReportRag;
use crate::session::{session_cookie, SessionStore};

use super::error::ApiError;

pub type DynExtractor = LabReportExtractor<Box<dyn PdfExtractor + Send + Sync>>;

/// A session that exists and holds results.
#[derive(Debug)]
pub struct ActiveSession {
    pub id: Uuid,
    pub results: Vec<LabResult>,
}

// ═══════════════════════════════════════════════════════════
// App context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all routes. Cheap to clone.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<Mutex<SessionStore>>,
    pub extractor: Arc<DynExtractor>,
    /// Created on first use; model clients are slow to set up.
    rag: Arc<Mutex<Option<Arc<LabReportRag>>>>,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Self {
        Self::with_extractor(config, Box::new(PdfTextExtractor))
    }

    pub fn with_extractor(config: AppConfig, pdf: Box<dyn PdfExtractor + Send + Sync>) -> Self {
        let sessions = SessionStore::new(config.session_ttl);
        Self {
            config: Arc::new(config),
            sessions: Arc::new(Mutex::new(sessions)),
            extractor: Arc::new(LabReportExtractor::new(pdf)),
            rag: Arc::new(Mutex::new(None)),
        }
    }

    /// Pre-install a RAG system instead of loading one on demand.
    pub fn with_rag(self, rag: LabReportRag) -> Self {
        if let Ok(mut slot) = self.rag.lock() {
            *slot = Some(Arc::new(rag));
        }
        self
    }

    /// The shared RAG system, loading it on first call.
    ///
    /// Blocks while loading; call from a blocking task.
    pub fn rag_blocking(&self) -> Result<Arc<LabReportRag>, ApiError> {
        let mut slot = self
            .rag
            .lock()
            .map_err(|_| ApiError::Internal("rag lock poisoned".into()))?;

        if let Some(rag) = slot.as_ref() {
            return Ok(rag.clone());
        }

        tracing::info!("Initializing RAG system");
        let rag = Arc::new(
            LabReportRag::load(&self.config).map_err(|e| ApiError::Internal(e.to_string()))?,
        );
        *slot = Some(rag.clone());
        Ok(rag)
    }

    /// Results stored for a session, if any.
    pub fn session_results(&self, id: Option<Uuid>) -> Result<Option<Vec<LabResult>>, ApiError> {
        let Some(id) = id else {
            return Ok(None);
        };
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| ApiError::Internal("session lock poisoned".into()))?;
        Ok(sessions.get(&id))
    }

    /// Like `session_results`, but an empty or missing session is `NoResults`.
    pub fn require_results(&self, id: Option<Uuid>) -> Result<Vec<LabResult>, ApiError> {
        match self.session_results(id)? {
            Some(results) if !results.is_empty() => Ok(results),
            _ => Err(ApiError::NoResults),
        }
    }

    /// Like `require_results`, keeping the session id for cookie refresh.
    pub fn require_session(&self, id: Option<Uuid>) -> Result<ActiveSession, ApiError> {
        let Some(id) = id else {
            return Err(ApiError::NoResults);
        };
        let results = self.require_results(Some(id))?;
        Ok(ActiveSession { id, results })
    }

    /// `Set-Cookie` header that (re)starts the browser's idle timer for `id`,
    /// matching the server-side TTL refresh on access.
    pub fn session_cookie_header(&self, id: &Uuid) -> [(HeaderName, String); 1] {
        [(SET_COOKIE, session_cookie(id, self.config.session_ttl))]
    }
}
