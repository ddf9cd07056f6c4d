//! Endpoints over the session's extracted results: explanations, summary,
//! follow-up questions, listing and clearing.
//!
//! Every successful read re-issues the session cookie, so the browser's
//! expiry tracks the server's idle TTL.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::AppContext;
use crate::models::{LabResult, ResultStats};
use crate::session::{expired_session_cookie, session_id_from_headers};

/// Longest accepted follow-up question, in characters.
pub const MAX_QUESTION_CHARS: usize = 2000;

#[derive(Serialize)]
pub struct ExplainResponse {
    pub success: bool,
    pub explanations: BTreeMap<String, String>,
}

#[derive(Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub success: bool,
    pub question: String,
    pub answer: String,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    pub summary: String,
    pub stats: ResultStats,
}

#[derive(Serialize)]
pub struct ResultsResponse {
    pub success: bool,
    pub results: Vec<LabResult>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct ClearResponse {
    pub success: bool,
}

/// `POST /api/explain`: one explanation per result.
pub async fn explain(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let session = ctx.require_session(session_id_from_headers(&headers))?;
    let cookie = ctx.session_cookie_header(&session.id);

    let explanations = tokio::task::spawn_blocking(move || {
        let rag = ctx.rag_blocking()?;
        Ok::<_, ApiError>(rag.explain_all_results(&session.results))
    })
    .await??;

    Ok((
        cookie,
        Json(ExplainResponse {
            success: true,
            explanations,
        }),
    ))
}

/// `POST /api/ask`: answer a free-text question about the results.
pub async fn ask(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let question = match body {
        Ok(Json(req)) => req.question.map(|q| q.trim().to_string()).unwrap_or_default(),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(ApiError::PayloadTooLarge);
        }
        Err(rejection) => {
            tracing::debug!(%rejection, "Unreadable question body");
            String::new()
        }
    };

    if question.is_empty() {
        return Err(ApiError::BadRequest("No question provided".into()));
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Question is too long. Maximum is {MAX_QUESTION_CHARS} characters."
        )));
    }

    let session = ctx.require_session(session_id_from_headers(&headers))?;
    let cookie = ctx.session_cookie_header(&session.id);

    let asked = question.clone();
    let answer = tokio::task::spawn_blocking(move || {
        let rag = ctx.rag_blocking()?;
        Ok::<_, ApiError>(rag.answer_followup_question(&asked, &session.results))
    })
    .await??;

    Ok((
        cookie,
        Json(AskResponse {
            success: true,
            question,
            answer,
        }),
    ))
}

/// `GET /api/summary`: overall summary plus per-status counts.
pub async fn summary(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let session = ctx.require_session(session_id_from_headers(&headers))?;
    let cookie = ctx.session_cookie_header(&session.id);
    let stats = ResultStats::from_results(&session.results);

    let summary = tokio::task::spawn_blocking(move || {
        let rag = ctx.rag_blocking()?;
        Ok::<_, ApiError>(rag.generate_summary(&session.results))
    })
    .await??;

    Ok((
        cookie,
        Json(SummaryResponse {
            success: true,
            summary,
            stats,
        }),
    ))
}

/// `GET /api/results`: the results stored for this session.
pub async fn results(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let session = ctx.require_session(session_id_from_headers(&headers))?;
    let count = session.results.len();
    Ok((
        ctx.session_cookie_header(&session.id),
        Json(ResultsResponse {
            success: true,
            results: session.results,
            count,
        }),
    ))
}

/// `POST /api/clear`: forget this session's results.
pub async fn clear(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(id) = session_id_from_headers(&headers) {
        let mut sessions = ctx
            .sessions
            .lock()
            .map_err(|_| ApiError::Internal("session lock poisoned".into()))?;
        if sessions.remove(&id) {
            tracing::info!("Session cleared");
        }
    }

    Ok((
        [(SET_COOKIE, expired_session_cookie())],
        Json(ClearResponse { success: true }),
    ))
}
