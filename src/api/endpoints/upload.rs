//! `POST /api/upload`: PDF upload, extraction and session storage.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::AppContext;
use crate::models::LabResult;
use crate::pipeline::extraction::is_pdf;
use crate::session::session_id_from_headers;

#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub results: Vec<LabResult>,
    pub count: usize,
}

pub async fn upload(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // Not a multipart request at all: no file field to find
    let mut multipart = multipart.map_err(|_| ApiError::NoFile)?;

    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        // A part without a filename is a plain form value, not an upload
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(multipart_error)?;
        file = Some((filename, bytes.to_vec()));
    }

    let (filename, bytes) = file.ok_or(ApiError::NoFile)?;
    if filename.trim().is_empty() {
        return Err(ApiError::NoFileSelected);
    }
    if !has_pdf_extension(&filename) || !is_pdf(&bytes) {
        return Err(ApiError::NotPdf);
    }

    tracing::info!(file = %sanitize_filename(&filename), bytes = bytes.len(), "Report uploaded");

    let extractor = ctx.extractor.clone();
    let results = tokio::task::spawn_blocking(move || extractor.extract(&bytes)).await??;

    if results.is_empty() {
        return Err(ApiError::NoLabResults);
    }

    let session_id = session_id_from_headers(&headers).unwrap_or_else(Uuid::new_v4);
    {
        let mut sessions = ctx
            .sessions
            .lock()
            .map_err(|_| ApiError::Internal("session lock poisoned".into()))?;
        sessions.insert(session_id, results.clone());
    }

    let count = results.len();
    Ok((
        ctx.session_cookie_header(&session_id),
        Json(UploadResponse {
            success: true,
            results,
            count,
        }),
    ))
}

/// Body-limit overruns surface while reading fields.
fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

fn has_pdf_extension(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}

/// Filename safe to log: no path separators, control or special characters.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|&c| c != '/' && c != '\\' && c != '\0')
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let sanitized = sanitized.replace("..", "");
    let sanitized: String = sanitized.chars().take(100).collect();

    if sanitized.is_empty() {
        "report.pdf".into()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert!(has_pdf_extension("report.PDF"));
        assert!(has_pdf_extension("labs.pdf"));
        assert!(!has_pdf_extension("labs.pdf.exe"));
        assert!(!has_pdf_extension("labs"));
    }

    #[test]
    fn sanitize_path_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
    }

    #[test]
    fn sanitize_special_chars() {
        assert_eq!(sanitize_filename("my report (1).pdf"), "my_report__1_.pdf");
    }

    #[test]
    fn sanitize_long_name_is_truncated() {
        let long = format!("{}.pdf", "a".repeat(200));
        assert_eq!(sanitize_filename(&long).chars().count(), 100);
    }

    #[test]
    fn sanitize_empty_name() {
        assert_eq!(sanitize_filename("/"), "report.pdf");
    }
}
