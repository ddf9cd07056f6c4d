//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::extraction::ExtractionError;

/// Error response body: `{"error": "...", "code": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No file provided")]
    NoFile,
    #[error("No file selected")]
    NoFileSelected,
    #[error("Only PDF files are allowed")]
    NotPdf,
    #[error("Could not read the PDF file")]
    UnreadablePdf,
    #[error("No lab results found in PDF")]
    NoLabResults,
    #[error("No results found. Please upload a PDF first.")]
    NoResults,
    #[error("File too large. Maximum size is 16MB.")]
    PayloadTooLarge,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NoFile | ApiError::NoFileSelected => (StatusCode::BAD_REQUEST, "NO_FILE"),
            ApiError::NotPdf => (StatusCode::BAD_REQUEST, "INVALID_FILE_TYPE"),
            ApiError::UnreadablePdf => (StatusCode::BAD_REQUEST, "PDF_UNREADABLE"),
            ApiError::NoLabResults => (StatusCode::BAD_REQUEST, "NO_LAB_RESULTS"),
            ApiError::NoResults => (StatusCode::BAD_REQUEST, "NO_RESULTS"),
            ApiError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                "Internal server error".to_string()
            }
            ApiError::BadRequest(detail) => detail.clone(),
            other => other.to_string(),
        };

        (status, Json(ErrorBody { error: message, code })).into_response()
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::NotPdf => ApiError::NotPdf,
            ExtractionError::PdfParsing(detail) => {
                tracing::warn!(detail, "PDF parsing failed");
                ApiError::UnreadablePdf
            }
            ExtractionError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn no_results_returns_400_with_message() {
        let response = ApiError::NoResults.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "No results found. Please upload a PDF first.");
        assert_eq!(json["code"], "NO_RESULTS");
    }

    #[tokio::test]
    async fn payload_too_large_returns_413() {
        let response = ApiError::PayloadTooLarge.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = body_json(response).await;
        assert_eq!(json["error"], "File too large. Maximum size is 16MB.");
    }

    #[tokio::test]
    async fn bad_request_passes_detail_through() {
        let response = ApiError::BadRequest("No question provided".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "No question provided");
        assert_eq!(json["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn internal_hides_detail() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn upload_errors_share_no_file_code() {
        for err in [ApiError::NoFile, ApiError::NoFileSelected] {
            let json = body_json(err.into_response()).await;
            assert_eq!(json["code"], "NO_FILE");
        }
    }

    #[test]
    fn extraction_errors_map_to_client_errors() {
        assert!(matches!(ApiError::from(ExtractionError::NotPdf), ApiError::NotPdf));
        assert!(matches!(
            ApiError::from(ExtractionError::PdfParsing("xref".into())),
            ApiError::UnreadablePdf
        ));
    }
}
