//! Application router.
//!
//! Layers (outermost → innermost):
//! 1. Request tracing → 2. `Cache-Control: no-store` on `/api` → 3. Body limit → Handler

use axum::extract::DefaultBodyLimit;
use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints::{health, report, upload};
use crate::api::types::AppContext;
use crate::config::MAX_UPLOAD_BYTES;

/// Build the full application router.
///
/// `GET /` serves `index.html` and `/static/*` the rest of the frontend,
/// both from `config.static_dir`.
pub fn app_router(ctx: AppContext) -> Router {
    let static_dir = ctx.config.static_dir.clone();

    let api = Router::new()
        .route("/upload", post(upload::upload))
        .route("/explain", post(report::explain))
        .route("/ask", post(report::ask))
        .route("/summary", get(report::summary))
        .route("/results", get(report::results))
        .route("/clear", post(report::clear))
        .route("/health", get(health::check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    // NOTE: nest_service paths use `/static` (matchit 0.7 / axum 0.7).
    Router::new()
        .nest("/api", api)
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
