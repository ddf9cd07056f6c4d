//! HTTP layer: JSON endpoints under `/api/` plus the static frontend.
//!
//! The router is composable: `app_router()` returns a `Router` that can be
//! mounted on any axum server instance or driven directly in tests.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::app_router;
pub use server::{run_server, start_server_on, ServerHandle};
pub use types::AppContext;
