//! In-process stand-in for the Ollama HTTP API.
//!
//! The model clients are blocking, so the fake runs on its own thread with
//! a current-thread runtime; tests call it from plain `#[test]` functions.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

#[derive(Clone, Default)]
struct Shared {
    replies: Arc<HashMap<String, (StatusCode, Value)>>,
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

pub(crate) struct FakeOllama {
    addr: SocketAddr,
    shared: Shared,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl FakeOllama {
    /// Serve one canned reply per path (`/api/tags`, `/api/generate`,
    /// `/api/embed`). Paths without a reply answer 404.
    pub(crate) fn start(replies: &[(&str, StatusCode, Value)]) -> Self {
        let shared = Shared {
            replies: Arc::new(
                replies
                    .iter()
                    .map(|(path, status, body)| (path.to_string(), (*status, body.clone())))
                    .collect(),
            ),
            requests: Arc::default(),
        };

        let (addr_tx, addr_rx) = std::sync::mpsc::channel();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let state = shared.clone();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                addr_tx.send(listener.local_addr().unwrap()).unwrap();

                let app = Router::new()
                    .route("/api/tags", get(reply))
                    .route("/api/generate", post(reply))
                    .route("/api/embed", post(reply))
                    .with_state(state);
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .unwrap();
            });
        });

        Self {
            addr: addr_rx.recv().unwrap(),
            shared,
            shutdown: Some(shutdown_tx),
        }
    }

    pub(crate) fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// JSON bodies received on `path`, in arrival order (`null` for GETs).
    pub(crate) fn requests(&self, path: &str) -> Vec<Value> {
        self.shared
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

impl Drop for FakeOllama {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn reply(State(shared): State<Shared>, uri: Uri, body: Bytes) -> (StatusCode, Json<Value>) {
    let path = uri.path().to_string();
    let parsed = serde_json::from_slice(&body).unwrap_or(Value::Null);
    shared.requests.lock().unwrap().push((path.clone(), parsed));

    match shared.replies.get(&path) {
        Some((status, body)) => (*status, Json(body.clone())),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("no reply for {path}") })),
        ),
    }
}
