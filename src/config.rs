use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Lab Report Decoder";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum accepted request body (16 MB).
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "phi3:mini";
pub const DEFAULT_FALLBACK_MODEL: &str = "llama3.2:1b";
/// Ollama's packaging of all-MiniLM-L6-v2.
pub const DEFAULT_EMBED_MODEL: &str = "all-minilm";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "lab_decoder=info,tower_http=info"
}

/// Directory for optional local model files (ONNX embeddings).
/// ~/.lab-decoder/models on all platforms.
pub fn models_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".lab-decoder")
        .join("models")
}

/// Get the embedding model directory (all-MiniLM-L6-v2)
pub fn embedding_model_dir() -> PathBuf {
    models_dir().join("all-MiniLM-L6-v2")
}

/// Runtime configuration shared by the server and the index builder.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub ollama_url: String,
    pub model: String,
    pub fallback_model: String,
    pub embed_model: String,
    /// Root of the reference documents (`lab_markers/`, `nutrition/`, `conditions/`).
    pub data_dir: PathBuf,
    /// SQLite file holding the retrieval index.
    pub index_path: PathBuf,
    pub static_dir: PathBuf,
    pub session_ttl: Duration,
    pub llm_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            ollama_url: DEFAULT_OLLAMA_URL.into(),
            model: DEFAULT_MODEL.into(),
            fallback_model: DEFAULT_FALLBACK_MODEL.into(),
            embed_model: DEFAULT_EMBED_MODEL.into(),
            data_dir: PathBuf::from("data"),
            index_path: PathBuf::from("reference_index.db"),
            static_dir: PathBuf::from("static"),
            session_ttl: Duration::from_secs(60 * 60),
            llm_timeout: Duration::from_secs(300),
        }
    }
}

impl AppConfig {
    /// Socket address to bind. Falls back to all interfaces when `host` is not an IP.
    pub fn bind_addr(&self) -> SocketAddr {
        let ip = self
            .host
            .parse()
            .unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));
        SocketAddr::new(ip, self.port)
    }

    pub fn index_exists(&self) -> bool {
        self.index_path.is_file()
    }
}
