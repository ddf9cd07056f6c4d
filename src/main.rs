use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use lab_decoder::api::{run_server, AppContext};
use lab_decoder::config::{
    AppConfig, APP_NAME, APP_VERSION, DEFAULT_EMBED_MODEL, DEFAULT_FALLBACK_MODEL, DEFAULT_MODEL,
    DEFAULT_OLLAMA_URL, DEFAULT_PORT,
};
use lab_decoder::pipeline::storage::builder::{build_index, probe_index};
use lab_decoder::pipeline::storage::embedder::embedder_for;
use lab_decoder::pipeline::storage::vectordb::SqliteVectorStore;

/// Lab Report Decoder: upload a PDF lab report, get plain-language answers.
#[derive(Parser, Debug)]
#[command(name = "lab-decoder", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    config: ConfigArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run the web server (default). Builds the reference index first if missing.
    Serve,
    /// (Re)build the reference index from the data directory.
    BuildIndex,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Server bind address
    #[arg(long, env = "HOST", default_value = "0.0.0.0", global = true)]
    host: String,

    /// Server port
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT, global = true)]
    port: u16,

    /// Ollama base URL
    #[arg(long, env = "OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL, global = true)]
    ollama_url: String,

    /// Generation model
    #[arg(long, env = "LAB_DECODER_MODEL", default_value = DEFAULT_MODEL, global = true)]
    model: String,

    /// Used when the generation model is not installed
    #[arg(long, env = "LAB_DECODER_FALLBACK_MODEL", default_value = DEFAULT_FALLBACK_MODEL, global = true)]
    fallback_model: String,

    /// Embedding model served by Ollama
    #[arg(long, env = "LAB_DECODER_EMBED_MODEL", default_value = DEFAULT_EMBED_MODEL, global = true)]
    embed_model: String,

    /// Reference documents (lab_markers/, nutrition/, conditions/)
    #[arg(long, env = "LAB_DECODER_DATA_DIR", default_value = "data", global = true)]
    data_dir: PathBuf,

    /// Reference index file
    #[arg(long, env = "LAB_DECODER_INDEX_PATH", default_value = "reference_index.db", global = true)]
    index_path: PathBuf,

    /// Frontend assets
    #[arg(long, env = "LAB_DECODER_STATIC_DIR", default_value = "static", global = true)]
    static_dir: PathBuf,

    /// Idle session lifetime in seconds
    #[arg(long, env = "LAB_DECODER_SESSION_TTL_SECS", default_value_t = 3600, global = true)]
    session_ttl_secs: u64,

    /// Timeout for model requests in seconds
    #[arg(long, env = "LAB_DECODER_LLM_TIMEOUT_SECS", default_value_t = 300, global = true)]
    llm_timeout_secs: u64,
}

impl From<ConfigArgs> for AppConfig {
    fn from(args: ConfigArgs) -> Self {
        AppConfig {
            host: args.host,
            port: args.port,
            ollama_url: args.ollama_url,
            model: args.model,
            fallback_model: args.fallback_model,
            embed_model: args.embed_model,
            data_dir: args.data_dir,
            index_path: args.index_path,
            static_dir: args.static_dir,
            session_ttl: Duration::from_secs(args.session_ttl_secs),
            llm_timeout: Duration::from_secs(args.llm_timeout_secs),
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    lab_decoder::init_tracing(cli.verbose);

    let command = cli.command.unwrap_or(Command::Serve);
    let config = AppConfig::from(cli.config);

    tracing::info!("{APP_NAME} v{APP_VERSION}");

    match command {
        Command::BuildIndex => build_reference_index(&config),
        Command::Serve => {
            // Model clients block; build before the async runtime starts
            if index_needs_build(&config) {
                tracing::info!("Reference index missing, building it now");
                if let Err(e) = build_reference_index(&config) {
                    tracing::warn!("Index build failed, serving without reference data: {e:#}");
                }
            }

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("starting async runtime")?;
            runtime
                .block_on(run_server(AppContext::new(config)))
                .context("server error")
        }
    }
}

fn index_needs_build(config: &AppConfig) -> bool {
    if !config.index_exists() {
        return true;
    }
    SqliteVectorStore::open(&config.index_path)
        .and_then(|store| store.count())
        .map(|count| count == 0)
        .unwrap_or(true)
}

fn build_reference_index(config: &AppConfig) -> anyhow::Result<()> {
    let embedder = embedder_for(config).context("loading embedding model")?;
    let store = SqliteVectorStore::open(&config.index_path)
        .with_context(|| format!("opening {}", config.index_path.display()))?;

    match build_index(&config.data_dir, &store, embedder.as_ref()).context("building index")? {
        Some(report) => {
            tracing::info!(
                documents = report.documents,
                chunks = report.chunks,
                path = %config.index_path.display(),
                "Reference index ready"
            );
            probe_index(&store, embedder.as_ref()).context("probing index")?;
        }
        None => {
            tracing::warn!(
                dir = %config.data_dir.display(),
                "Nothing indexed; add .txt files under lab_markers/, nutrition/ or conditions/"
            );
        }
    }
    Ok(())
}
