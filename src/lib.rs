pub mod api;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug output for
/// this crate and the default filter applies.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "lab_decoder=debug,tower_http=debug".to_string()
    } else {
        config::default_log_filter().to_string()
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .try_init();
}
