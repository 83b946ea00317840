//! # Observability
//!
//! Tracing subscriber setup for the `secretctl` binary.
//!
//! Logs always go to stderr so that documents printed to stdout (for example
//! `secretctl view` or `secretctl create` without `-o`) can be piped safely.

use crate::config::ToolConfig;
use tracing_subscriber::EnvFilter;

/// Build the env filter: `RUST_LOG` wins, then `--verbose`, then `LOG_LEVEL`
fn build_filter(config: &ToolConfig, verbose: u8) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = match verbose {
        0 => config.log_level.to_lowercase(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    EnvFilter::try_new(format!("secretctl={level}")).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Initialize the global tracing subscriber
///
/// Safe to call once per process; later calls are ignored.
pub fn init_logging(config: &ToolConfig, verbose: u8) {
    let filter = build_filter(config, verbose);

    let result = if config.log_json() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(config.log_enable_color)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("warning: tracing subscriber already initialized: {e}");
    }
}
