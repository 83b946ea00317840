//! # secretctl
//!
//! Command-line tool for GitOps-friendly Kubernetes secrets:
//!
//! - **edit** an encrypted secret in `$EDITOR` with values shown decoded
//! - **create**, **encrypt**, **decrypt**, **rotate** and **view** secret files
//! - **apply** and **install** resource bundles with read-then-create-or-patch
//!
//! Run `secretctl --help` for the full command list and exit codes.

use clap::Parser;
use secretctl::cli::{self, Cli};
use secretctl::config::ToolConfig;
use secretctl::observability;
use std::process::ExitCode;
use tracing::debug;

#[tokio::main]
async fn main() -> ExitCode {
    // Must run before any TLS client (kube, reqwest) is built
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let cli = Cli::parse();
    let config = ToolConfig::from_env();
    observability::init_logging(&config, cli.verbose);
    debug!(?config, "Loaded configuration");

    match cli::run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(e.exit_code())
        }
    }
}
