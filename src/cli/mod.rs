//! # secretctl CLI
//!
//! Command-line interface for editing, encrypting and rotating Secret
//! manifests, and for installing resource bundles into a cluster.
//!
//! ## Usage
//!
//! ```bash
//! # Edit an encrypted secret in $EDITOR
//! secretctl edit deploy/db-secret.yaml --key "$SECRETCTL_KEY"
//!
//! # Create a new encrypted secret from literals and files
//! secretctl create db --from-literal user=admin --from-file tls.crt --key k1 -o db.yaml
//!
//! # Re-key a secret
//! secretctl rotate db.yaml --key old --new-key new
//!
//! # Install the release bundles into a namespace
//! secretctl install --namespace team-a
//! ```

mod convert;
mod create;
mod deploy;

use crate::codec::{CodecError, CryptoError, EncodingError};
use crate::config::ToolConfig;
use crate::constants::exit;
use crate::edit::{EditError, EditSession, ExternalEditor};
use crate::manifest::{FetchError, NormalizeError};
use crate::reconcile::{ClusterError, ReconcileError};
use crate::secret::{LoadError, WriteError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

pub use create::{SecretSource, SecretSources};

/// secretctl command line
#[derive(Debug, Parser)]
#[command(name = "secretctl", version)]
#[command(
    about = "Edit, encrypt and rotate Kubernetes Secret manifests, and install resource bundles",
    long_about = None,
    after_help = "\
Exit codes:
  0  success
  1  usage or unclassified error
  2  input could not be read or parsed
  3  wrong, empty or missing key, or malformed ciphertext
  4  edit aborted (empty buffer or editor failure)
  5  result could not be written
  6  invalid base64 value
  7  fetch or cluster API failure
"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Edit a secret file in $VISUAL/$EDITOR with values shown decoded
    Edit {
        /// Secret manifest (.yaml, .yml or .json)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Encryption key; without it values are only base64-encoded
        #[arg(short, long, env = "SECRETCTL_KEY", hide_env_values = true)]
        key: Option<String>,
    },
    /// Create a new secret manifest from literals, files and env files
    Create {
        /// Name of the secret
        #[arg(value_name = "NAME")]
        name: String,

        /// Namespace recorded in the manifest
        #[arg(short, long)]
        namespace: Option<String>,

        /// KEY=VALUE pair (repeatable)
        #[arg(long = "from-literal", value_name = "KEY=VALUE")]
        literals: Vec<String>,

        /// File whose content becomes a value; key defaults to the file name (repeatable)
        #[arg(long = "from-file", value_name = "[KEY=]PATH")]
        files: Vec<String>,

        /// Dotenv file whose entries become values (repeatable)
        #[arg(long = "from-env-file", value_name = "PATH")]
        env_files: Vec<PathBuf>,

        /// Encryption key; without it values are only base64-encoded
        #[arg(short, long, env = "SECRETCTL_KEY", hide_env_values = true)]
        key: Option<String>,

        /// Output file (format by suffix); prints YAML to stdout when omitted
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Encrypt a base64-encoded secret file in place
    Encrypt {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, env = "SECRETCTL_KEY", hide_env_values = true)]
        key: String,
    },
    /// Decrypt a secret file into a plain Kubernetes Secret
    Decrypt {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, env = "SECRETCTL_KEY", hide_env_values = true)]
        key: String,

        /// Output file; prints YAML to stdout when omitted
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Re-encrypt a secret file under a new key
    Rotate {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Current key
        #[arg(short, long, env = "SECRETCTL_KEY", hide_env_values = true)]
        key: String,

        /// New key
        #[arg(long, env = "SECRETCTL_NEW_KEY", hide_env_values = true)]
        new_key: String,
    },
    /// Print a secret with values decoded (and decrypted)
    View {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, env = "SECRETCTL_KEY", hide_env_values = true)]
        key: Option<String>,
    },
    /// Apply a local multi-document manifest file to the cluster
    Apply {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Override metadata.namespace on every resource
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Fetch the release bundles and apply them to the cluster
    Install {
        /// Install namespace-scoped and stamp this namespace on every resource
        #[arg(short, long)]
        namespace: Option<String>,

        /// Print the resources in apply order without contacting the cluster
        #[arg(long)]
        dry_run: bool,
    },
    /// Print version and build information
    Version,
}

/// Terminal CLI failure, one variant per exit code class
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to connect to the cluster: {0}")]
    Cluster(#[from] ClusterError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<CodecError> for CliError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Crypto(e) => CliError::Crypto(e),
            CodecError::Encoding(e) => CliError::Encoding(e),
        }
    }
}

impl CliError {
    /// Process exit code for this failure class
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Usage(_) | CliError::Other(_) => exit::FAILURE,
            CliError::Load(_) => exit::LOAD_FAILED,
            CliError::Crypto(_) => exit::CRYPTO_FAILED,
            CliError::Encoding(_) => exit::ENCODING_FAILED,
            CliError::Edit(e) => e.exit_code(),
            CliError::Write(_) => exit::WRITE_FAILED,
            CliError::Fetch(_) | CliError::Cluster(_) | CliError::Reconcile(_) => {
                exit::RECONCILE_FAILED
            }
        }
    }

    fn manifest(path: PathBuf, source: NormalizeError) -> Self {
        CliError::Other(anyhow::Error::new(source).context(format!(
            "{} is not a valid manifest stream",
            path.display()
        )))
    }
}

/// Run one parsed command
///
/// # Errors
///
/// Returns [`CliError`]; map it to a process exit code with
/// [`CliError::exit_code`].
pub async fn run(cli: Cli, config: &ToolConfig) -> Result<(), CliError> {
    let cipher = crate::codec::AeadCipher;

    match cli.command {
        Commands::Edit { file, key } => {
            let editor = ExternalEditor::new(config.editor.clone());
            let report = EditSession::new(file, &cipher, editor)
                .with_key(key)
                .run()?;
            if !report.changed {
                eprintln!("no changes made");
            }
            Ok(())
        }
        Commands::Create {
            name,
            namespace,
            literals,
            files,
            env_files,
            key,
            output,
        } => {
            let sources = SecretSources::from_args(&literals, &files, &env_files)?;
            create::create(
                &name,
                namespace,
                &sources,
                &cipher,
                key.as_deref(),
                output.as_deref(),
            )
        }
        Commands::Encrypt { file, key } => convert::encrypt(&file, &cipher, &key),
        Commands::Decrypt { file, key, output } => {
            convert::decrypt(&file, &cipher, &key, output.as_deref())
        }
        Commands::Rotate { file, key, new_key } => {
            convert::rotate(&file, &cipher, &key, &new_key)
        }
        Commands::View { file, key } => convert::view(&file, &cipher, key.as_deref()),
        Commands::Apply { file, namespace } => {
            deploy::apply_file(&file, namespace.as_deref(), config).await
        }
        Commands::Install { namespace, dry_run } => {
            deploy::install(namespace.as_deref(), dry_run, config).await
        }
        Commands::Version => {
            println!(
                "secretctl {} ({} built {})",
                env!("CARGO_PKG_VERSION"),
                env!("BUILD_GIT_HASH"),
                env!("BUILD_DATETIME")
            );
            Ok(())
        }
    }
}
