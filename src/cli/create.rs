//! `secretctl create`: build a new Secret manifest from literals, files and
//! dotenv files.
//!
//! Values are read as raw bytes and base64-encoded directly, so binary files
//! (certificates, keystores) are stored verbatim.

use super::CliError;
use crate::codec::{crypto_transform, CryptoDirection, SecretCipher};
use crate::secret::{self, LoadError, Secret, SecretFormat, WriteError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// One `--from-*` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    Literal { key: String, value: String },
    File { key: String, path: PathBuf },
    EnvFile { path: PathBuf },
}

/// All sources for one secret, in command-line order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretSources(pub Vec<SecretSource>);

impl SecretSources {
    /// Parse `--from-literal`, `--from-file` and `--from-env-file` values
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Usage`] for a literal without `=`, or an empty key or path.
    pub fn from_args(
        literals: &[String],
        files: &[String],
        env_files: &[PathBuf],
    ) -> Result<Self, CliError> {
        let mut sources = Vec::with_capacity(literals.len() + files.len() + env_files.len());

        for literal in literals {
            let (key, value) = literal.split_once('=').ok_or_else(|| {
                CliError::Usage(format!("--from-literal {literal:?} must be KEY=VALUE"))
            })?;
            if key.is_empty() {
                return Err(CliError::Usage(format!(
                    "--from-literal {literal:?} has an empty key"
                )));
            }
            sources.push(SecretSource::Literal {
                key: key.to_string(),
                value: value.to_string(),
            });
        }

        for file in files {
            let (key, path) = match file.split_once('=') {
                Some((key, path)) => (key.to_string(), PathBuf::from(path)),
                None => {
                    let path = PathBuf::from(file);
                    let key = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    (key, path)
                }
            };
            if key.is_empty() || path.as_os_str().is_empty() {
                return Err(CliError::Usage(format!(
                    "--from-file {file:?} must be [KEY=]PATH"
                )));
            }
            sources.push(SecretSource::File { key, path });
        }

        sources.extend(
            env_files
                .iter()
                .map(|path| SecretSource::EnvFile { path: path.clone() }),
        );

        Ok(Self(sources))
    }

    /// Read every source into raw key/value bytes
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Load`] when a file cannot be read, and
    /// [`CliError::Usage`] when two sources produce the same key.
    pub fn resolve(&self) -> Result<BTreeMap<String, Vec<u8>>, CliError> {
        let mut entries = BTreeMap::new();
        let mut insert = |key: String, value: Vec<u8>| {
            if entries.contains_key(&key) {
                return Err(CliError::Usage(format!("duplicate data key {key:?}")));
            }
            entries.insert(key, value);
            Ok(())
        };

        for source in &self.0 {
            match source {
                SecretSource::Literal { key, value } => {
                    insert(key.clone(), value.clone().into_bytes())?;
                }
                SecretSource::File { key, path } => {
                    let content = std::fs::read(path).map_err(|source| LoadError::Read {
                        path: path.clone(),
                        source,
                    })?;
                    insert(key.clone(), content)?;
                }
                SecretSource::EnvFile { path } => {
                    let env_error = |source| LoadError::EnvFile {
                        path: path.clone(),
                        source,
                    };
                    for item in dotenvy::from_path_iter(path).map_err(env_error)? {
                        let (key, value) = item.map_err(env_error)?;
                        insert(key, value.into_bytes())?;
                    }
                }
            }
        }

        Ok(entries)
    }
}

/// Build the secret and write it to `output` (format by suffix) or stdout (YAML)
pub(super) fn create(
    name: &str,
    namespace: Option<String>,
    sources: &SecretSources,
    cipher: &dyn SecretCipher,
    key: Option<&str>,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let mut secret = build_secret(name, namespace, sources)?;
    if let Some(key) = key {
        crypto_transform(&mut secret, cipher, key, CryptoDirection::Encrypt)?;
    }

    match output {
        Some(path) => {
            secret::store(path, &secret, SecretFormat::from_path(path))?;
            info!(
                path = %path.display(),
                keys = secret.data.len(),
                encrypted = key.is_some(),
                "Created secret {name}"
            );
        }
        None => {
            let format = SecretFormat::Yaml;
            let text = format
                .render(&secret)
                .map_err(|source| WriteError::Render { format, source })?;
            print!("{text}");
        }
    }
    Ok(())
}

/// Base64-encoded (not yet encrypted) secret for `sources`
fn build_secret(
    name: &str,
    namespace: Option<String>,
    sources: &SecretSources,
) -> Result<Secret, CliError> {
    let mut secret = Secret::new(name, namespace);
    secret.data = sources
        .resolve()?
        .into_iter()
        .map(|(key, value)| (key, STANDARD.encode(value)))
        .collect();
    secret
        .validate()
        .map_err(|e| CliError::Usage(e.to_string()))?;
    Ok(secret)
}
