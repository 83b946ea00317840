//! On-disk formats for Secret documents.
//!
//! The format is chosen purely from the file name: `.json` files are JSON,
//! everything else (`.yaml`, `.yml`, no suffix) is YAML.

use super::Secret;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Serialization format of a Secret file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretFormat {
    /// Indentation-based block format
    Yaml,
    /// Nested structured-data format
    Json,
}

/// Why a document could not be turned into (or out of) a [`Secret`]
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(String),
}

impl SecretFormat {
    /// Pick the format from the file name suffix
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SecretFormat::Json,
            _ => SecretFormat::Yaml,
        }
    }

    /// Parse and validate one Secret document
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] on a syntax error, a schema mismatch, or a failed
    /// [`Secret::validate`] check.
    pub fn parse(self, text: &str) -> Result<Secret, DocumentError> {
        let secret: Secret = match self {
            SecretFormat::Yaml => serde_yaml::from_str(text)?,
            SecretFormat::Json => serde_json::from_str(text)?,
        };
        secret.validate()?;
        Ok(secret)
    }

    /// Render a Secret in this format, newline-terminated
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] if serialization fails.
    pub fn render(self, secret: &Secret) -> Result<String, DocumentError> {
        match self {
            SecretFormat::Yaml => Ok(serde_yaml::to_string(secret)?),
            SecretFormat::Json => {
                let mut text = serde_json::to_string_pretty(secret)?;
                text.push('\n');
                Ok(text)
            }
        }
    }
}

impl fmt::Display for SecretFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretFormat::Yaml => write!(f, "yaml"),
            SecretFormat::Json => write!(f, "json"),
        }
    }
}
