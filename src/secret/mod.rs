//! # Secret Documents
//!
//! The `Secret` manifest that every pipeline stage operates on, plus loading
//! and storing it in the two on-disk formats.
//!
//! ## Value states
//!
//! Each value in [`Secret::data`] is, at any point in time, either base64 text or
//! raw text, and either plaintext or ciphertext. Only two combinations ever
//! leave the process:
//!
//! - **stored**: base64 + ciphertext (or base64 + plaintext when no key is used)
//! - **editable**: raw + plaintext, shown to the user in an editor buffer
//!
//! The transforms between them live in [`crate::codec`].

mod format;

pub use format::{DocumentError, SecretFormat};

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// Keys must be valid Kubernetes secret data keys
static DATA_KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-._a-zA-Z0-9]+$").unwrap_or_else(|e| panic!("invalid data key regex: {e}"))
});

/// A Kubernetes `Secret` manifest with string-valued `data`
///
/// Only `data` is transformed. Everything else (`stringData`, `immutable`,
/// ...) rides along in `extra` and is written back as it was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    pub kind: String,
    #[serde(rename = "type", default = "default_secret_type")]
    pub secret_type: String,
    pub metadata: SecretMetadata,
    #[serde(default, deserialize_with = "nullable_map")]
    pub data: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Secret metadata; labels, annotations etc. ride along in `extra`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_secret_type() -> String {
    "Opaque".to_string()
}

/// `data:` with nothing under it parses as null; treat that as an empty map
///
/// Unquoted scalars typed into an edit buffer (`port: 5432`, `debug: true`) are
/// taken as their text.
fn nullable_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<BTreeMap<String, Value>>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(text) => Ok((key, text)),
            Value::Number(n) => Ok((key, n.to_string())),
            Value::Bool(b) => Ok((key, b.to_string())),
            Value::Null => Ok((key, String::new())),
            Value::Array(_) | Value::Object(_) => Err(serde::de::Error::custom(format!(
                "data value of {key:?} must be a string"
            ))),
        })
        .collect()
}

impl Secret {
    /// Create an empty `Opaque` secret
    pub fn new(name: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            api_version: default_api_version(),
            kind: "Secret".to_string(),
            secret_type: default_secret_type(),
            metadata: SecretMetadata {
                name: name.into(),
                namespace,
                extra: Map::new(),
            },
            data: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    /// Builder-style helper used by `create` and tests
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Check the invariants serde cannot express
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Invalid`] when the kind is not `Secret`, the name is
    /// empty, or a data key contains characters Kubernetes would reject.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.kind != "Secret" {
            return Err(DocumentError::Invalid(format!(
                "expected kind Secret, found {:?}",
                self.kind
            )));
        }
        if self.metadata.name.trim().is_empty() {
            return Err(DocumentError::Invalid(
                "metadata.name must not be empty".to_string(),
            ));
        }
        if let Some(key) = self.data.keys().find(|k| !DATA_KEY_PATTERN.is_match(k)) {
            return Err(DocumentError::Invalid(format!(
                "data key {key:?} must consist of alphanumeric characters, '-', '_' or '.'"
            )));
        }
        Ok(())
    }
}

/// Failure to read or parse the input secret
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a valid secret: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },
    #[error("failed to parse env file {}: {source}", .path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Failure to write the secret back to disk
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to render secret as {format}: {source}")]
    Render {
        format: SecretFormat,
        #[source]
        source: DocumentError,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read and parse one Secret document, returning it with the format its path implies
///
/// # Errors
///
/// Returns [`LoadError`] if the file cannot be read or does not hold a valid Secret.
pub fn load(path: &Path) -> Result<(Secret, SecretFormat), LoadError> {
    let format = SecretFormat::from_path(path);
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let secret = format.parse(&text).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        path = %path.display(),
        %format,
        keys = secret.data.len(),
        "Loaded secret {}",
        secret.metadata.name
    );
    Ok((secret, format))
}

/// Serialize `secret` in `format` and atomically replace `path`
///
/// The document is written to a temporary file next to `path` and renamed over
/// it, so a failed write leaves the original content in place. An existing
/// file's permissions are carried over to the new one.
///
/// # Errors
///
/// Returns [`WriteError`] if rendering or the write fails.
pub fn store(path: &Path, secret: &Secret, format: SecretFormat) -> Result<(), WriteError> {
    let text = format
        .render(secret)
        .map_err(|source| WriteError::Render { format, source })?;
    let io_error = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::Builder::new()
        .prefix(".secretctl-")
        .tempfile_in(dir)
        .map_err(io_error)?;
    file.write_all(text.as_bytes()).map_err(io_error)?;
    file.as_file().sync_all().map_err(io_error)?;
    if let Ok(metadata) = std::fs::metadata(path) {
        file.as_file()
            .set_permissions(metadata.permissions())
            .map_err(io_error)?;
    }
    file.persist(path).map_err(|e| io_error(e.error))?;

    debug!(path = %path.display(), %format, "Wrote secret {}", secret.metadata.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_secret_defaults() {
        let secret = Secret::new("db", Some("prod".to_string()));
        assert_eq!(secret.api_version, "v1");
        assert_eq!(secret.kind, "Secret");
        assert_eq!(secret.secret_type, "Opaque");
        assert_eq!(secret.metadata.namespace.as_deref(), Some("prod"));
        assert!(secret.data.is_empty());
        assert!(secret.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_kind() {
        let mut secret = Secret::new("db", None);
        secret.kind = "ConfigMap".to_string();
        let err = secret.validate().unwrap_err();
        assert!(err.to_string().contains("expected kind Secret"));
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let secret = Secret::new("  ", None);
        assert!(secret.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_data_key() {
        let secret = Secret::new("db", None).with_entry("bad key", "x");
        let err = secret.validate().unwrap_err();
        assert!(err.to_string().contains("\"bad key\""));
    }

    #[test]
    fn test_validate_accepts_dotted_keys() {
        let secret = Secret::new("db", None)
            .with_entry("config.json", "{}")
            .with_entry("API_TOKEN-2", "x");
        assert!(secret.validate().is_ok());
    }

    #[test]
    fn test_load_and_store_preserve_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.json");
        let secret = Secret::new("db", None).with_entry("user", "dGVzdA==");

        store(&path, &secret, SecretFormat::Json).unwrap();
        let (loaded, format) = load(&path).unwrap();

        assert_eq!(format, SecretFormat::Json);
        assert_eq!(loaded, secret);
    }

    #[test]
    fn test_unowned_fields_survive_load_and_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.yaml");
        std::fs::write(
            &path,
            "apiVersion: v1\nkind: Secret\nmetadata:\n  name: db\n  labels:\n    app: web\n  annotations:\n    owner: team-a\nimmutable: true\nstringData:\n  extra: keepme\ndata:\n  user: dGVzdA==\n",
        )
        .unwrap();

        let (secret, format) = load(&path).unwrap();
        assert_eq!(secret.metadata.extra["labels"]["app"], "web");
        assert_eq!(secret.extra["stringData"]["extra"], "keepme");

        store(&path, &secret, format).unwrap();
        let (reloaded, _) = load(&path).unwrap();
        assert_eq!(reloaded, secret);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("owner: team-a"));
        assert!(text.contains("immutable: true"));
    }

    #[test]
    fn test_unquoted_scalar_values_are_read_as_text() {
        let secret = SecretFormat::Yaml
            .parse("kind: Secret\nmetadata:\n  name: db\ndata:\n  port: 5432\n  debug: true\n")
            .unwrap();
        assert_eq!(secret.data["port"], "5432");
        assert_eq!(secret.data["debug"], "true");
    }

    #[test]
    fn test_failed_store_keeps_original_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory cannot be replaced by a rename
        let path = dir.path().join("secret.yaml");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let err = store(&path, &Secret::new("db", None), SecretFormat::Yaml).unwrap_err();

        assert!(matches!(err, WriteError::Io { .. }));
        assert_eq!(std::fs::read_to_string(path.join("keep")).unwrap(), "x");
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, ["secret.yaml"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_store_keeps_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.yaml");
        let secret = Secret::new("db", None).with_entry("user", "dGVzdA==");
        store(&path, &secret, SecretFormat::Yaml).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();

        store(&path, &secret.with_entry("password", "cHc="), SecretFormat::Yaml).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }
}
