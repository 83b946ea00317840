//! # Edit Session
//!
//! Drives one interactive edit of a stored secret file:
//!
//! ```text
//! Load -> Decrypt? -> Decode -> Edit <-> Revalidate -> Encode -> Encrypt? -> Write
//! ```
//!
//! Every terminal failure maps to a distinct exit code (see
//! [`EditError::exit_code`]). A buffer that does not parse is never terminal:
//! it is shown again with the parse error appended as comments, for as many
//! rounds as it takes. The only way out without saving is an empty buffer.
//!
//! Nothing touches the input file until the final write.

use super::buffer::{render_buffer, revalidate, Revalidation};
use super::editor::{Editor, EditorError};
use crate::codec::{
    crypto_transform, encode_transform, CryptoDirection, CryptoError, EncodeDirection,
    EncodingError, SecretCipher,
};
use crate::constants::exit;
use crate::secret::{self, DocumentError, LoadError, SecretFormat, WriteError};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, info_span, warn};
use zeroize::Zeroizing;

/// Terminal failure of an edit session
#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("edit aborted: the buffer was empty")]
    Aborted,
    #[error("edit aborted: {0}")]
    Editor(#[from] EditorError),
    #[error("failed to render secret for editing: {0}")]
    Render(#[source] DocumentError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

impl EditError {
    /// Process exit code for this failure class
    pub fn exit_code(&self) -> u8 {
        match self {
            EditError::Load(_) => exit::LOAD_FAILED,
            EditError::Crypto(_) => exit::CRYPTO_FAILED,
            EditError::Aborted | EditError::Editor(_) => exit::EDIT_ABORTED,
            EditError::Write(_) => exit::WRITE_FAILED,
            EditError::Encoding(_) => exit::ENCODING_FAILED,
            EditError::Render(_) => exit::FAILURE,
        }
    }
}

/// What a successful session did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditReport {
    /// Number of times the editor was opened
    pub attempts: usize,
    /// Whether the saved secret differs from what was loaded
    pub changed: bool,
    /// Number of data entries written
    pub keys: usize,
}

/// One edit of one secret file
pub struct EditSession<'a, E> {
    path: PathBuf,
    key: Option<Zeroizing<String>>,
    cipher: &'a dyn SecretCipher,
    editor: E,
}

impl<E> fmt::Debug for EditSession<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditSession")
            .field("path", &self.path)
            .field("encrypted", &self.key.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a, E: Editor> EditSession<'a, E> {
    pub fn new(path: impl Into<PathBuf>, cipher: &'a dyn SecretCipher, editor: E) -> Self {
        Self {
            path: path.into(),
            key: None,
            cipher,
            editor,
        }
    }

    /// Decrypt on load and encrypt on save with `key`
    #[must_use]
    pub fn with_key(mut self, key: Option<String>) -> Self {
        self.key = key.map(Zeroizing::new);
        self
    }

    /// Run the session to a terminal state and return its exit code
    pub fn status(&mut self) -> u8 {
        match self.run() {
            Ok(_) => exit::OK,
            Err(e) => e.exit_code(),
        }
    }

    /// Run the session to a terminal state
    ///
    /// # Errors
    ///
    /// Returns [`EditError`] for every terminal failure; parse errors in the
    /// edited buffer are handled internally by re-opening the editor.
    pub fn run(&mut self) -> Result<EditReport, EditError> {
        let span = info_span!(
            "edit_session",
            path = %self.path.display(),
            encrypted = self.key.is_some()
        );
        let _guard = span.enter();

        // Load
        let (mut secret, format) = secret::load(&self.path)?;

        // Decrypt, then decode
        if let Some(key) = &self.key {
            crypto_transform(&mut secret, self.cipher, key, CryptoDirection::Decrypt)?;
        }
        encode_transform(&mut secret, EncodeDirection::Decode)?;
        let original = secret.clone();

        // Edit / Revalidate until the buffer parses or is emptied
        let mut body = SecretFormat::Yaml
            .render(&secret)
            .map_err(EditError::Render)?;
        let mut error: Option<String> = None;
        let mut attempts = 0;
        let mut edited = loop {
            attempts += 1;
            let buffer = render_buffer(&body, error.as_deref());
            let returned = self.editor.edit(&buffer)?;

            match revalidate(&returned) {
                Revalidation::Valid(secret) => break secret,
                Revalidation::Aborted => {
                    info!("Edit cancelled, no changes made");
                    return Err(EditError::Aborted);
                }
                Revalidation::Invalid { message, body: text } => {
                    warn!(attempt = attempts, "Edited secret is invalid: {message}");
                    error = Some(message);
                    body = text;
                }
            }
        };
        let changed = edited != original;

        // Encode, then encrypt
        encode_transform(&mut edited, EncodeDirection::Encode)?;
        if let Some(key) = &self.key {
            crypto_transform(&mut edited, self.cipher, key, CryptoDirection::Encrypt)?;
        }

        // Write
        secret::store(&self.path, &edited, format)?;

        info!(
            attempts,
            changed,
            keys = edited.data.len(),
            "Saved secret {}",
            edited.metadata.name
        );
        Ok(EditReport {
            attempts,
            changed,
            keys: edited.data.len(),
        })
    }
}
