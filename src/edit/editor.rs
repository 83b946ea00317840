//! # Editor
//!
//! The interactive editor is an external collaborator: it receives one text
//! buffer and returns the (possibly unchanged) buffer once the user is done.
//!
//! [`ExternalEditor`] runs the user's `$VISUAL`/`$EDITOR` on a temporary file.
//! The file is created with owner-only permissions and removed when the edit
//! returns, because it holds decrypted values.

use std::io::Write;
use std::process::{Command, ExitStatus};
use thiserror::Error;
use tracing::debug;

/// Failure to run the editor
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("editor command is empty")]
    EmptyCommand,
    #[error("failed to launch editor {command:?}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("editor {command:?} exited with {status}")]
    Exited { command: String, status: ExitStatus },
    #[error("failed to exchange edit buffer with editor: {0}")]
    Buffer(#[from] std::io::Error),
}

/// Something that lets a user edit a text buffer, synchronously
pub trait Editor {
    /// Present `buffer` for editing and return the result
    ///
    /// # Errors
    ///
    /// Returns [`EditorError`] if the editor could not be run to completion.
    fn edit(&mut self, buffer: &str) -> Result<String, EditorError>;
}

impl<T: Editor + ?Sized> Editor for &mut T {
    fn edit(&mut self, buffer: &str) -> Result<String, EditorError> {
        (**self).edit(buffer)
    }
}

/// Runs an editor command line on a temporary `.yaml` file
#[derive(Debug, Clone)]
pub struct ExternalEditor {
    command: String,
}

impl ExternalEditor {
    /// `command` may carry arguments, e.g. `code --wait`
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Editor for ExternalEditor {
    fn edit(&mut self, buffer: &str) -> Result<String, EditorError> {
        let mut parts = self.command.split_whitespace();
        let program = parts.next().ok_or(EditorError::EmptyCommand)?;

        // The suffix lets editors pick YAML syntax highlighting
        let mut file = tempfile::Builder::new()
            .prefix("secretctl-edit-")
            .suffix(".yaml")
            .tempfile()?;
        file.write_all(buffer.as_bytes())?;
        file.flush()?;

        debug!(editor = %self.command, path = %file.path().display(), "Launching editor");
        let status = Command::new(program)
            .args(parts)
            .arg(file.path())
            .status()
            .map_err(|source| EditorError::Launch {
                command: self.command.clone(),
                source,
            })?;

        if !status.success() {
            return Err(EditorError::Exited {
                command: self.command.clone(),
                status,
            });
        }

        Ok(std::fs::read_to_string(file.path())?)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_true_returns_buffer_unchanged() {
        let mut editor = ExternalEditor::new("true");
        let result = editor.edit("kind: Secret\n").unwrap();
        assert_eq!(result, "kind: Secret\n");
    }

    #[test]
    fn test_failing_editor_is_reported() {
        let mut editor = ExternalEditor::new("false");
        let err = editor.edit("x").unwrap_err();
        assert!(matches!(err, EditorError::Exited { .. }));
    }

    #[test]
    fn test_missing_editor_is_reported() {
        let mut editor = ExternalEditor::new("secretctl-no-such-editor-binary");
        let err = editor.edit("x").unwrap_err();
        assert!(matches!(err, EditorError::Launch { .. }));
    }

    #[test]
    fn test_empty_command() {
        let mut editor = ExternalEditor::new("   ");
        assert!(matches!(editor.edit("x"), Err(EditorError::EmptyCommand)));
    }

    #[test]
    fn test_editor_arguments_are_passed_before_path() {
        // `sh -c : sh <path>` runs a no-op script with the path as $1
        let mut editor = ExternalEditor::new("sh -c : sh");
        assert_eq!(editor.edit("keep").unwrap(), "keep");
    }
}
