//! Edit buffer rendering and revalidation.
//!
//! A buffer is a comment block followed by the secret in its editable YAML
//! form. Comment lines start with [`COMMENT_TOKEN`] in the first column and are
//! dropped before parsing; indented `#` lines belong to the document (for
//! example inside a block scalar) and are kept.

use crate::constants::COMMENT_TOKEN;
use crate::secret::{Secret, SecretFormat};

/// Instructions shown at the top of every edit buffer
pub const EDIT_HEADER: &str = "\
# Please edit the secret below. Values are shown decoded and decrypted;
# they are encoded and encrypted again when the file is saved.
#
# Lines beginning with a '#' will be ignored, and an empty file will abort
# the edit. If an error occurs while saving, this file will be reopened
# with the relevant failures.
#
";

/// Outcome of checking an edited buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revalidation {
    /// The buffer holds a valid Secret
    Valid(Secret),
    /// The buffer could not be parsed; `body` is the uncommented text to show again
    Invalid { message: String, body: String },
    /// The buffer is empty once comments are removed
    Aborted,
}

/// Build the text handed to the editor
///
/// `error` (from a previous attempt) is rendered as comment lines between the
/// header and the body.
pub fn render_buffer(body: &str, error: Option<&str>) -> String {
    let mut buffer = String::from(EDIT_HEADER);
    if let Some(error) = error {
        buffer.push_str(&render_error(error));
        buffer.push(COMMENT_TOKEN);
        buffer.push('\n');
    }
    buffer.push_str(body);
    if !body.is_empty() && !body.ends_with('\n') {
        buffer.push('\n');
    }
    buffer
}

/// Comment-prefix every line of a parse error
pub fn render_error(error: &str) -> String {
    let mut lines = error.lines();
    let mut out = format!("{COMMENT_TOKEN} error: {}\n", lines.next().unwrap_or_default());
    for line in lines {
        out.push_str(&format!("{COMMENT_TOKEN}   {line}\n"));
    }
    out
}

/// Drop every line that starts with the comment token
pub fn strip_comments(buffer: &str) -> String {
    buffer
        .lines()
        .filter(|line| !line.starts_with(COMMENT_TOKEN))
        .map(|line| format!("{line}\n"))
        .collect()
}

/// Strip comments and try to parse what remains
pub fn revalidate(buffer: &str) -> Revalidation {
    let body = strip_comments(buffer);
    if body.trim().is_empty() {
        return Revalidation::Aborted;
    }
    match SecretFormat::Yaml.parse(&body) {
        Ok(secret) => Revalidation::Valid(secret),
        Err(e) => Revalidation::Invalid {
            message: e.to_string(),
            body,
        },
    }
}
