//! # Constants
//!
//! Shared constants used throughout secretctl.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default location that release manifests are downloaded from
pub const DEFAULT_MANIFEST_BASE_URL: &str =
    "https://raw.githubusercontent.com/microscaler/secretctl/main/deploy";

/// Default manifest release channel (path segment under the base URL)
pub const DEFAULT_MANIFEST_VERSION: &str = "latest";

/// Default field manager recorded on objects created or patched by `install`/`apply`
pub const DEFAULT_FIELD_MANAGER: &str = "secretctl";

/// Default timeout for a single manifest download (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Editor used when neither `VISUAL` nor `EDITOR` is set
pub const DEFAULT_EDITOR: &str = "vi";

/// Marker that starts a comment line in an edit buffer
pub const COMMENT_TOKEN: char = '#';

/// Process exit codes, one per terminal failure class.
///
/// Callers (scripts, CI jobs) branch on these, so the values are stable.
pub mod exit {
    /// Success
    pub const OK: u8 = 0;
    /// Usage errors and failures that do not belong to a more specific class
    pub const FAILURE: u8 = 1;
    /// The input document could not be read or parsed
    pub const LOAD_FAILED: u8 = 2;
    /// Wrong, empty, or missing key, or malformed ciphertext
    pub const CRYPTO_FAILED: u8 = 3;
    /// The user submitted an empty edit buffer or the editor failed
    pub const EDIT_ABORTED: u8 = 4;
    /// The result could not be written back
    pub const WRITE_FAILED: u8 = 5;
    /// A value was not valid base64 (or not valid UTF-8 after decoding)
    pub const ENCODING_FAILED: u8 = 6;
    /// Network or API failure while fetching or applying resources
    pub const RECONCILE_FAILED: u8 = 7;
}
