//! # Interactive Editing
//!
//! Edit a stored secret in place: values are shown decoded and decrypted in
//! the user's editor and written back encoded and encrypted.
//!
//! - [`buffer`]: comment header, error rendering, revalidation
//! - [`editor`]: the [`Editor`] collaborator and the `$EDITOR` implementation
//! - [`session`]: the [`EditSession`] state machine

pub mod buffer;
pub mod editor;
pub mod session;

pub use buffer::{Revalidation, EDIT_HEADER};
pub use editor::{Editor, EditorError, ExternalEditor};
pub use session::{EditError, EditReport, EditSession};
