//! # Secret Codec
//!
//! Stateless, whole-mapping transforms over a secret's `data`.
//!
//! - [`encode_transform`] switches every value between base64 text and raw text
//! - [`crypto_transform`] switches every value between plaintext and ciphertext
//!   by delegating to an injected [`SecretCipher`]
//!
//! ## Ordering
//!
//! Stored values are `encrypt(base64(raw))`. Going from the stored form to the
//! editable form is therefore **decrypt, then decode**; going back is **encode,
//! then encrypt**. Decoding first would hand ciphertext bytes to the editor.
//!
//! Both transforms build the new mapping completely before replacing the old
//! one, so a failure on any single value leaves the secret untouched.

mod crypto;
mod encoding;

pub use crypto::{crypto_transform, AeadCipher, CryptoDirection, CryptoError, SecretCipher};
pub use encoding::{encode_transform, EncodeDirection, EncodingError};

use crate::secret::Secret;

/// Stored form to editable form: decrypt (when a key is given), then decode
///
/// # Errors
///
/// Returns [`CodecError`] from whichever stage failed; `secret` is left as it was
/// before that stage.
pub fn to_editable(
    secret: &mut Secret,
    cipher: &dyn SecretCipher,
    key: Option<&str>,
) -> Result<(), CodecError> {
    if let Some(key) = key {
        crypto_transform(secret, cipher, key, CryptoDirection::Decrypt)?;
    }
    encode_transform(secret, EncodeDirection::Decode)?;
    Ok(())
}

/// Editable form to stored form: encode, then encrypt (when a key is given)
///
/// # Errors
///
/// Returns [`CodecError`] from whichever stage failed.
pub fn to_stored(
    secret: &mut Secret,
    cipher: &dyn SecretCipher,
    key: Option<&str>,
) -> Result<(), CodecError> {
    encode_transform(secret, EncodeDirection::Encode)?;
    if let Some(key) = key {
        crypto_transform(secret, cipher, key, CryptoDirection::Encrypt)?;
    }
    Ok(())
}

/// Either codec failure
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}
