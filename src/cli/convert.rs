//! Non-interactive conversions of a secret file: `encrypt`, `decrypt`,
//! `rotate` and `view`.

use super::CliError;
use crate::codec::{
    crypto_transform, encode_transform, to_editable, CryptoDirection, EncodeDirection,
    SecretCipher,
};
use crate::secret::{self, Secret, SecretFormat, WriteError};
use std::path::Path;
use tracing::info;

/// Encrypt a base64-encoded secret in place
///
/// Values must decode as base64 first, which also catches a file that is
/// already encrypted under a different layout.
pub(super) fn encrypt(path: &Path, cipher: &dyn SecretCipher, key: &str) -> Result<(), CliError> {
    let (mut secret, format) = secret::load(path)?;
    encode_transform(&mut secret.clone(), EncodeDirection::Decode)?;
    crypto_transform(&mut secret, cipher, key, CryptoDirection::Encrypt)?;
    secret::store(path, &secret, format)?;
    info!(path = %path.display(), keys = secret.data.len(), "Encrypted secret");
    Ok(())
}

/// Decrypt into a plain Kubernetes Secret at `output` or on stdout
pub(super) fn decrypt(
    path: &Path,
    cipher: &dyn SecretCipher,
    key: &str,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let (mut secret, _) = secret::load(path)?;
    crypto_transform(&mut secret, cipher, key, CryptoDirection::Decrypt)?;
    emit(&secret, output)
}

/// Re-encrypt under `new_key`; the file is only rewritten when both steps succeed
pub(super) fn rotate(
    path: &Path,
    cipher: &dyn SecretCipher,
    key: &str,
    new_key: &str,
) -> Result<(), CliError> {
    let (mut secret, format) = secret::load(path)?;
    crypto_transform(&mut secret, cipher, key, CryptoDirection::Decrypt)?;
    crypto_transform(&mut secret, cipher, new_key, CryptoDirection::Encrypt)?;
    secret::store(path, &secret, format)?;
    info!(path = %path.display(), keys = secret.data.len(), "Rotated secret key");
    Ok(())
}

/// Print the editable (decoded) form as YAML
pub(super) fn view(
    path: &Path,
    cipher: &dyn SecretCipher,
    key: Option<&str>,
) -> Result<(), CliError> {
    let (mut secret, _) = secret::load(path)?;
    to_editable(&mut secret, cipher, key)?;
    emit(&secret, None)
}

fn emit(secret: &Secret, output: Option<&Path>) -> Result<(), CliError> {
    match output {
        Some(path) => secret::store(path, secret, SecretFormat::from_path(path))?,
        None => {
            let format = SecretFormat::Yaml;
            let text = format
                .render(secret)
                .map_err(|source| WriteError::Render { format, source })?;
            print!("{text}");
        }
    }
    Ok(())
}
