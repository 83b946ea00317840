//! # Secret Encryption
//!
//! The encryption primitive is an injected capability: anything implementing
//! [`SecretCipher`] can seal a secret's data. The contract callers rely on is
//! small:
//!
//! - **whole-mapping**: one call transforms every value of `data`
//! - **deterministic**: the same plaintext and key always produce the same
//!   ciphertext, so re-encrypting an unchanged secret yields an unchanged file
//!   and a clean diff in Git
//! - **fallible on bad keys**: an empty or wrong key, or malformed ciphertext,
//!   is reported as [`CryptoError`] instead of producing garbage
//!
//! [`AeadCipher`] is the default implementation.

use super::encoding::unwrap_base64;
use crate::secret::Secret;
use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// AES-GCM nonce length (96 bits)
const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag length
const TAG_SIZE: usize = 16;

/// Which way [`crypto_transform`] converts values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoDirection {
    Encrypt,
    Decrypt,
}

/// Errors from cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption key is empty")]
    EmptyKey,

    #[error("failed to encrypt value of {key:?}")]
    EncryptionFailed { key: String },

    #[error("failed to decrypt value of {key:?} (wrong key or tampered data)")]
    DecryptionFailed { key: String },

    #[error("value of {key:?} is not ciphertext produced by this tool")]
    MalformedCiphertext { key: String },
}

/// Encryption primitive over a whole secret data mapping
pub trait SecretCipher {
    /// Encrypt every value. Must be deterministic for a given key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError`] if the key is unusable.
    fn encrypt(
        &self,
        data: &BTreeMap<String, String>,
        key: &str,
    ) -> Result<BTreeMap<String, String>, CryptoError>;

    /// Decrypt every value produced by [`SecretCipher::encrypt`] with the same key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError`] on a wrong key or malformed ciphertext.
    fn decrypt(
        &self,
        data: &BTreeMap<String, String>,
        key: &str,
    ) -> Result<BTreeMap<String, String>, CryptoError>;
}

/// Encrypt or decrypt every value of `secret.data` with `cipher`
///
/// On error `secret` is not modified.
///
/// # Errors
///
/// Returns [`CryptoError::EmptyKey`] for an empty key, otherwise whatever the
/// cipher reports.
pub fn crypto_transform<C: SecretCipher + ?Sized>(
    secret: &mut Secret,
    cipher: &C,
    key: &str,
    direction: CryptoDirection,
) -> Result<(), CryptoError> {
    if key.is_empty() {
        return Err(CryptoError::EmptyKey);
    }
    let data = match direction {
        CryptoDirection::Encrypt => cipher.encrypt(&secret.data, key)?,
        CryptoDirection::Decrypt => cipher.decrypt(&secret.data, key)?,
    };
    secret.data = data;
    Ok(())
}

/// Deterministic AES-256-GCM with a synthetic nonce
///
/// Two subkeys are derived from the passphrase with HMAC-SHA256. The nonce for
/// each value is `HMAC(nonce_key, entry_key || 0x00 || value)` truncated to 96
/// bits, so equal inputs give equal output and different inputs never share a
/// nonce. The entry key is bound as associated data, which stops ciphertext
/// from being moved between keys. Output is `base64(nonce || ciphertext || tag)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AeadCipher;

/// Subkeys derived from a passphrase, wiped on drop
#[derive(Zeroize, ZeroizeOnDrop)]
struct KeyMaterial {
    encryption: [u8; 32],
    nonce: [u8; 32],
}

impl KeyMaterial {
    fn derive(passphrase: &str) -> Result<Self, CryptoError> {
        if passphrase.is_empty() {
            return Err(CryptoError::EmptyKey);
        }
        Ok(Self {
            encryption: hmac_sha256(passphrase.as_bytes(), &[b"secretctl/encryption".as_slice()]),
            nonce: hmac_sha256(passphrase.as_bytes(), &[b"secretctl/nonce".as_slice()]),
        })
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.encryption))
    }

    fn synthetic_nonce(&self, entry_key: &str, value: &[u8]) -> [u8; NONCE_SIZE] {
        let tag = hmac_sha256(&self.nonce, &[entry_key.as_bytes(), &[0u8], value]);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&tag[..NONCE_SIZE]);
        nonce
    }
}

fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> [u8; 32] {
    // HMAC accepts keys of any length, so this cannot fail
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .unwrap_or_else(|e| unreachable!("HMAC rejected key: {e}"));
    for part in parts {
        mac.update(part);
    }
    let digest = mac.finalize().into_bytes();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

impl SecretCipher for AeadCipher {
    fn encrypt(
        &self,
        data: &BTreeMap<String, String>,
        key: &str,
    ) -> Result<BTreeMap<String, String>, CryptoError> {
        let material = KeyMaterial::derive(key)?;
        let cipher = material.cipher();

        data.iter()
            .map(|(entry_key, value)| {
                let nonce = material.synthetic_nonce(entry_key, value.as_bytes());
                let sealed = cipher
                    .encrypt(
                        Nonce::from_slice(&nonce),
                        Payload {
                            msg: value.as_bytes(),
                            aad: entry_key.as_bytes(),
                        },
                    )
                    .map_err(|e| {
                        tracing::debug!(key = %entry_key, error = %e, "AEAD seal failed");
                        CryptoError::EncryptionFailed {
                            key: entry_key.clone(),
                        }
                    })?;

                let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
                out.extend_from_slice(&nonce);
                out.extend_from_slice(&sealed);
                Ok((entry_key.clone(), general_purpose::STANDARD.encode(out)))
            })
            .collect()
    }

    fn decrypt(
        &self,
        data: &BTreeMap<String, String>,
        key: &str,
    ) -> Result<BTreeMap<String, String>, CryptoError> {
        let material = KeyMaterial::derive(key)?;
        let cipher = material.cipher();

        data.iter()
            .map(|(entry_key, value)| {
                let malformed = || CryptoError::MalformedCiphertext {
                    key: entry_key.clone(),
                };
                let raw = general_purpose::STANDARD
                    .decode(unwrap_base64(value).as_bytes())
                    .map_err(|e| {
                        tracing::debug!(key = %entry_key, error = %e, "ciphertext is not base64");
                        malformed()
                    })?;
                if raw.len() < NONCE_SIZE + TAG_SIZE {
                    return Err(malformed());
                }

                let (nonce, sealed) = raw.split_at(NONCE_SIZE);
                let mut plaintext = cipher
                    .decrypt(
                        Nonce::from_slice(nonce),
                        Payload {
                            msg: sealed,
                            aad: entry_key.as_bytes(),
                        },
                    )
                    .map_err(|e| {
                        tracing::debug!(key = %entry_key, error = %e, "AEAD open failed");
                        CryptoError::DecryptionFailed {
                            key: entry_key.clone(),
                        }
                    })?;

                let text = String::from_utf8(plaintext.clone()).map_err(|e| {
                    tracing::debug!(key = %entry_key, error = %e, "plaintext is not UTF-8");
                    malformed()
                });
                plaintext.zeroize();
                Ok((entry_key.clone(), text?))
            })
            .collect()
    }
}
