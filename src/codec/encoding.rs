//! Base64 transform over every value of a secret.
//!
//! Stored values may be wrapped (`base64 -w 76`, editor reflow): ASCII
//! whitespace anywhere in a stored value is ignored when decoding, here and in
//! the cipher. Encoding always produces a single line, so a wrapped file is
//! rewritten unwrapped once and is byte-stable after that.

use crate::secret::Secret;
use base64::{engine::general_purpose, Engine as _};
use std::collections::BTreeMap;
use thiserror::Error;

/// Which way [`encode_transform`] converts values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeDirection {
    /// raw text -> base64 text
    Encode,
    /// base64 text -> raw text
    Decode,
}

/// A value that could not be base64-decoded into text
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("value of {key:?} is not valid base64: {source}")]
    InvalidBase64 {
        key: String,
        #[source]
        source: base64::DecodeError,
    },
    #[error("value of {key:?} does not decode to UTF-8 text: {source}")]
    InvalidUtf8 {
        key: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

impl EncodingError {
    /// The data key whose value failed
    pub fn key(&self) -> &str {
        match self {
            EncodingError::InvalidBase64 { key, .. } | EncodingError::InvalidUtf8 { key, .. } => {
                key
            }
        }
    }
}

/// Encode or decode every value of `secret.data`
///
/// The new mapping is built in full first; on error `secret` is not modified.
///
/// # Errors
///
/// Returns [`EncodingError`] naming the first key whose value is not valid base64
/// (or not UTF-8 once decoded). Encoding never fails.
pub fn encode_transform(secret: &mut Secret, direction: EncodeDirection) -> Result<(), EncodingError> {
    let data = match direction {
        EncodeDirection::Encode => secret
            .data
            .iter()
            .map(|(k, v)| (k.clone(), general_purpose::STANDARD.encode(v.as_bytes())))
            .collect(),
        EncodeDirection::Decode => decode_all(&secret.data)?,
    };
    secret.data = data;
    Ok(())
}

/// Drop the line breaks and indentation of a wrapped base64 value
pub(crate) fn unwrap_base64(value: &str) -> String {
    value.split_ascii_whitespace().collect()
}

fn decode_all(data: &BTreeMap<String, String>) -> Result<BTreeMap<String, String>, EncodingError> {
    data.iter()
        .map(|(key, value)| {
            let bytes = general_purpose::STANDARD
                .decode(unwrap_base64(value).as_bytes())
                .map_err(|source| EncodingError::InvalidBase64 {
                    key: key.clone(),
                    source,
                })?;
            let text = String::from_utf8(bytes).map_err(|source| EncodingError::InvalidUtf8 {
                key: key.clone(),
                source,
            })?;
            Ok((key.clone(), text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_values() {
        let mut secret = Secret::new("db", None)
            .with_entry("user", "test")
            .with_entry("empty", "");
        encode_transform(&mut secret, EncodeDirection::Encode).unwrap();
        assert_eq!(secret.data["user"], "dGVzdA==");
        assert_eq!(secret.data["empty"], "");
    }

    #[test]
    fn test_decode_values() {
        let mut secret = Secret::new("db", None).with_entry("user", "dGVzdA==");
        encode_transform(&mut secret, EncodeDirection::Decode).unwrap();
        assert_eq!(secret.data["user"], "test");
    }

    #[test]
    fn test_decode_tolerates_wrapped_base64() {
        let mut secret = Secret::new("db", None).with_entry("user", "dGVz\ndA==\n");
        encode_transform(&mut secret, EncodeDirection::Decode).unwrap();
        assert_eq!(secret.data["user"], "test");
    }

    #[test]
    fn test_decode_failure_leaves_secret_untouched() {
        let original = Secret::new("db", None)
            .with_entry("a", "dGVzdA==")
            .with_entry("b", "not base64!")
            .with_entry("c", "dGVzdA==");
        let mut secret = original.clone();

        let err = encode_transform(&mut secret, EncodeDirection::Decode).unwrap_err();

        assert_eq!(err.key(), "b");
        assert!(matches!(err, EncodingError::InvalidBase64 { .. }));
        assert_eq!(secret, original);
    }

    #[test]
    fn test_decode_rejects_binary_payload() {
        // 0xff 0xfe is valid base64 content but not UTF-8
        let mut secret = Secret::new("db", None).with_entry("bin", "//4=");
        let err = encode_transform(&mut secret, EncodeDirection::Decode).unwrap_err();
        assert!(matches!(err, EncodingError::InvalidUtf8 { .. }));
        assert_eq!(secret.data["bin"], "//4=");
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let original = Secret::new("db", None)
            .with_entry("multi", "line one\nline two\n")
            .with_entry("unicode", "pässwörd ✓");
        let mut secret = original.clone();
        encode_transform(&mut secret, EncodeDirection::Encode).unwrap();
        encode_transform(&mut secret, EncodeDirection::Decode).unwrap();
        assert_eq!(secret, original);
    }
}
