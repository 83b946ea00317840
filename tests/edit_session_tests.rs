//! # Edit Session Tests
//!
//! End-to-end edit cycles against real files with a scripted editor:
//! retry on invalid input, abort on an empty buffer, and byte-stable
//! null edits of encrypted secrets.

mod common;

use common::ScriptedEditor;
use pretty_assertions::assert_eq;
use secretctl::codec::{crypto_transform, AeadCipher, CryptoDirection};
use secretctl::constants::exit;
use secretctl::edit::{EditSession, EDIT_HEADER};
use secretctl::secret::{self, Secret, SecretFormat};
use std::path::{Path, PathBuf};

fn write_secret(dir: &Path, name: &str, secret: &Secret) -> PathBuf {
    let path = dir.join(name);
    secret::store(&path, secret, SecretFormat::from_path(&path)).unwrap();
    path
}

fn encrypted_secret(key: &str) -> Secret {
    let mut secret = Secret::new("db", Some("prod".to_string())).with_entry("user", "dGVzdA==");
    crypto_transform(&mut secret, &AeadCipher, key, CryptoDirection::Encrypt).unwrap();
    secret
}

#[test]
fn test_invalid_edit_reopens_editor_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_secret(
        dir.path(),
        "db.yaml",
        &Secret::new("db", None).with_entry("user", "dGVzdA=="),
    );
    let mut editor = ScriptedEditor::new(vec![
        Some("kind: Secret\nmetadata: [unclosed\n"),
        Some("kind: Secret\nmetadata:\n  name: db\ndata:\n  user: admin\n"),
    ]);

    let status = EditSession::new(&path, &AeadCipher, &mut editor).status();

    assert_eq!(status, exit::OK);
    assert_eq!(editor.seen.len(), 2);
    let retry = &editor.seen[1];
    assert!(retry.starts_with(EDIT_HEADER));
    assert!(retry.contains("# error:"));
    // The user's broken text is shown again below the error
    assert!(retry.contains("metadata: [unclosed"));

    let (saved, _) = secret::load(&path).unwrap();
    assert_eq!(saved.data["user"], "YWRtaW4=");
}

#[test]
fn test_empty_buffer_aborts_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_secret(dir.path(), "db.yaml", &encrypted_secret("k1"));
    let before = std::fs::read(&path).unwrap();
    let mut editor = ScriptedEditor::new(vec![Some("# only comments\n\n")]);

    let status = EditSession::new(&path, &AeadCipher, &mut editor)
        .with_key(Some("k1".to_string()))
        .status();

    assert_eq!(status, exit::EDIT_ABORTED);
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn test_null_edit_of_encrypted_secret_is_byte_stable() {
    for name in ["db.yaml", "db.json"] {
        let dir = tempfile::tempdir().unwrap();
        let path = write_secret(dir.path(), name, &encrypted_secret("k1"));
        let before = std::fs::read(&path).unwrap();
        let mut editor = ScriptedEditor::new(vec![None]);

        let report = EditSession::new(&path, &AeadCipher, &mut editor)
            .with_key(Some("k1".to_string()))
            .run()
            .unwrap();

        assert!(!report.changed);
        assert_eq!(std::fs::read(&path).unwrap(), before, "{name} changed");
        assert!(editor.seen[0].contains("user: test"));

        let (mut saved, _) = secret::load(&path).unwrap();
        crypto_transform(&mut saved, &AeadCipher, "k1", CryptoDirection::Decrypt).unwrap();
        assert_eq!(saved.data["user"], "dGVzdA==");
    }
}

#[test]
fn test_wrong_key_fails_before_editor_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_secret(dir.path(), "db.yaml", &encrypted_secret("k1"));
    let mut editor = ScriptedEditor::new(vec![None]);

    let status = EditSession::new(&path, &AeadCipher, &mut editor)
        .with_key(Some("k2".to_string()))
        .status();

    assert_eq!(status, exit::CRYPTO_FAILED);
    assert!(editor.seen.is_empty());
}

#[test]
fn test_edit_keeps_json_format_and_encrypts_new_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_secret(dir.path(), "db.json", &encrypted_secret("k1"));
    let mut editor = ScriptedEditor::new(vec![Some(
        "apiVersion: v1\nkind: Secret\nmetadata:\n  name: db\n  namespace: prod\ndata:\n  user: test\n  password: hunter2\n",
    )]);

    let report = EditSession::new(&path, &AeadCipher, &mut editor)
        .with_key(Some("k1".to_string()))
        .run()
        .unwrap();
    assert!(report.changed);
    assert_eq!(report.keys, 2);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.trim_start().starts_with('{'));
    assert!(!text.contains("hunter2"));

    let (mut saved, format) = secret::load(&path).unwrap();
    assert_eq!(format, SecretFormat::Json);
    crypto_transform(&mut saved, &AeadCipher, "k1", CryptoDirection::Decrypt).unwrap();
    assert_eq!(saved.data["password"], "aHVudGVyMg==");
    assert_eq!(saved.data["user"], "dGVzdA==");
}

#[cfg(unix)]
#[test]
fn test_failing_external_editor_aborts() {
    use secretctl::edit::ExternalEditor;

    let dir = tempfile::tempdir().unwrap();
    let path = write_secret(
        dir.path(),
        "db.yaml",
        &Secret::new("db", None).with_entry("user", "dGVzdA=="),
    );
    let before = std::fs::read(&path).unwrap();

    let status = EditSession::new(&path, &AeadCipher, ExternalEditor::new("false")).status();

    assert_eq!(status, exit::EDIT_ABORTED);
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn test_null_edit_keeps_labels_annotations_and_string_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.yaml");
    std::fs::write(
        &path,
        "apiVersion: v1\nkind: Secret\nmetadata:\n  name: db\n  labels:\n    app: web\n  annotations:\n    owner: team-a\ntype: Opaque\ndata:\n  user: dGVzdA==\nstringData:\n  extra: keepme\n",
    )
    .unwrap();
    let mut editor = ScriptedEditor::new(vec![None]);

    let status = EditSession::new(&path, &AeadCipher, &mut editor).status();

    assert_eq!(status, exit::OK);
    let (saved, _) = secret::load(&path).unwrap();
    assert_eq!(saved.metadata.extra["labels"]["app"], "web");
    assert_eq!(saved.metadata.extra["annotations"]["owner"], "team-a");
    assert_eq!(saved.extra["stringData"]["extra"], "keepme");
    assert_eq!(saved.data["user"], "dGVzdA==");
}

#[test]
fn test_wrapped_value_is_unwrapped_once_then_stable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.yaml");
    std::fs::write(
        &path,
        "apiVersion: v1\nkind: Secret\nmetadata:\n  name: db\ndata:\n  user: |\n    dGVz\n    dA==\n",
    )
    .unwrap();

    let first = EditSession::new(&path, &AeadCipher, ScriptedEditor::new(vec![None])).status();
    assert_eq!(first, exit::OK);
    let (saved, _) = secret::load(&path).unwrap();
    assert_eq!(saved.data["user"], "dGVzdA==");

    let canonical = std::fs::read(&path).unwrap();
    let second = EditSession::new(&path, &AeadCipher, ScriptedEditor::new(vec![None])).status();
    assert_eq!(second, exit::OK);
    assert_eq!(std::fs::read(&path).unwrap(), canonical);
}
