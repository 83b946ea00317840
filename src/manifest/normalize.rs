//! # Manifest Normalization
//!
//! Turns one multi-document YAML stream into an ordered list of
//! [`ResourceSpec`]s and stamps a namespace override onto them.
//!
//! Document order is kept as-is. Bundles are authored in dependency order
//! (namespace, then RBAC, then workloads) and the apply step relies on it.

use super::ResourceSpec;
use thiserror::Error;
use tracing::debug;

/// A document in the stream is not a valid resource
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("document {index} is not a valid resource: {source}")]
    Document {
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("document {index} is not a valid resource: {field} must not be empty")]
    EmptyField { index: usize, field: &'static str },
}

/// Split a YAML stream on `---` lines
///
/// Blocks that are blank or hold only comments are dropped; they are what
/// leading separators and trailing newlines produce.
fn split_documents(text: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if is_separator(line) {
            documents.push(std::mem::take(&mut current));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    documents.push(current);

    documents
        .into_iter()
        .filter(|doc| !is_blank_document(doc))
        .collect()
}

fn is_separator(line: &str) -> bool {
    let line = line.trim_end();
    line == "---" || line.starts_with("--- ")
}

fn is_blank_document(doc: &str) -> bool {
    doc.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "..."
    })
}

/// Parse every document of `text` into a [`ResourceSpec`]
///
/// All or nothing: the first document that fails aborts the call and no
/// partial list is returned. Indices in errors are 1-based over the
/// non-empty documents.
///
/// # Errors
///
/// Returns [`NormalizeError`] for the first invalid document.
pub fn parse_multi_document(text: &str) -> Result<Vec<ResourceSpec>, NormalizeError> {
    let specs = split_documents(text)
        .iter()
        .enumerate()
        .map(|(i, doc)| parse_document(i + 1, doc))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(documents = specs.len(), "Parsed manifest stream");
    Ok(specs)
}

fn parse_document(index: usize, doc: &str) -> Result<ResourceSpec, NormalizeError> {
    let spec: ResourceSpec =
        serde_yaml::from_str(doc).map_err(|source| NormalizeError::Document { index, source })?;

    for (field, value) in [
        ("apiVersion", &spec.api_version),
        ("kind", &spec.kind),
        ("metadata.name", &spec.metadata.name),
    ] {
        if value.trim().is_empty() {
            return Err(NormalizeError::EmptyField { index, field });
        }
    }
    Ok(spec)
}

/// Overwrite `metadata.namespace` on every spec when `namespace` is given
///
/// The override is unconditional: cluster-scoped kinds get the field too. The
/// cluster ignores it for those kinds, so this is harmless, and it keeps the
/// normalizer free of any knowledge about resource scopes.
pub fn apply_namespace_override(specs: &mut [ResourceSpec], namespace: Option<&str>) {
    let Some(namespace) = namespace else {
        return;
    };
    for spec in specs.iter_mut() {
        spec.metadata.namespace = Some(namespace.to_string());
    }
    debug!(namespace, resources = specs.len(), "Applied namespace override");
}
