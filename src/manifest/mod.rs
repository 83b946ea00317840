//! # Resource Manifests
//!
//! Declarative resource specifications as read from multi-document YAML.
//!
//! A [`ResourceSpec`] keeps `apiVersion`, `kind`, `metadata.name` and
//! `metadata.namespace` typed and carries every other field through untouched.
//! Two specs describe the same object when their [`ResourceIdentity`] matches;
//! content is never compared.

pub mod fetch;
pub mod normalize;

pub use fetch::{FetchError, ManifestBundle, ResourceFetcher, BUNDLES};
pub use normalize::{apply_namespace_override, parse_multi_document, NormalizeError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One declarative object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    pub api_version: String,
    pub kind: String,
    pub metadata: ResourceMetadata,
    /// Everything else (`spec`, `data`, `rules`, ...), passed through as-is
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Object metadata; labels, annotations etc. ride along in `extra`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// (kind, namespace, name)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.kind, ns, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

impl ResourceSpec {
    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity {
            kind: self.kind.clone(),
            namespace: self.metadata.namespace.clone(),
            name: self.metadata.name.clone(),
        }
    }

    /// Full object as JSON, the shape the cluster API expects
    ///
    /// # Errors
    ///
    /// Returns an error only if an opaque field cannot be represented as JSON.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Split `apiVersion` into (group, version); the core group is `""`
    pub fn group_version(&self) -> (&str, &str) {
        match self.api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", self.api_version.as_str()),
        }
    }
}
