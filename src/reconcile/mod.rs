//! # Reconciliation
//!
//! Converges the cluster toward a list of [`ResourceSpec`]s with
//! read-then-create-or-patch, one resource at a time.
//!
//! The cluster API is reached through the [`ClusterClient`] trait so the
//! engine can be driven by a real `kube` client ([`KubeClusterClient`]) or by a
//! test double.

pub mod engine;
pub mod kube_client;

pub use engine::{ApplyOutcome, ApplySummary, ReconcileEngine};
pub use kube_client::KubeClusterClient;

use crate::manifest::{ResourceIdentity, ResourceSpec};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Cluster API operations the engine needs
///
/// Identity (kind, namespace, name) is taken from the spec itself.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Current object, or `None` when it does not exist
    async fn read(&self, spec: &ResourceSpec) -> Result<Option<serde_json::Value>, ClusterError>;

    /// Create the object
    async fn create(&self, spec: &ResourceSpec) -> Result<(), ClusterError>;

    /// Patch the existing object to match the spec
    async fn patch(&self, spec: &ResourceSpec) -> Result<(), ClusterError>;
}

/// Failure reported by a [`ClusterClient`]
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("{api_version} {kind} is not served by the cluster: {source}")]
    Discovery {
        api_version: String,
        kind: String,
        #[source]
        source: kube::Error,
    },
    #[error(transparent)]
    Api(#[from] kube::Error),
    #[error("failed to convert resource: {0}")]
    Convert(#[from] serde_json::Error),
}

/// Which call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStep {
    Read,
    Create,
    Patch,
}

impl fmt::Display for ApplyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyStep::Read => write!(f, "read"),
            ApplyStep::Create => write!(f, "create"),
            ApplyStep::Patch => write!(f, "patch"),
        }
    }
}

/// Applying one resource failed
#[derive(Debug, Error)]
#[error("failed to {step} {identity}: {source}")]
pub struct ReconcileError {
    pub identity: ResourceIdentity,
    pub step: ApplyStep,
    #[source]
    pub source: ClusterError,
}
