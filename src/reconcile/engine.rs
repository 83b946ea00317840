//! # Reconcile Engine
//!
//! `apply` reads the object; if it is missing it is created, otherwise it is
//! patched. There is no diff, no resource-version check and no rollback: the
//! last writer wins, and whether a patch changes anything is up to the
//! cluster.
//!
//! `apply_all` walks the list strictly in order and stops at the first
//! failure. Resources applied before the failure stay applied. Running it
//! again against an unchanged cluster turns every create into a patch.

use super::{ApplyStep, ClusterClient, ReconcileError};
use crate::manifest::{ResourceIdentity, ResourceSpec};
use tracing::{debug, info, info_span, Instrument};

/// What `apply` did to one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Patched,
}

/// Result of a successful `apply_all`, in apply order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub outcomes: Vec<(ResourceIdentity, ApplyOutcome)>,
}

impl ApplySummary {
    pub fn created(&self) -> usize {
        self.count(ApplyOutcome::Created)
    }

    pub fn patched(&self) -> usize {
        self.count(ApplyOutcome::Patched)
    }

    fn count(&self, outcome: ApplyOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }
}

/// Sequential read-then-create-or-patch over a [`ClusterClient`]
#[derive(Debug)]
pub struct ReconcileEngine<C> {
    client: C,
}

impl<C: ClusterClient> ReconcileEngine<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Create `spec` if it does not exist, patch it otherwise
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] naming the resource and the call that failed.
    pub async fn apply(&self, spec: &ResourceSpec) -> Result<ApplyOutcome, ReconcileError> {
        let identity = spec.identity();
        let fail = |step, source| ReconcileError {
            identity: identity.clone(),
            step,
            source,
        };

        let existing = self
            .client
            .read(spec)
            .await
            .map_err(|e| fail(ApplyStep::Read, e))?;

        let outcome = if existing.is_none() {
            self.client
                .create(spec)
                .await
                .map_err(|e| fail(ApplyStep::Create, e))?;
            ApplyOutcome::Created
        } else {
            self.client
                .patch(spec)
                .await
                .map_err(|e| fail(ApplyStep::Patch, e))?;
            ApplyOutcome::Patched
        };

        debug!(?outcome, "Applied {identity}");
        Ok(outcome)
    }

    /// Apply every spec in order, stopping at the first failure
    ///
    /// # Errors
    ///
    /// Returns the [`ReconcileError`] of the first resource that failed.
    /// Later resources are not touched and earlier ones are not rolled back.
    pub async fn apply_all(&self, specs: &[ResourceSpec]) -> Result<ApplySummary, ReconcileError> {
        let mut summary = ApplySummary::default();

        for spec in specs {
            let span = info_span!(
                "reconcile.apply",
                kind = %spec.kind,
                namespace = spec.metadata.namespace.as_deref().unwrap_or(""),
                name = %spec.metadata.name
            );
            let outcome = self.apply(spec).instrument(span).await?;
            summary.outcomes.push((spec.identity(), outcome));
        }

        info!(
            created = summary.created(),
            patched = summary.patched(),
            "Applied {} resources",
            summary.outcomes.len()
        );
        Ok(summary)
    }
}
