//! # Kubernetes Cluster Client
//!
//! [`ClusterClient`] over `kube`, working on untyped [`DynamicObject`]s so any
//! kind in a bundle (including CRDs defined earlier in the same run) can be
//! applied.
//!
//! Scope and plural name come from API discovery for the resource's group,
//! version and kind. Discovery results are cached for the lifetime of the
//! client. Patches are JSON merge patches.

use super::{ClusterClient, ClusterError};
use crate::manifest::ResourceSpec;
use async_trait::async_trait;
use kube::api::{Api, DynamicObject, Patch, PatchParams, PostParams};
use kube::discovery::{self, ApiCapabilities, ApiResource, Scope};
use kube::core::GroupVersionKind;
use kube::Client;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// `kube`-backed cluster client
pub struct KubeClusterClient {
    client: Client,
    field_manager: String,
    discovered: Mutex<HashMap<String, (ApiResource, ApiCapabilities)>>,
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl KubeClusterClient {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
            discovered: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve (and cache) the API resource for a spec's apiVersion/kind
    async fn resolve(&self, spec: &ResourceSpec) -> Result<(ApiResource, ApiCapabilities), ClusterError> {
        let cache_key = format!("{}/{}", spec.api_version, spec.kind);
        let mut discovered = self.discovered.lock().await;
        if let Some(found) = discovered.get(&cache_key) {
            return Ok(found.clone());
        }

        let (group, version) = spec.group_version();
        let gvk = GroupVersionKind::gvk(group, version, &spec.kind);
        let found = discovery::pinned_kind(&self.client, &gvk)
            .await
            .map_err(|source| ClusterError::Discovery {
                api_version: spec.api_version.clone(),
                kind: spec.kind.clone(),
                source,
            })?;

        debug!(
            kind = %spec.kind,
            plural = %found.0.plural,
            namespaced = matches!(found.1.scope, Scope::Namespaced),
            "Discovered API resource"
        );
        discovered.insert(cache_key, found.clone());
        Ok(found)
    }

    /// Namespaced kinds without a namespace go to the client's default namespace
    async fn api_for(&self, spec: &ResourceSpec) -> Result<Api<DynamicObject>, ClusterError> {
        let (resource, capabilities) = self.resolve(spec).await?;
        let api = match (capabilities.scope, spec.metadata.namespace.as_deref()) {
            (Scope::Cluster, _) => Api::all_with(self.client.clone(), &resource),
            (Scope::Namespaced, Some(ns)) => {
                Api::namespaced_with(self.client.clone(), ns, &resource)
            }
            (Scope::Namespaced, None) => Api::default_namespaced_with(self.client.clone(), &resource),
        };
        Ok(api)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn read(&self, spec: &ResourceSpec) -> Result<Option<serde_json::Value>, ClusterError> {
        let api = self.api_for(spec).await?;
        let existing = api.get_opt(&spec.metadata.name).await?;
        existing
            .map(serde_json::to_value)
            .transpose()
            .map_err(ClusterError::from)
    }

    async fn create(&self, spec: &ResourceSpec) -> Result<(), ClusterError> {
        let api = self.api_for(spec).await?;
        let object: DynamicObject = serde_json::from_value(spec.to_value()?)?;
        let params = PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..PostParams::default()
        };
        api.create(&params, &object).await?;
        Ok(())
    }

    async fn patch(&self, spec: &ResourceSpec) -> Result<(), ClusterError> {
        let api = self.api_for(spec).await?;
        let body = spec.to_value()?;
        let params = PatchParams {
            field_manager: Some(self.field_manager.clone()),
            ..PatchParams::default()
        };
        api.patch(&spec.metadata.name, &params, &Patch::Merge(&body))
            .await?;
        Ok(())
    }
}
