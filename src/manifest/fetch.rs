//! # Manifest Fetching
//!
//! Downloads the release manifest bundles and normalizes them into one
//! ordered list of resources.
//!
//! Each bundle is published twice:
//!
//! - **cluster-wide**: `{base}/{version}/{name}.yaml`
//! - **namespace-scoped**: `{base}/{version}/namespaced/{name}.yaml`
//!
//! The namespaced variant is used whenever a namespace override is active.
//! Bundles are fetched one after another in declaration order; that order is
//! the apply order.

use super::normalize::{apply_namespace_override, parse_multi_document, NormalizeError};
use super::ResourceSpec;
use crate::config::ToolConfig;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, info_span, Instrument};

/// A named manifest bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestBundle {
    pub name: &'static str,
}

/// Bundles installed by `secretctl install`, in apply order
pub const BUNDLES: &[ManifestBundle] = &[
    ManifestBundle { name: "crds" },
    ManifestBundle { name: "rbac" },
    ManifestBundle { name: "controller" },
];

impl ManifestBundle {
    /// URL of this bundle for the given release
    pub fn location(&self, base_url: &str, version: &str, namespaced: bool) -> String {
        let base = base_url.trim_end_matches('/');
        if namespaced {
            format!("{base}/{version}/namespaced/{}.yaml", self.name)
        } else {
            format!("{base}/{version}/{}.yaml", self.name)
        }
    }
}

/// A bundle could not be retrieved or parsed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to fetch {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to fetch {url}: server responded {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("invalid manifest at {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: NormalizeError,
    },
}

impl FetchError {
    /// The location that failed, when there is one
    pub fn url(&self) -> Option<&str> {
        match self {
            FetchError::Client(_) => None,
            FetchError::Request { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Parse { url, .. } => Some(url),
        }
    }
}

/// Retrieves release bundles over unauthenticated HTTP GET
#[derive(Debug, Clone)]
pub struct ResourceFetcher {
    http: reqwest::Client,
    base_url: String,
    version: String,
    bundles: Vec<ManifestBundle>,
}

impl ResourceFetcher {
    /// Fetcher for the default [`BUNDLES`]
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be built.
    pub fn new(config: &ToolConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(concat!("secretctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            http,
            base_url: config.manifest_base_url.clone(),
            version: config.manifest_version.clone(),
            bundles: BUNDLES.to_vec(),
        })
    }

    /// Replace the bundle list (tests, custom releases)
    #[must_use]
    pub fn with_bundles(mut self, bundles: Vec<ManifestBundle>) -> Self {
        self.bundles = bundles;
        self
    }

    /// URLs that [`ResourceFetcher::fetch`] will request, in order
    pub fn locations(&self, namespace: Option<&str>) -> Vec<String> {
        self.bundles
            .iter()
            .map(|b| b.location(&self.base_url, &self.version, namespace.is_some()))
            .collect()
    }

    /// Fetch and normalize every bundle, concatenated in declaration order
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] for the first bundle that fails; nothing fetched
    /// before it is returned.
    pub async fn fetch(&self, namespace: Option<&str>) -> Result<Vec<ResourceSpec>, FetchError> {
        let mut all = Vec::new();
        for url in self.locations(namespace) {
            let mut specs = self
                .fetch_one(&url)
                .instrument(info_span!("manifest.fetch", url = %url))
                .await?;
            apply_namespace_override(&mut specs, namespace);
            all.append(&mut specs);
        }
        info!(resources = all.len(), "Fetched manifest bundles");
        Ok(all)
    }

    async fn fetch_one(&self, url: &str) -> Result<Vec<ResourceSpec>, FetchError> {
        let start = Instant::now();
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let text = response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        let specs = parse_multi_document(&text).map_err(|source| FetchError::Parse {
            url: url.to_string(),
            source,
        })?;

        debug!(
            resources = specs.len(),
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Fetched {url}"
        );
        Ok(specs)
    }
}
