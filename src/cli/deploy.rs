//! `secretctl apply` and `secretctl install`: push resource manifests into
//! the cluster with the reconcile engine.

use super::CliError;
use crate::config::ToolConfig;
use crate::manifest::{apply_namespace_override, parse_multi_document, ResourceFetcher, ResourceSpec};
use crate::reconcile::{
    ApplyOutcome, ApplySummary, ClusterClient, ClusterError, KubeClusterClient, ReconcileEngine,
};
use crate::secret::LoadError;
use kube::Client;
use std::path::Path;
use tracing::info;

/// Apply a local multi-document file
pub(super) async fn apply_file(
    path: &Path,
    namespace: Option<&str>,
    config: &ToolConfig,
) -> Result<(), CliError> {
    let specs = read_manifest(path, namespace)?;
    let client = connect(config).await?;
    let summary = ReconcileEngine::new(client).apply_all(&specs).await?;
    print_summary(&summary);
    Ok(())
}

/// Fetch the release bundles and apply them, or list them with `dry_run`
pub(super) async fn install(
    namespace: Option<&str>,
    dry_run: bool,
    config: &ToolConfig,
) -> Result<(), CliError> {
    let fetcher = ResourceFetcher::new(config)?;
    info!(
        version = %config.manifest_version,
        namespace = namespace.unwrap_or("<cluster-wide>"),
        "Installing release bundles"
    );
    let specs = fetcher.fetch(namespace).await?;

    if dry_run {
        for spec in &specs {
            println!("{}", spec.identity());
        }
        return Ok(());
    }

    let client = connect(config).await?;
    let summary = ReconcileEngine::new(client).apply_all(&specs).await?;
    print_summary(&summary);
    Ok(())
}

fn read_manifest(path: &Path, namespace: Option<&str>) -> Result<Vec<ResourceSpec>, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut specs =
        parse_multi_document(&text).map_err(|e| CliError::manifest(path.to_path_buf(), e))?;
    apply_namespace_override(&mut specs, namespace);
    Ok(specs)
}

async fn connect(config: &ToolConfig) -> Result<impl ClusterClient, CliError> {
    let client = Client::try_default().await.map_err(ClusterError::from)?;
    Ok(KubeClusterClient::new(client, config.field_manager.clone()))
}

fn print_summary(summary: &ApplySummary) {
    for (identity, outcome) in &summary.outcomes {
        let verb = match outcome {
            ApplyOutcome::Created => "created",
            ApplyOutcome::Patched => "configured",
        };
        println!("{identity} {verb}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_manifest_applies_namespace_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.yaml");
        std::fs::write(
            &path,
            "apiVersion: v1\nkind: ServiceAccount\nmetadata:\n  name: a\n  namespace: x\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: b\n",
        )
        .unwrap();

        let specs = read_manifest(&path, Some("team-a")).unwrap();
        assert_eq!(specs.len(), 2);
        assert!(specs
            .iter()
            .all(|s| s.metadata.namespace.as_deref() == Some("team-a")));
    }

    #[test]
    fn test_read_manifest_reports_bad_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.yaml");
        std::fs::write(&path, "kind: [unterminated\n").unwrap();

        let err = read_manifest(&path, None).unwrap_err();
        assert!(matches!(err, CliError::Other(_)));
        assert!(format!("{err:#}").contains("is not a valid manifest stream"));
    }

    #[test]
    fn test_read_manifest_missing_file_is_load_error() {
        let err = read_manifest(Path::new("/nonexistent/bundle.yaml"), None).unwrap_err();
        assert!(matches!(err, CliError::Load(_)));
    }
}
