//! Shared test doubles for the integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use secretctl::edit::{Editor, EditorError};
use secretctl::manifest::{ResourceIdentity, ResourceSpec};
use secretctl::reconcile::{ClusterClient, ClusterError};
use std::collections::HashSet;
use std::sync::Mutex;

/// Editor that returns scripted responses and records every buffer it was shown
///
/// A `None` response returns the buffer unchanged (a "null edit").
#[derive(Debug, Default)]
pub struct ScriptedEditor {
    responses: Vec<Option<String>>,
    pub seen: Vec<String>,
}

impl ScriptedEditor {
    pub fn new(responses: Vec<Option<&str>>) -> Self {
        Self {
            responses: responses
                .into_iter()
                .rev()
                .map(|r| r.map(ToString::to_string))
                .collect(),
            seen: Vec::new(),
        }
    }
}

impl Editor for ScriptedEditor {
    fn edit(&mut self, buffer: &str) -> Result<String, EditorError> {
        self.seen.push(buffer.to_string());
        match self.responses.pop() {
            Some(Some(text)) => Ok(text),
            Some(None) | None => Ok(buffer.to_string()),
        }
    }
}

/// One call made against [`FakeCluster`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Read(String),
    Create(String),
    Patch(String),
}

/// In-memory cluster keyed by resource identity, recording every call
#[derive(Debug, Default)]
pub struct FakeCluster {
    existing: Mutex<HashSet<ResourceIdentity>>,
    fail_on: Option<Call>,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeCluster {
    pub fn with_existing(specs: &[&ResourceSpec]) -> Self {
        Self {
            existing: Mutex::new(specs.iter().map(|s| s.identity()).collect()),
            ..Self::default()
        }
    }

    /// Fail the given call with a [`ClusterError::Convert`]
    #[must_use]
    pub fn failing_on(mut self, call: Call) -> Self {
        self.fail_on = Some(call);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<(), ClusterError> {
        self.calls.lock().unwrap().push(call.clone());
        if self.fail_on.as_ref() == Some(&call) {
            let source = serde_json::from_str::<serde_json::Value>("{")
                .expect_err("truncated JSON must not parse");
            return Err(ClusterError::Convert(source));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn read(&self, spec: &ResourceSpec) -> Result<Option<serde_json::Value>, ClusterError> {
        self.record(Call::Read(spec.identity().to_string()))?;
        let exists = self.existing.lock().unwrap().contains(&spec.identity());
        Ok(exists.then(|| spec.to_value()).transpose()?)
    }

    async fn create(&self, spec: &ResourceSpec) -> Result<(), ClusterError> {
        self.record(Call::Create(spec.identity().to_string()))?;
        self.existing.lock().unwrap().insert(spec.identity());
        Ok(())
    }

    async fn patch(&self, spec: &ResourceSpec) -> Result<(), ClusterError> {
        self.record(Call::Patch(spec.identity().to_string()))
    }
}

/// Minimal resource of `kind` with the given name and namespace
pub fn resource(kind: &str, name: &str, namespace: Option<&str>) -> ResourceSpec {
    let ns = namespace
        .map(|ns| format!("  namespace: {ns}\n"))
        .unwrap_or_default();
    let text = format!("apiVersion: v1\nkind: {kind}\nmetadata:\n  name: {name}\n{ns}");
    serde_yaml::from_str(&text).unwrap()
}
