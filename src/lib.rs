//! secretctl library
//!
//! Editing, encryption and rotation of Kubernetes `Secret` manifests, plus
//! fetching and applying release manifest bundles. The `secretctl` binary is a
//! thin wrapper over [`cli::run`].

pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod edit;
pub mod manifest;
pub mod observability;
pub mod reconcile;
pub mod secret;
