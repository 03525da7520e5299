//! # Cluster document source
//!
//! Bridges the CLI to a live cluster through the `oc` binary. [`OcSource`]
//! implements [`DocumentSource`] from `ocp-inspect-core` by running
//! `oc get <resource> -o yaml` and handing the captured stdout to the core
//! pipelines as a static document.
//!
//! Authentication and context selection are whatever the `oc` binary is
//! already configured with (`KUBECONFIG`, current context). Failures are
//! reported once; nothing is retried.

use async_trait::async_trait;
use ocp_inspect_core::config::ClusterSettings;
use ocp_inspect_core::contract::{DocumentSource, RawDocument};
use ocp_inspect_core::InspectError;
use tokio::process::Command;

pub struct OcSource {
    oc_binary: String,
    namespace: Option<String>,
    resource: String,
}

impl OcSource {
    pub fn new(settings: &ClusterSettings, resource: impl Into<String>) -> Self {
        Self {
            oc_binary: settings.oc_binary.clone(),
            namespace: settings.namespace.clone(),
            resource: resource.into(),
        }
    }

    /// Arguments passed to the `oc` binary.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "get".to_string(),
            self.resource.clone(),
            "-o".to_string(),
            "yaml".to_string(),
        ];
        if let Some(namespace) = &self.namespace {
            args.push("-n".to_string());
            args.push(namespace.clone());
        }
        args
    }
}

#[async_trait]
impl DocumentSource for OcSource {
    async fn fetch(&self) -> Result<RawDocument, InspectError> {
        let args = self.args();
        tracing::info!(oc = %self.oc_binary, args = ?args, "Fetching document from cluster");

        let output = Command::new(&self.oc_binary)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, oc = %self.oc_binary, "Failed to launch oc process");
                InspectError::Command {
                    program: self.oc_binary.clone(),
                    message: format!("failed to launch: {e}"),
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!(
                oc = %self.oc_binary,
                resource = %self.resource,
                status = ?output.status,
                stderr = %stderr,
                "oc exited with non-zero status"
            );
            return Err(InspectError::Command {
                program: self.oc_binary.clone(),
                message: format!("{}: {stderr}", output.status),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!(resource = %self.resource, bytes = text.len(), "Fetched document");
        Ok(RawDocument {
            origin: format!("oc get {}", self.resource),
            text,
        })
    }
}
