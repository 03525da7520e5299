//! `load_config` module: loads the optional YAML config file and layers
//! environment overrides on top, producing the [`InspectConfig`] handed to
//! the core pipelines.
//!
//! Precedence, lowest first: built-in defaults, config file, environment
//! (`OCP_INSPECT_OC_BINARY`, `OCP_INSPECT_NAMESPACE`), CLI flags (applied in
//! [`crate::cli`]).
//!
//! # Errors
//! Unreadable or unparsable config files are reported through `anyhow::Error`
//! at the CLI boundary.
use anyhow::Result;
use ocp_inspect_core::config::InspectConfig;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const OC_BINARY_ENV: &str = "OCP_INSPECT_OC_BINARY";
pub const NAMESPACE_ENV: &str = "OCP_INSPECT_NAMESPACE";

/// Loads a YAML config file. Keys left out fall back to their defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<InspectConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    if config_content.trim().is_empty() {
        return Ok(InspectConfig::default());
    }

    match serde_yaml::from_str::<InspectConfig>(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

/// Applies environment overrides for the cluster collaborator.
pub fn apply_env_overrides(config: &mut InspectConfig) {
    if let Ok(binary) = std::env::var(OC_BINARY_ENV) {
        if !binary.is_empty() {
            info!(oc_binary = %binary, "Using oc binary from environment");
            config.cluster.oc_binary = binary;
        }
    }
    if let Ok(namespace) = std::env::var(NAMESPACE_ENV) {
        if !namespace.is_empty() {
            info!(namespace = %namespace, "Using namespace from environment");
            config.cluster.namespace = Some(namespace);
        }
    }
}

/// Defaults, or the given file, plus environment overrides.
pub fn resolve_config(path: Option<&Path>) -> Result<InspectConfig> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => InspectConfig::default(),
    };
    apply_env_overrides(&mut config);
    config.trace_loaded();
    Ok(config)
}
