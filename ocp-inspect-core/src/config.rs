use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Everything the pipelines would otherwise read from ambient defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InspectConfig {
    pub owners: OwnersSettings,
    pub machine_config: MachineConfigSettings,
    pub cluster: ClusterSettings,
}

impl InspectConfig {
    pub fn trace_loaded(&self) {
        info!(
            owners_file_name = %self.owners.owners_file_name,
            excluded_dirs = ?self.owners.excluded_dirs,
            systemd_root = %self.machine_config.systemd_root.display(),
            missing_config = ?self.machine_config.missing_config,
            "Loaded InspectConfig"
        );
        debug!(?self, "InspectConfig loaded (full debug)");
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OwnersSettings {
    pub owners_file_name: String,
    pub aliases_file_name: String,
    /// Directory names never descended into.
    pub excluded_dirs: Vec<String>,
}

impl Default for OwnersSettings {
    fn default() -> Self {
        Self {
            owners_file_name: "OWNERS".to_string(),
            aliases_file_name: "OWNERS_ALIASES".to_string(),
            excluded_dirs: vec![".git".to_string(), "vendor".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MachineConfigSettings {
    pub systemd_root: PathBuf,
    pub missing_config: MissingConfigPolicy,
    pub sections: Sections,
}

impl Default for MachineConfigSettings {
    fn default() -> Self {
        Self {
            systemd_root: PathBuf::from("/etc/systemd/system"),
            missing_config: MissingConfigPolicy::default(),
            sections: Sections::default(),
        }
    }
}

/// What to do with a MachineConfig that has no `spec.config` at all.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MissingConfigPolicy {
    /// Abort with a schema error naming the missing segment.
    #[default]
    Strict,
    /// Treat the document as declaring no files and no units.
    Empty,
}

/// Which sections of a MachineConfig to extract.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sections {
    Files,
    Units,
    #[default]
    All,
}

impl Sections {
    pub fn files(self) -> bool {
        matches!(self, Sections::Files | Sections::All)
    }

    pub fn units(self) -> bool {
        matches!(self, Sections::Units | Sections::All)
    }
}

impl From<&str> for Sections {
    fn from(s: &str) -> Self {
        match s {
            "files" | "Files" => Sections::Files,
            "units" | "Units" | "systemd" | "systemd_units" => Sections::Units,
            "all" | "All" => Sections::All,
            other => {
                tracing::warn!(sections = other, "Unknown section selection, defaulting to all");
                Sections::All
            }
        }
    }
}

/// Settings for the `oc` collaborator used to fetch live documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusterSettings {
    pub oc_binary: String,
    pub namespace: Option<String>,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            oc_binary: "oc".to_string(),
            namespace: None,
        }
    }
}
