//! MachineConfig content extraction.
//!
//! Turns one or more MachineConfig documents into a flat, readable view of
//! the files and systemd units they would write to a node: every file source
//! is decoded (see [`crate::content`]) and keyed by its target path, every
//! unit and dropin keyed by where systemd would find it.
//!
//! # Input shapes
//! - a single MachineConfig, or several in one multi-document stream
//! - a `kind: List` (what `oc get mc -o yaml` prints), flattened to its items
//! - a `kind: ConfigMap` whose `data.config` embeds a MachineConfig, as stored
//!   for hosted-cluster node pools
//!
//! # Output
//! [`dispatch`] returns the extraction directly for one document and keyed
//! by `metadata.name` for several.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, error, info};

use crate::config::{MachineConfigSettings, MissingConfigPolicy, Sections};
use crate::content::decode_content;
use crate::contract::DocumentSource;
use crate::error::InspectError;
use crate::yaml::{load_all, null_as_default};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MachineConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: Option<MachineConfigSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MachineConfigSpec {
    #[serde(default)]
    pub config: Option<IgnitionConfig>,
}

/// The Ignition payload under `spec.config`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IgnitionConfig {
    #[serde(default)]
    pub storage: Option<Storage>,
    #[serde(default)]
    pub systemd: Option<Systemd>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    pub path: String,
    #[serde(default)]
    pub contents: Option<FileContents>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileContents {
    #[serde(default)]
    pub source: Option<String>,
    /// Carried for completeness; compressed payloads are not expanded.
    #[serde(default)]
    pub compression: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Systemd {
    #[serde(default, deserialize_with = "null_as_default")]
    pub units: Vec<Unit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Unit {
    pub name: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub contents: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dropins: Vec<Dropin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dropin {
    pub name: String,
    #[serde(default)]
    pub contents: Option<String>,
}

/// A decoded systemd unit plus its dropins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    pub dropins: BTreeMap<String, String>,
}

/// Extracted sections of one MachineConfig. A section that was not
/// requested is `None` and left out of the output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub systemd_units: Option<BTreeMap<String, UnitInfo>>,
}

/// Result of [`dispatch`]: unkeyed for a single document, keyed by name
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Extraction {
    Single(ExtractedContent),
    ByName(BTreeMap<String, ExtractedContent>),
}

impl MachineConfig {
    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }

    fn label(&self) -> String {
        self.name().unwrap_or("<unnamed MachineConfig>").to_string()
    }

    /// Resolves `spec.config`, applying the missing-config policy.
    fn ignition(&self, policy: MissingConfigPolicy) -> Result<Option<&IgnitionConfig>, InspectError> {
        let missing = match &self.spec {
            None => "spec",
            Some(MachineConfigSpec { config: None }) => "spec.config",
            Some(MachineConfigSpec { config: Some(config) }) => return Ok(Some(config)),
        };
        match policy {
            MissingConfigPolicy::Strict => {
                error!(machine_config = %self.label(), segment = missing, "MachineConfig has no config");
                Err(InspectError::missing_segment(self.label(), missing))
            }
            MissingConfigPolicy::Empty => {
                debug!(machine_config = %self.label(), segment = missing, "Treating missing config as empty");
                Ok(None)
            }
        }
    }
}

/// Maps each file's target path to its decoded content.
pub fn extract_files(
    doc: &MachineConfig,
    settings: &MachineConfigSettings,
) -> Result<BTreeMap<String, String>, InspectError> {
    let mut files = BTreeMap::new();
    let Some(storage) = doc
        .ignition(settings.missing_config)?
        .and_then(|config| config.storage.as_ref())
    else {
        return Ok(files);
    };

    for file in &storage.files {
        let Some(source) = file.contents.as_ref().and_then(|c| c.source.as_deref()) else {
            debug!(path = %file.path, "File has no contents source, skipping");
            continue;
        };
        if source.is_empty() {
            continue;
        }
        files.insert(file.path.clone(), decode_content(source));
    }
    Ok(files)
}

/// Maps each unit's target path to its decoded contents and dropins.
pub fn extract_systemd_units(
    doc: &MachineConfig,
    settings: &MachineConfigSettings,
) -> Result<BTreeMap<String, UnitInfo>, InspectError> {
    let mut units = BTreeMap::new();
    let Some(systemd) = doc
        .ignition(settings.missing_config)?
        .and_then(|config| config.systemd.as_ref())
    else {
        return Ok(units);
    };

    let root = &settings.systemd_root;
    for unit in &systemd.units {
        let unit_path = root.join(&unit.name);
        let dropin_dir = root.join(format!("{}.d", unit.name));

        let dropins = unit
            .dropins
            .iter()
            .map(|dropin| {
                (
                    path_key(&dropin_dir.join(&dropin.name)),
                    decode_content(dropin.contents.as_deref().unwrap_or_default()),
                )
            })
            .collect();

        let contents = unit
            .contents
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(decode_content);

        debug!(unit = %unit.name, enabled = ?unit.enabled, "Extracted systemd unit");
        units.insert(path_key(&unit_path), UnitInfo { contents, dropins });
    }
    Ok(units)
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Extracts the selected sections of one document.
pub fn extract(
    doc: &MachineConfig,
    settings: &MachineConfigSettings,
    sections: Sections,
) -> Result<ExtractedContent, InspectError> {
    let files = if sections.files() {
        Some(extract_files(doc, settings)?)
    } else {
        None
    };
    let systemd_units = if sections.units() {
        Some(extract_systemd_units(doc, settings)?)
    } else {
        None
    };
    Ok(ExtractedContent {
        files,
        systemd_units,
    })
}

/// Extracts both files and systemd units.
pub fn extract_all(
    doc: &MachineConfig,
    settings: &MachineConfigSettings,
) -> Result<ExtractedContent, InspectError> {
    extract(doc, settings, Sections::All)
}

/// Parses a YAML/JSON stream into MachineConfigs, unwrapping `List` and
/// `ConfigMap` wrappers.
pub fn parse_documents(text: &str, origin: &Path) -> Result<Vec<MachineConfig>, InspectError> {
    let mut out = Vec::new();
    for value in load_all(text, origin)? {
        unwrap_document(value, origin, &mut out)?;
    }
    info!(origin = %origin.display(), documents = out.len(), "Parsed MachineConfig documents");
    Ok(out)
}

fn unwrap_document(
    value: serde_yaml::Value,
    origin: &Path,
    out: &mut Vec<MachineConfig>,
) -> Result<(), InspectError> {
    let schema_error = |message: String| InspectError::Schema {
        document: origin.display().to_string(),
        message,
    };

    if !value.is_mapping() {
        return Err(schema_error("document is not a mapping".to_string()));
    }

    let kind = value
        .get("kind")
        .and_then(|k| k.as_str())
        .map(str::to_owned);
    match kind.as_deref() {
        Some("List") => {
            let items = value
                .get("items")
                .and_then(|items| items.as_sequence())
                .cloned()
                .unwrap_or_default();
            debug!(items = items.len(), "Unwrapping List document");
            for item in items {
                unwrap_document(item, origin, out)?;
            }
            Ok(())
        }
        Some("ConfigMap") => {
            let Some(embedded) = value
                .get("data")
                .and_then(|data| data.get("config"))
                .and_then(|config| config.as_str())
            else {
                return Err(InspectError::missing_segment(
                    origin.display().to_string(),
                    "data.config",
                ));
            };
            debug!("Unwrapping MachineConfig embedded in ConfigMap");
            for inner in load_all(embedded, origin)? {
                unwrap_document(inner, origin, out)?;
            }
            Ok(())
        }
        _ => {
            let doc: MachineConfig =
                serde_yaml::from_value(value).map_err(|e| schema_error(e.to_string()))?;
            out.push(doc);
            Ok(())
        }
    }
}

/// Extracts every document: unkeyed for one, keyed by `metadata.name` for
/// several, an empty mapping for none.
pub fn dispatch(
    docs: &[MachineConfig],
    settings: &MachineConfigSettings,
) -> Result<Extraction, InspectError> {
    if let [single] = docs {
        return Ok(Extraction::Single(extract(single, settings, settings.sections)?));
    }

    let mut by_name = BTreeMap::new();
    for (position, doc) in docs.iter().enumerate() {
        let Some(name) = doc.name() else {
            error!(position, "MachineConfig in a multi-document stream has no name");
            return Err(InspectError::missing_segment(
                format!("document #{}", position + 1),
                "metadata.name",
            ));
        };
        if by_name.contains_key(name) {
            error!(position, name, "Duplicate MachineConfig name in multi-document stream");
            return Err(InspectError::Schema {
                document: format!("document #{}", position + 1),
                message: format!("duplicate `metadata.name` `{name}`"),
            });
        }
        by_name.insert(name.to_string(), extract(doc, settings, settings.sections)?);
    }
    Ok(Extraction::ByName(by_name))
}

/// Parses `text` and runs [`dispatch`] over the result.
pub fn extract_from_str(
    text: &str,
    origin: &Path,
    settings: &MachineConfigSettings,
) -> Result<Extraction, InspectError> {
    let docs = parse_documents(text, origin)?;
    dispatch(&docs, settings)
}

/// Fetches documents from `source` and extracts them.
pub async fn extract_from_source<S>(
    source: &S,
    settings: &MachineConfigSettings,
) -> Result<Extraction, InspectError>
where
    S: DocumentSource + ?Sized,
{
    let raw = source.fetch().await?;
    info!(origin = %raw.origin, "Extracting MachineConfig content");
    extract_from_str(&raw.text, Path::new(&raw.origin), settings)
}
