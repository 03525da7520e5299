//! OWNERS aggregation: reverse index of approvers/reviewers over a source tree.
//!
//! Walks a checkout, loads every `OWNERS` file, and answers "which OWNERS
//! files name this identity?" for approvers and reviewers separately. Aliases
//! from `OWNERS_ALIASES` are expanded for every alias that is actually used.
//!
//! # Major Types
//! - [`OwnersDocument`]: one parsed OWNERS file
//! - [`AliasTable`]: alias name to member set
//! - [`AggregationIndex`]: the output of [`aggregate`]
//!
//! # Missing vs malformed
//! A directory without an OWNERS file, or a root without OWNERS_ALIASES, is
//! "no owners declared here". A file that exists but is not valid YAML aborts
//! the run with [`InspectError::Parse`] naming that file.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::config::OwnersSettings;
use crate::error::InspectError;
use crate::yaml::{load_first, null_as_default};

/// One `filters` entry: owners scoped to a path pattern.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OwnersFilter {
    /// Path regex; set from the mapping key in the Prow-style shape.
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub approvers: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reviewers: Vec<String>,
}

/// `filters` is written either as a list of filter objects or as a mapping
/// from path regex to filter object.
#[derive(Deserialize)]
#[serde(untagged)]
enum FiltersYaml {
    List(Vec<OwnersFilter>),
    ByPattern(BTreeMap<String, Option<OwnersFilter>>),
}

fn deserialize_filters<'de, D>(deserializer: D) -> Result<Vec<OwnersFilter>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let filters = match Option::<FiltersYaml>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(FiltersYaml::List(list)) => list,
        Some(FiltersYaml::ByPattern(by_pattern)) => by_pattern
            .into_iter()
            .map(|(pattern, filter)| OwnersFilter {
                pattern: Some(pattern),
                ..filter.unwrap_or_default()
            })
            .collect(),
    };
    Ok(filters)
}

/// The parsed content of one OWNERS file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OwnersDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub approvers: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reviewers: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_filters")]
    pub filters: Vec<OwnersFilter>,
}

impl OwnersDocument {
    /// Effective owners: the union across filters when any are declared,
    /// otherwise the direct lists.
    pub fn effective(&self) -> OwnerSet {
        if self.filters.is_empty() {
            return OwnerSet {
                approvers: self.approvers.iter().cloned().collect(),
                reviewers: self.reviewers.iter().cloned().collect(),
            };
        }
        let mut owners = OwnerSet::default();
        for filter in &self.filters {
            owners.approvers.extend(filter.approvers.iter().cloned());
            owners.reviewers.extend(filter.reviewers.iter().cloned());
        }
        owners
    }

    fn validate(&self, path: &Path) -> Result<(), InspectError> {
        for pattern in self.filters.iter().filter_map(|f| f.pattern.as_deref()) {
            if let Err(e) = Regex::new(pattern) {
                error!(path = %path.display(), pattern, error = %e, "Invalid filter pattern");
                return Err(InspectError::Schema {
                    document: path.display().to_string(),
                    message: format!("invalid filter pattern `{pattern}`: {e}"),
                });
            }
        }
        Ok(())
    }
}

/// Deduplicated, sorted approvers and reviewers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OwnerSet {
    pub approvers: BTreeSet<String>,
    pub reviewers: BTreeSet<String>,
}

impl OwnerSet {
    pub fn is_empty(&self) -> bool {
        self.approvers.is_empty() && self.reviewers.is_empty()
    }
}

/// Alias name to its members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    aliases: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Default, Deserialize)]
struct AliasesYaml {
    #[serde(default, deserialize_with = "null_as_default")]
    aliases: BTreeMap<String, Option<Vec<String>>>,
}

impl AliasTable {
    pub fn get(&self, alias: &str) -> Option<&BTreeSet<String>> {
        self.aliases.get(alias)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl FromIterator<(String, BTreeSet<String>)> for AliasTable {
    fn from_iter<I: IntoIterator<Item = (String, BTreeSet<String>)>>(iter: I) -> Self {
        Self {
            aliases: iter.into_iter().collect(),
        }
    }
}

/// The reverse index produced by [`aggregate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationIndex {
    /// Non-top-level OWNERS files, in discovery order.
    pub owners_files: Vec<PathBuf>,
    pub approvers_by_identity: BTreeMap<String, Vec<PathBuf>>,
    pub reviewers_by_identity: BTreeMap<String, Vec<PathBuf>>,
    pub top_level_owners: OwnerSet,
    /// Only aliases referenced somewhere; members sorted ascending.
    pub alias_expansion: BTreeMap<String, Vec<String>>,
}

fn ensure_root(root: &Path) -> Result<(), InspectError> {
    if !root.is_dir() {
        error!(root = %root.display(), "OWNERS root does not exist or is not a directory");
        return Err(InspectError::NotFound {
            path: root.to_path_buf(),
        });
    }
    Ok(())
}

/// Reads an optional file; `Ok(None)` when it does not exist.
fn read_optional(path: &Path) -> Result<Option<String>, InspectError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Optional file absent");
            Ok(None)
        }
        Err(e) => {
            error!(path = %path.display(), error = ?e, "Failed to read file");
            Err(InspectError::from_read(path, e))
        }
    }
}

/// Loads one OWNERS file. A missing file is an empty document.
pub fn load_owners_file(path: &Path) -> Result<OwnersDocument, InspectError> {
    let Some(text) = read_optional(path)? else {
        return Ok(OwnersDocument::default());
    };
    let document: OwnersDocument = load_first(&text, path)?;
    document.validate(path)?;
    Ok(document)
}

/// Recursively finds every OWNERS file below `root`.
///
/// Excluded directories are pruned before the walk enters them. Siblings are
/// visited in file-name order so repeated runs discover files identically.
pub fn discover(root: &Path, settings: &OwnersSettings) -> Result<Vec<PathBuf>, InspectError> {
    ensure_root(root)?;
    let excluded: BTreeSet<&str> = settings.excluded_dirs.iter().map(String::as_str).collect();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let skip = entry.depth() > 0
                && entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| excluded.contains(name));
            if skip {
                debug!(path = %entry.path().display(), "Skipping directory");
            }
            !skip
        });

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            error!(error = ?e, "Failed while walking directory tree");
            let path = e.path().unwrap_or(root).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
            InspectError::Io { path, source }
        })?;
        if entry.file_type().is_file() && entry.file_name() == settings.owners_file_name.as_str() {
            debug!(path = %entry.path().display(), "Found OWNERS file");
            found.push(entry.into_path());
        }
    }
    info!(root = %root.display(), count = found.len(), "Discovered OWNERS files");
    Ok(found)
}

/// Loads `<root>/OWNERS`, collapsing `filters` into their union.
pub fn load_top_level(root: &Path, settings: &OwnersSettings) -> Result<OwnerSet, InspectError> {
    ensure_root(root)?;
    let document = load_owners_file(&root.join(&settings.owners_file_name))?;
    Ok(document.effective())
}

/// Loads `<root>/OWNERS_ALIASES`. Missing file or missing `aliases` key is an
/// empty table.
pub fn load_aliases(root: &Path, settings: &OwnersSettings) -> Result<AliasTable, InspectError> {
    ensure_root(root)?;
    let path = root.join(&settings.aliases_file_name);
    let Some(text) = read_optional(&path)? else {
        return Ok(AliasTable::default());
    };
    let parsed: AliasesYaml = load_first(&text, &path)?;
    let table: AliasTable = parsed
        .aliases
        .into_iter()
        .map(|(alias, members)| (alias, members.unwrap_or_default().into_iter().collect()))
        .collect();
    info!(path = %path.display(), aliases = table.len(), "Loaded OWNERS_ALIASES");
    Ok(table)
}

/// Builds the full [`AggregationIndex`] for a tree.
pub fn aggregate(root: &Path, settings: &OwnersSettings) -> Result<AggregationIndex, InspectError> {
    info!(root = %root.display(), "Aggregating OWNERS files");
    let top_level_path = root.join(&settings.owners_file_name);
    let top_level_owners = load_top_level(root, settings)?;
    let aliases = load_aliases(root, settings)?;

    let mut index = AggregationIndex {
        top_level_owners,
        ..AggregationIndex::default()
    };

    for path in discover(root, settings)? {
        if path == top_level_path {
            continue;
        }
        let owners = load_owners_file(&path)?.effective();
        debug!(
            path = %path.display(),
            approvers = owners.approvers.len(),
            reviewers = owners.reviewers.len(),
            "Loaded OWNERS file"
        );
        for approver in owners.approvers {
            index
                .approvers_by_identity
                .entry(approver)
                .or_default()
                .push(path.clone());
        }
        for reviewer in owners.reviewers {
            index
                .reviewers_by_identity
                .entry(reviewer)
                .or_default()
                .push(path.clone());
        }
        index.owners_files.push(path);
    }

    let identities = index
        .approvers_by_identity
        .keys()
        .chain(index.reviewers_by_identity.keys())
        .chain(index.top_level_owners.approvers.iter())
        .chain(index.top_level_owners.reviewers.iter());
    for identity in identities {
        if let Some(members) = aliases.get(identity) {
            index
                .alias_expansion
                .insert(identity.clone(), members.iter().cloned().collect());
        }
    }

    info!(
        files = index.owners_files.len(),
        approvers = index.approvers_by_identity.len(),
        reviewers = index.reviewers_by_identity.len(),
        aliases_expanded = index.alias_expansion.len(),
        "OWNERS aggregation complete"
    );
    Ok(index)
}
