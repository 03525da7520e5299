//! Small YAML helpers shared by the OWNERS and MachineConfig loaders.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::error::InspectError;

/// Treats an explicit `null` the same as an absent key.
///
/// OWNERS files in the wild often carry `reviewers:` with no entries, which
/// YAML reads as `null` rather than an empty sequence.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parses every non-null document in a (possibly multi-document) YAML stream.
pub fn load_all(text: &str, origin: &Path) -> Result<Vec<serde_yaml::Value>, InspectError> {
    let mut documents = Vec::new();
    if text.trim().is_empty() {
        return Ok(documents);
    }
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = serde_yaml::Value::deserialize(document).map_err(|source| {
            InspectError::Parse {
                path: origin.to_path_buf(),
                source,
            }
        })?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Deserializes the first document of a YAML stream, or `T::default()` when
/// the stream holds no document at all (empty or comment-only files).
pub fn load_first<T>(text: &str, origin: &Path) -> Result<T, InspectError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    let Some(first) = load_all(text, origin)?.into_iter().next() else {
        return Ok(T::default());
    };
    serde_yaml::from_value(first).map_err(|source| InspectError::Parse {
        path: origin.to_path_buf(),
        source,
    })
}

/// Renders any aggregation result as the YAML document printed on stdout.
pub fn to_yaml<T: Serialize>(value: &T) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(value)
}
