//! Error type shared by both pipelines and the document-source contract.
//!
//! Missing *optional* artifacts (a directory without `OWNERS`, an absent
//! `OWNERS_ALIASES`, a unit without dropins) are never errors; they surface
//! as empty values. Everything in here aborts the whole run.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    /// The root directory or a designated input file does not exist.
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// A YAML document could not be parsed.
    #[error("failed to parse YAML in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A document parsed but does not fit the expected schema.
    #[error("schema error in {document}: {message}")]
    Schema { document: String, message: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external collaborator process failed.
    #[error("`{program}` failed: {message}")]
    Command { program: String, message: String },
}

impl InspectError {
    pub(crate) fn missing_segment(document: impl Into<String>, segment: &str) -> Self {
        InspectError::Schema {
            document: document.into(),
            message: format!("missing `{segment}`"),
        }
    }

    /// Maps a read failure onto `NotFound` when the file is simply absent.
    pub(crate) fn from_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            InspectError::NotFound { path }
        } else {
            InspectError::Io { path, source }
        }
    }
}
