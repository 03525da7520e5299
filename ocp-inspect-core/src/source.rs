use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::{error, info};

use crate::contract::{DocumentSource, RawDocument};
use crate::error::InspectError;

/// Sentinel that selects standard input.
pub const STDIN_SENTINEL: &str = "-";

/// Where a [`FileSource`] reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLocation {
    Stdin,
    Path(PathBuf),
}

impl From<&str> for InputLocation {
    fn from(s: &str) -> Self {
        if s == STDIN_SENTINEL {
            InputLocation::Stdin
        } else {
            InputLocation::Path(PathBuf::from(s))
        }
    }
}

/// Reads documents from a file or from standard input.
pub struct FileSource {
    location: InputLocation,
}

impl FileSource {
    pub fn new(location: InputLocation) -> Self {
        Self { location }
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    async fn fetch(&self) -> Result<RawDocument, InspectError> {
        match &self.location {
            InputLocation::Stdin => {
                let mut text = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut text)
                    .await
                    .map_err(|e| {
                        error!(error = ?e, "Failed to read standard input");
                        InspectError::Io {
                            path: PathBuf::from(STDIN_SENTINEL),
                            source: e,
                        }
                    })?;
                info!(bytes = text.len(), "Read documents from standard input");
                Ok(RawDocument {
                    origin: "<stdin>".to_string(),
                    text,
                })
            }
            InputLocation::Path(path) => {
                let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                    error!(error = ?e, path = %path.display(), "Failed to read input file");
                    InspectError::from_read(path.clone(), e)
                })?;
                info!(path = %path.display(), bytes = text.len(), "Read documents from file");
                Ok(RawDocument {
                    origin: path.display().to_string(),
                    text,
                })
            }
        }
    }
}
