//! # contract: where input documents come from
//!
//! The pipelines never talk to a cluster. They consume a static text blob
//! handed over by a [`DocumentSource`]: a file, standard input, or a
//! cluster-query client living in the CLI crate.
//!
//! Implementations are responsible for producing well-formed text. They are
//! not responsible for authentication, retries or connectivity.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall` so tests can feed fixed documents.

use async_trait::async_trait;

use mockall::automock;

use crate::error::InspectError;

/// Raw text of one or more YAML/JSON documents plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Human-readable origin used in error messages (a path, `<stdin>`, a
    /// cluster resource).
    pub origin: String,
    pub text: String,
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch the full document text.
    async fn fetch(&self) -> Result<RawDocument, InspectError>;
}
