//! Error type surfaced by the store facade.

use polystore_providers::{BackendKind, ErrorKind, ProviderError};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by a [`crate::Store`].
///
/// Provider failures keep their original kind; the store only attaches the
/// backend that produced them, so a caller juggling several stores can tell
/// which backend failed. Branch on [`StoreError::kind`] rather than matching
/// variants.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Bad or missing setup, rejected at store construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A provider operation failed.
    #[error("{backend} backend: {source}")]
    Backend {
        /// The backend that produced the failure.
        backend: BackendKind,
        /// The provider's classified error.
        #[source]
        source: ProviderError,
    },

    /// Record set rejected before it reached the backend.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation invoked on a store that has been closed.
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns the error's kind from the shared taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Backend { source, .. } => source.kind(),
            Self::Validation(_) => ErrorKind::Validation,
            Self::Closed => ErrorKind::State,
        }
    }

    /// Returns the backend that produced the error, if any.
    #[must_use]
    pub fn backend(&self) -> Option<BackendKind> {
        match self {
            Self::Backend { backend, .. } => Some(*backend),
            _ => None,
        }
    }
}
