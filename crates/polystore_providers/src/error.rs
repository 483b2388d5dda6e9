//! Error taxonomy shared by all storage providers.

use std::fmt;
use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// The closed set of failure kinds surfaced by providers.
///
/// Callers are expected to branch on this rather than on error message text.
/// The set is deliberately closed: every backend failure, however exotic the
/// underlying library's error type, is classified into one of these kinds at
/// the point of occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad or missing setup. Fatal, detected as early as possible.
    Configuration,
    /// The underlying medium could not be reached or opened. Retryable at
    /// the caller's discretion; never retried internally.
    Connection,
    /// Record shape or value rejected. Never retried.
    Validation,
    /// I/O failure while writing records. Single attempt, surfaced as-is.
    Write,
    /// I/O failure while reading records. Single attempt, surfaced as-is.
    Read,
    /// Operation invoked in the wrong lifecycle state.
    State,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Connection => "connection",
            Self::Validation => "validation",
            Self::Write => "write",
            Self::Read => "read",
            Self::State => "state",
        };
        f.write_str(name)
    }
}

/// Errors produced by storage providers.
///
/// One variant per [`ErrorKind`]; the payload is a human-readable message
/// that already includes the relevant context (path, table, offending field).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Bad or missing setup for the chosen backend.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The underlying medium could not be reached or opened.
    #[error("connection error: {0}")]
    Connection(String),

    /// Record shape or value does not meet the established schema.
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O failure while writing records.
    #[error("write error: {0}")]
    Write(String),

    /// I/O failure while reading records.
    #[error("read error: {0}")]
    Read(String),

    /// Operation invoked in the wrong lifecycle state.
    #[error("state error: {0}")]
    State(String),
}

impl ProviderError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a write error.
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write(message.into())
    }

    /// Creates a read error.
    pub fn read(message: impl Into<String>) -> Self {
        Self::Read(message.into())
    }

    /// Creates a state error.
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Write(_) => ErrorKind::Write,
            Self::Read(_) => ErrorKind::Read,
            Self::State(_) => ErrorKind::State,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            ProviderError::validation("bad").kind(),
            ErrorKind::Validation
        );
        assert_eq!(ProviderError::read("gone").kind(), ErrorKind::Read);
        assert_eq!(ProviderError::state("closed").kind(), ErrorKind::State);
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = ProviderError::connection("file locked");
        assert_eq!(err.to_string(), "connection error: file locked");
    }
}
