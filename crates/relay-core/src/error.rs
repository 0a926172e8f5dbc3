use std::{fmt, path::PathBuf};

use thiserror::Error;

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Channel operation that produced a [`RelayError::Channel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOperation {
    Create,
    Fetch,
    Edit,
}

impl fmt::Display for ChannelOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Create => "create",
            Self::Fetch => "fetch",
            Self::Edit => "edit",
        };
        f.write_str(label)
    }
}

/// Failure taxonomy for the relay. None of these end the poll loop.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to fetch incidents: {0}")]
    SourceFetch(String),
    #[error("failed to read reconciliation snapshot {path}: {reason}")]
    StoreRead { path: PathBuf, reason: String },
    #[error("failed to write reconciliation snapshot {path}: {reason}")]
    StoreWrite { path: PathBuf, reason: String },
    #[error("channel {operation} failed: {reason}")]
    Channel {
        operation: ChannelOperation,
        reason: String,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RelayError {
    /// Builds a source error from any displayable cause, keeping its context chain.
    pub fn source_fetch(error: impl fmt::Display) -> Self {
        Self::SourceFetch(format!("{error:#}"))
    }

    pub fn channel(operation: ChannelOperation, error: impl fmt::Display) -> Self {
        Self::Channel {
            operation,
            reason: format!("{error:#}"),
        }
    }
}
