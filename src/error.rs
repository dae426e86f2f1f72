//! Error types for archive conversion
//!
//! Errors carry the context needed to reproduce a failure (file, line, url)
//! so that per-snapshot failures can be logged and skipped without aborting
//! the whole batch.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for conversion operations
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Error types for archive conversion
#[derive(Debug, Error)]
pub enum ConvertError {
    /// IO failure on a specific path
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO failure with no meaningful path (in-memory readers, sockets)
    #[error("IO error: {0}")]
    Stream(#[from] std::io::Error),

    /// A CDX line could not be parsed
    #[error("Malformed CDX line {line}: {reason}")]
    MalformedCdx { line: usize, reason: String },

    /// A WARC record could not be parsed
    #[error("Malformed WARC record at offset {offset}: {reason}")]
    MalformedWarc { offset: u64, reason: String },

    /// The embedded HTTP response could not be parsed
    #[error("Malformed HTTP response: {0}")]
    MalformedHttp(String),

    /// The forced-extension table could not be loaded
    #[error("Invalid forced-extension table at line {line}: {reason}")]
    ForcedExtensions { line: usize, reason: String },

    /// The URL exclusion filter could not be loaded
    #[error("Invalid exclusion filter {path}: {source}")]
    Filter {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The manifest could not be serialized or parsed
    #[error("Invalid manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A remote range request failed
    #[error("Failed to fetch {location}: {source}")]
    Fetch {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    /// A record's byte range does not fit in a 64-bit offset
    #[error("Byte range {offset}+{length} out of bounds for {location}")]
    InvalidRange { location: String, offset: u64, length: u64 },

    /// A remote range request returned a non-success status
    #[error("Fetching {location} returned HTTP {status}")]
    FetchStatus { location: String, status: u16 },

    /// A URL could not be parsed where one is required
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    /// An output path was assigned to a snapshot twice
    #[error("Output path already assigned for {0}")]
    PathAlreadyAssigned(String),

    /// HTML rewriting failed
    #[error("HTML rewrite error: {0}")]
    Rewrite(String),

    /// Configuration was rejected by the builder
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure inside a blocking task
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ConvertError {
    /// Build an `Io` error for the given path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only affects a single snapshot or input file
    ///
    /// Everything except configuration and table errors is recoverable at
    /// the batch level.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ConvertError::Config(_) | ConvertError::ForcedExtensions { .. } | ConvertError::Filter { .. }
        )
    }
}
