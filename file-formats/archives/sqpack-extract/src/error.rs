//! Error types for patch extraction

use std::io;
use thiserror::Error;

/// Result type alias for extraction operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for extraction operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Manifest (de)serialization failed
    #[error("Manifest serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Version string did not split into five fixed-width numeric parts
    #[error("Malformed version '{0}'")]
    MalformedVersion(String),

    /// Index blob does not start with the SqPack magic
    #[error("Not an SqPack archive: {0}")]
    NotAnArchive(String),

    /// Structurally invalid binary data
    #[error("Invalid SqPack format: {0}")]
    InvalidFormat(String),

    /// Block decompression failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// Decoded entry length differs from the declared size
    #[error("Invalid file size: expected {expected}, got {actual}")]
    InvalidFileSize {
        /// Size declared by the entry header
        expected: u64,
        /// Size actually produced
        actual: u64,
    },

    /// Data entry type other than standard
    #[error("Unsupported data entry type {0}")]
    UnsupportedEntryType(u32),

    /// Patch target path could not be mapped to a shard
    #[error("Invalid shard path: {0}")]
    InvalidShardPath(String),

    /// Blob missing from the content store
    #[error("Blob not found in content store: {0}")]
    BlobNotFound(String),

    /// The sheet list file could not be resolved for a version
    #[error("Root sheet list {path} not found for version {version}")]
    MissingRootManifest {
        /// Logical path of the sheet list
        path: String,
        /// Target version of the batch
        version: String,
    },

    /// A logical path could not be resolved by any tier
    #[error("Unresolved logical path {path} (category {category:06x})")]
    UnresolvedLogicalPath {
        /// Logical path that was requested
        path: String,
        /// Category the path belongs to
        category: u32,
    },
}

impl Error {
    /// Create a new InvalidFormat error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Error::InvalidFormat(msg.into())
    }

    /// Create a new Compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Error::Compression(msg.into())
    }

    /// Check if this error indicates corrupted input data
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::NotAnArchive(_)
                | Error::InvalidFormat(_)
                | Error::Compression(_)
                | Error::InvalidFileSize { .. }
        )
    }

    /// Check if the pipeline recovers from this error locally
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NotAnArchive(_)
                | Error::UnresolvedLogicalPath { .. }
                | Error::UnsupportedEntryType(_)
                | Error::InvalidShardPath(_)
        )
    }
}
