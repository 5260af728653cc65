use std::path::PathBuf;

use thiserror::Error;

use crate::key::KeyParseError;

/// Errors produced while validating a save buffer and reading fields from it.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Buffer is shorter than the magic header or does not start with it.
    #[error("invalid save file: missing GVAS magic header ({len} bytes)")]
    InvalidHeader { len: usize },

    /// Marker bytes do not occur at or after `from`.
    ///
    /// This is an ordinary outcome (the item is simply not in this save).
    #[error("marker {marker} not found at or after offset {from}")]
    MarkerNotFound { marker: String, from: usize },

    /// A marker matched but the trailing field runs past the end of the buffer.
    #[error("truncated field at offset {offset}: need 4 bytes, {available} available")]
    TruncatedField { offset: usize, available: usize },

    /// Caller contract violation (empty needle, offset past the end).
    #[error("malformed input: {0}")]
    MalformedInput(&'static str),

    /// The save could not be read from disk.
    #[error("failed to read save file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScanError::MarkerNotFound { .. })
    }
}

/// Errors loading an item catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("catalog item {item:?} has an invalid key: {source}")]
    InvalidKey {
        item: String,
        #[source]
        source: KeyParseError,
    },
}
