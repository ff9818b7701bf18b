//! Store error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the result store, importer and whitelist.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The capture CSV could not be read.
    #[error("Failed to read capture {path}: {source}")]
    Csv {
        /// Capture file.
        path: PathBuf,
        /// The underlying CSV error.
        source: csv::Error,
    },

    /// No capture file matches the configured prefix.
    #[error("No capture file found for prefix {0}")]
    NoCapture(String),

    /// A MAC address failed validation.
    #[error("Invalid MAC address: {0}")]
    InvalidMac(String),
}
