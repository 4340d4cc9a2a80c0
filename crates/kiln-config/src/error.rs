//! Error types for configuration resolution.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The template glob could not be parsed.
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    /// A directory matched by the template glob could not be read.
    #[error("failed to scan templates matching '{pattern}': {message}")]
    GlobScan { pattern: String, message: String },

    /// The favicon step needs a source image that is not on disk.
    #[error("favicon source image not found: {}", .0.display())]
    FaviconNotFound(PathBuf),

    /// A rule carries a test or exclude expression that does not compile.
    #[error("invalid rule pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A project setting holds a value the build cannot use.
    #[error("invalid setting '{field}': {message}")]
    InvalidSetting {
        field: &'static str,
        message: String,
        hint: Option<String>,
    },

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
