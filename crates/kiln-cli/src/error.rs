//! Error handling for the Kiln CLI.
//!
//! `CliError` is what every command returns. Library errors convert into it
//! through `#[from]`, and messages that users can act on carry a `Hint:`
//! line.
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_template(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path).with_path(path)
//! }
//! ```

mod diagnostic;

use std::path::PathBuf;

use thiserror::Error;

pub use diagnostic::{bundler_error_to_miette, cli_error_to_miette};

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors (file not found, invalid syntax, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Build process errors
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Errors from the bundler, kept whole for diagnostic rendering
    #[error("{0}")]
    Bundler(#[from] kiln_bundler::Error),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Development server errors
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file passed with --config doesn't exist
    #[error("Config file not found: {}\n\nHint: Create a kiln.config.json file or fix the --config path", .0.display())]
    NotFound(PathBuf),

    /// Layered settings could not be extracted
    #[error("Invalid settings: {0}\n\nHint: Check kiln.config.json syntax and KILN_ environment variables")]
    Extract(String),

    /// Settings parsed but describe an unbuildable project
    #[error("Invalid value for '{field}': {message}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        message: String,
        hint: String,
    },

    /// The resolver rejected the project layout
    #[error("{0}\n\nHint: {hint}", hint = resolve_hint(.0))]
    Resolve(kiln_config::Error),

    /// I/O error while reading config
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Build process errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Output directory could not be cleaned before the build
    #[error("Failed to clean output directory {}: {source}\n\nHint: Check directory permissions", .path.display())]
    CleanFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A blocking build task panicked or was cancelled
    #[error("Build task failed: {0}")]
    TaskFailed(String),

    /// Generic build error
    #[error("{0}")]
    Custom(String),
}

impl From<kiln_config::Error> for ConfigError {
    fn from(err: kiln_config::Error) -> Self {
        match err {
            kiln_config::Error::InvalidSetting {
                field,
                message,
                hint,
            } => ConfigError::InvalidValue {
                field: field.to_string(),
                message,
                hint: hint.unwrap_or_else(|| "See kiln.config.json".to_string()),
            },
            other => ConfigError::Resolve(other),
        }
    }
}

impl From<kiln_config::Error> for CliError {
    fn from(err: kiln_config::Error) -> Self {
        CliError::Config(err.into())
    }
}

fn resolve_hint(err: &kiln_config::Error) -> &'static str {
    match err {
        kiln_config::Error::FaviconNotFound(_) => {
            "Add the logo image or point the 'favicon' setting at an existing file"
        }
        kiln_config::Error::InvalidGlob { .. } | kiln_config::Error::GlobScan { .. } => {
            "Check the 'templates' glob, e.g. \"./src/*.html\""
        }
        _ => "Check the project layout against kiln.config.json",
    }
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a `Hint:` line to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message with `msg`.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}
