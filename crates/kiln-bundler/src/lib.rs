//! # kiln-bundler
//!
//! Runs a resolved [`kiln_config::BuildConfig`]: discovers the module graph
//! from each entry, pushes every file through the loader steps its rules
//! select, links ES modules into a single script per entry, and applies the
//! CSS extraction, HTML and favicon plugins.
//!
//! ```no_run
//! use kiln_bundler::Compiler;
//! use kiln_config::{BuildMode, ProjectSettings, resolve};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = resolve(BuildMode::Production, Path::new("."), &ProjectSettings::default())?;
//! let output = Compiler::new(config).compile()?;
//! output.write_to(Path::new("public"))?;
//! # Ok(()) }
//! ```

pub mod compiler;
pub mod graph;
pub mod hash;
pub mod linker;
pub mod loaders;
pub mod minify;
pub mod output;
pub mod plugins;
pub mod runtime;

pub use compiler::Compiler;
pub use output::{BuildOutput, OutputFile, OutputKind};

/// Error types for kiln-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The build configuration could not be used.
    #[error("Invalid configuration: {0}")]
    Config(#[from] kiln_config::Error),

    /// An import specifier could not be mapped to a file.
    #[error("Cannot resolve '{specifier}' from {importer}")]
    Resolution { specifier: String, importer: String },

    /// A file could not be parsed.
    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// A loader step failed on a file.
    #[error("{step} failed on {path}: {message}")]
    Transform {
        step: &'static str,
        path: String,
        message: String,
    },

    /// No rule turned the file into a module.
    #[error("No rule handles {0}")]
    UnhandledFile(String),

    /// Two outputs would share one filename.
    #[error("Output conflict: {0}")]
    OutputConflict(String),

    /// Minification failed on the assembled bundle.
    #[error("Minify failed for {filename}: {message}")]
    Minify { filename: String, message: String },

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// I/O error with context message.
    #[error("{message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for kiln-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn read(path: &std::path::Path, source: std::io::Error) -> Self {
        Error::IoError {
            message: format!("Failed to read {}: {}", path.display(), source),
            source,
        }
    }

    pub(crate) fn transform(
        step: &'static str,
        path: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Error::Transform {
            step,
            path: path.into(),
            message: message.to_string(),
        }
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Config(_) => "INVALID_CONFIG",
            Error::Resolution { .. } => "UNRESOLVED_IMPORT",
            Error::Parse { .. } => "PARSE_ERROR",
            Error::Transform { .. } => "TRANSFORM_ERROR",
            Error::UnhandledFile(_) => "UNHANDLED_FILE",
            Error::OutputConflict(_) => "OUTPUT_CONFLICT",
            Error::Minify { .. } => "MINIFY_ERROR",
            Error::InvalidOutputPath(_) => "INVALID_OUTPUT_PATH",
            Error::WriteFailure(_) => "WRITE_FAILURE",
            Error::IoError { .. } | Error::Io(_) => "IO_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Resolution { specifier, .. } if !specifier.starts_with('.') => {
                Some(Box::new(format!(
                    "'{}' is a package specifier. Only relative imports ('./', '../') are bundled.",
                    specifier
                )))
            }
            Error::Resolution { .. } => Some(Box::new(
                "Check that the file exists. Extensionless imports try '.js' and '/index.js'.",
            )),
            Error::UnhandledFile(path) => Some(Box::new(format!(
                "Imported files need a matching rule. '{}' matched none that produce a module.",
                path
            ))),
            Error::OutputConflict(_) => Some(Box::new(
                "Include [name] in the output filename when building several entries.",
            )),
            Error::InvalidOutputPath(path) => Some(Box::new(format!(
                "The output path '{}' is invalid. Ensure it stays inside the output directory.",
                path
            ))),
            Error::WriteFailure(msg) => Some(Box::new(format!(
                "Failed to write file. Check disk space and permissions.\nError: {}",
                msg
            ))),
            _ => None,
        }
    }
}
