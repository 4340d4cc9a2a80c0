//! Miette diagnostic conversion for CLI errors.

use ::miette::Report;

use crate::error::{BuildError, CliError};

/// Convert a `CliError` into a miette report.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Bundler(e) => bundler_error_to_miette(e),
        CliError::Build(e) => build_error_to_miette(e),
        CliError::Config(e) => ::miette::miette!("Configuration error: {}", e),
        _ => ::miette::miette!("{}", err),
    }
}

fn build_error_to_miette(err: BuildError) -> Report {
    ::miette::miette!("{}", err)
}

/// Bundler errors implement `Diagnostic`, so codes and help text survive.
pub fn bundler_error_to_miette(err: kiln_bundler::Error) -> Report {
    match err {
        kiln_bundler::Error::Config(config) => {
            cli_error_to_miette(CliError::Config(config.into()))
        }
        other => Report::new(other),
    }
}
