use std::path::PathBuf;

use clap::{Args, Subcommand};
use kiln_config::BuildMode;

/// Available Kiln subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the project into the output directory
    ///
    /// Resolves the build configuration for the selected mode, compiles
    /// every entry, page and asset, and writes the result as one set.
    Build(BuildArgs),

    /// Start the development server
    ///
    /// Builds once, serves the output directory, and pushes reload
    /// notifications to connected browsers when watched files change.
    Dev(DevArgs),

    /// Print the resolved build configuration as JSON
    Inspect(InspectArgs),
}

/// Arguments shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Build mode. Only `development` selects a development build.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Project root. Defaults to the current directory.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Settings file. Defaults to kiln.config.json in the project root.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Extra arguments, accepted and passed through unchecked
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "ARGS"
    )]
    pub passthrough: Vec<String>,
}

impl CommonArgs {
    /// The `--mode` flag, else whatever the passthrough arguments say.
    pub fn build_mode(&self) -> BuildMode {
        match &self.mode {
            Some(mode) => BuildMode::from_flag(Some(mode.as_str())),
            None => BuildMode::from_args(&self.passthrough),
        }
    }

    pub fn project_root(&self) -> PathBuf {
        self.cwd.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Arguments for the build command
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Remove the output directory before writing
    #[arg(long)]
    pub clean: bool,
}

/// Arguments for the dev command
#[derive(Args, Debug, Clone)]
pub struct DevArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Port to listen on (overrides dev_server.port)
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Do not open a browser
    #[arg(long)]
    pub no_open: bool,
}

/// Arguments for the inspect command
#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}
