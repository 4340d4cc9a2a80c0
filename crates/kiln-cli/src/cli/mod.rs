//! Command-line interface definition.
//!
//! - `kiln build` - compile the project into the output directory
//! - `kiln dev` - build, serve and live-reload
//! - `kiln inspect` - print the resolved build configuration

mod commands;

use clap::Parser;

pub use commands::{BuildArgs, Command, CommonArgs, DevArgs, InspectArgs};

/// Kiln - front-end asset builds with a live-reloading dev server
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Front-end asset builds with a live-reloading dev server",
    long_about = "Kiln bundles scripts, compiles Sass, optimizes images, generates HTML\n\
                  pages and favicons, and serves the result with live-reload."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
