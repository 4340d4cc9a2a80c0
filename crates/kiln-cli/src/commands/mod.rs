//! Command implementations for the kiln CLI.
//!
//! - [`build`] - compile the project into the output directory
//! - [`dev`] - development server with live-reload
//! - [`inspect`] - print the resolved configuration
//!
//! Each command exposes an `execute` function taking its parsed arguments.

pub mod build;
pub mod dev;
pub mod inspect;
pub(crate) mod utils;

pub use build::execute as build_execute;
pub use dev::execute as dev_execute;
pub use inspect::execute as inspect_execute;
