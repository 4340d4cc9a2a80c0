//! Kiln CLI - front-end asset builds with a live-reloading dev server.
//!
//! # Architecture
//!
//! - [`cli`] - clap command definitions
//! - [`config`] - layered project settings (defaults, file, env, flags)
//! - [`commands`] - `build`, `dev` and `inspect`
//! - [`dev`] - static server, WebSocket push channel and file watchers
//! - [`error`] - CLI error types with actionable hints
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - terminal status lines and formatting

pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{BuildError, CliError, ConfigError, Result, ResultExt};
