//! Project settings, layered from several sources.
//!
//! Priority, highest first: CLI flags > `KILN_` environment variables >
//! settings file > defaults.

mod loading;

pub use loading::{CONFIG_FILE, ENV_PREFIX, Overrides, load_settings};
