//! Build configuration resolver for kiln.
//!
//! [`resolve`] turns a [`BuildMode`] and [`ProjectSettings`] into an
//! immutable [`BuildConfig`]: entry points, the output target, per-file-type
//! rules, post-transform plugins, minimizer settings and the dev server
//! description. The result serializes deterministically, so it can be
//! inspected, diffed and handed to a build runner as plain data.

pub mod dev_server;
pub mod error;
pub mod mode;
pub mod optimization;
pub mod plugins;
pub mod resolve;
pub mod rules;
pub mod settings;

pub use dev_server::{CONTENT_CHANGED, DevServerDescriptor, WatchOptions, WatchSpec};
pub use error::{Error, Result};
pub use mode::BuildMode;
pub use optimization::{CompressSettings, Minimizer, Optimization};
pub use plugins::PluginDescriptor;
pub use resolve::{BuildConfig, ModuleRules, OutputTarget, resolve};
pub use rules::{
    LoaderStep, MozjpegOptions, PostcssPlugin, Rule, RuleCategory, RuleSet, build_rules,
};
pub use settings::{DevServerSettings, NAME_PLACEHOLDER, ProjectSettings};
