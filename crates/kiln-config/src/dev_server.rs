//! Development server description.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::settings::DevServerSettings;

/// Text broadcast to connected clients when a watched file changes.
pub const CONTENT_CHANGED: &str = "content-changed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DevServerDescriptor {
    /// Absolute directory served as static content.
    pub content_base: PathBuf,
    pub port: u16,
    pub compress: bool,
    pub open: bool,
    pub watch: WatchSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WatchSpec {
    /// Globs relative to the project root.
    pub patterns: Vec<String>,
    pub options: WatchOptions,
    pub notification: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatchOptions {
    /// Stat every changed path before reporting it.
    pub always_stat: bool,
    pub follow_symlinks: bool,
    /// Suppress events for files that exist when watching starts.
    pub ignore_initial: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            always_stat: true,
            follow_symlinks: false,
            ignore_initial: true,
        }
    }
}

impl DevServerDescriptor {
    pub fn new(content_base: PathBuf, settings: &DevServerSettings) -> Self {
        Self {
            content_base,
            port: settings.port,
            compress: settings.compress,
            open: settings.open,
            watch: WatchSpec {
                patterns: settings.watch.clone(),
                options: WatchOptions::default(),
                notification: CONTENT_CHANGED.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_stock_server() {
        let descriptor =
            DevServerDescriptor::new(PathBuf::from("/site/public"), &DevServerSettings::default());
        assert_eq!(descriptor.port, 9001);
        assert!(descriptor.compress);
        assert!(descriptor.open);
        assert_eq!(descriptor.watch.patterns, vec!["src/**/*.html"]);
        assert_eq!(descriptor.watch.notification, "content-changed");

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["contentBase"], "/site/public");
        assert_eq!(json["watch"]["options"]["alwaysStat"], true);
        assert_eq!(json["watch"]["options"]["followSymlinks"], false);
        assert_eq!(json["watch"]["options"]["ignoreInitial"], true);
    }
}
