//! Project layout settings consumed by the resolver.
//!
//! Every field has a default that reproduces the stock project layout, so an
//! empty config file (or none at all) resolves to the standard contract.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Placeholder that expands to the entry name in output filenames.
pub const NAME_PLACEHOLDER: &str = "[name]";

/// Inputs the resolver treats as fixed for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ProjectSettings {
    /// Logical bundle name to entry script, relative to the project root.
    #[serde(default = "default_entry")]
    pub entry: IndexMap<String, String>,

    /// Output directory, relative to the project root.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// Bundle filename. `[name]` expands to the entry name.
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Glob that enumerates HTML page templates.
    #[serde(default = "default_templates")]
    pub templates: String,

    /// Source image for favicon generation.
    #[serde(default = "default_favicon")]
    pub favicon: PathBuf,

    /// Browserslist queries used for vendor prefixing.
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,

    #[serde(default)]
    pub dev_server: DevServerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DevServerSettings {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub compress: bool,

    #[serde(default = "default_true")]
    pub open: bool,

    /// Globs (relative to the project root) whose changes are broadcast
    /// to connected clients.
    #[serde(default = "default_watch")]
    pub watch: Vec<String>,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            out_dir: default_out_dir(),
            filename: default_filename(),
            templates: default_templates(),
            favicon: default_favicon(),
            browsers: default_browsers(),
            dev_server: DevServerSettings::default(),
        }
    }
}

impl Default for DevServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            compress: true,
            open: true,
            watch: default_watch(),
        }
    }
}

impl ProjectSettings {
    /// Reject settings that would make every build fail.
    pub fn validate(&self) -> Result<()> {
        if self.entry.is_empty() {
            return Err(Error::InvalidSetting {
                field: "entry",
                message: "at least one entry is required".to_string(),
                hint: Some(r#"Add an entry such as { "main": "./src/index.js" }"#.to_string()),
            });
        }

        if let Some((name, _)) = self.entry.iter().find(|(_, path)| path.trim().is_empty()) {
            return Err(Error::InvalidSetting {
                field: "entry",
                message: format!("entry '{}' has an empty path", name),
                hint: None,
            });
        }

        if self.filename.trim().is_empty() {
            return Err(Error::InvalidSetting {
                field: "filename",
                message: "output filename cannot be empty".to_string(),
                hint: Some("Use a name such as \"bundle.js\"".to_string()),
            });
        }

        if self.entry.len() > 1 && !self.filename.contains(NAME_PLACEHOLDER) {
            return Err(Error::InvalidSetting {
                field: "filename",
                message: format!(
                    "{} entries would all be written to '{}'",
                    self.entry.len(),
                    self.filename
                ),
                hint: Some("Include [name] in the filename, e.g. \"[name].bundle.js\"".to_string()),
            });
        }

        if self.dev_server.port == 0 {
            return Err(Error::InvalidSetting {
                field: "dev_server.port",
                message: "port must be between 1 and 65535".to_string(),
                hint: None,
            });
        }

        Ok(())
    }
}

pub fn default_entry() -> IndexMap<String, String> {
    let mut entry = IndexMap::new();
    entry.insert("main".to_string(), "./src/index.js".to_string());
    entry
}

pub fn default_out_dir() -> PathBuf {
    PathBuf::from("public")
}

pub fn default_filename() -> String {
    "bundle.js".to_string()
}

pub fn default_templates() -> String {
    "./src/*.html".to_string()
}

pub fn default_favicon() -> PathBuf {
    PathBuf::from("./src/images/icon.png")
}

pub fn default_browsers() -> Vec<String> {
    vec!["last 2 versions".to_string()]
}

pub fn default_port() -> u16 {
    9001
}

pub fn default_watch() -> Vec<String> {
    vec!["src/**/*.html".to_string()]
}

fn default_true() -> bool {
    true
}
