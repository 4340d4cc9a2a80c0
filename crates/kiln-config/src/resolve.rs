//! Build configuration resolution.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use path_clean::PathClean;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dev_server::DevServerDescriptor;
use crate::error::Result;
use crate::mode::BuildMode;
use crate::optimization::Optimization;
use crate::plugins::{self, PluginDescriptor};
use crate::rules::{self, Rule, RuleSet};
use crate::settings::{NAME_PLACEHOLDER, ProjectSettings};

/// Everything a build pass needs, fixed at resolution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    pub mode: BuildMode,

    /// Absolute project root. Every relative path below is joined onto it.
    pub context: PathBuf,

    pub entry: IndexMap<String, PathBuf>,
    pub output: OutputTarget,
    pub module: ModuleRules,
    pub plugins: Vec<PluginDescriptor>,
    pub optimization: Optimization,
    pub dev_server: DevServerDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutputTarget {
    /// Absolute output directory.
    pub path: PathBuf,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModuleRules {
    pub rules: Vec<Rule>,
}

/// Resolve `settings` for `mode` against the project at `root`.
///
/// The only filesystem access is the template glob scan and the favicon
/// existence check. Identical inputs on an unchanged tree give identical
/// output.
pub fn resolve(mode: BuildMode, root: &Path, settings: &ProjectSettings) -> Result<BuildConfig> {
    settings.validate()?;

    let context = std::path::absolute(root)?.clean();

    let entry = settings
        .entry
        .iter()
        .map(|(name, path)| (name.clone(), Path::new(path).clean()))
        .collect();

    let out_dir = context.join(&settings.out_dir).clean();

    let templates = plugins::discover_templates(&context, &settings.templates)?;
    let mut plugin_list = vec![PluginDescriptor::css_extract()];
    plugin_list.extend(plugins::html_plugins(&templates));
    plugin_list.push(plugins::favicon_plugin(&context, &settings.favicon)?);

    let config = BuildConfig {
        mode,
        context,
        entry,
        output: OutputTarget {
            path: out_dir.clone(),
            filename: settings.filename.clone(),
        },
        module: ModuleRules {
            rules: rules::build_rules(mode, &settings.browsers),
        },
        plugins: plugin_list,
        optimization: Optimization::for_mode(mode),
        dev_server: DevServerDescriptor::new(out_dir, &settings.dev_server),
    };

    tracing::debug!(
        mode = %config.mode,
        entries = config.entry.len(),
        pages = templates.len(),
        "resolved build configuration"
    );

    Ok(config)
}

impl BuildConfig {
    /// Pretty JSON with a stable field order.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn rule_set(&self) -> Result<RuleSet> {
        RuleSet::compile(&self.module.rules)
    }

    /// Bundle filename for the entry called `name`.
    pub fn bundle_filename(&self, name: &str) -> String {
        self.output.filename.replace(NAME_PLACEHOLDER, name)
    }

    /// Extracted stylesheet filename for the entry called `name`.
    pub fn css_filename(&self, name: &str) -> Option<String> {
        self.plugins.iter().find_map(|plugin| match plugin {
            PluginDescriptor::CssExtract { filename, .. } => {
                Some(filename.replace(NAME_PLACEHOLDER, name))
            }
            _ => None,
        })
    }

    /// `(output filename, template path)` for every generated page.
    pub fn html_pages(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.plugins.iter().filter_map(|plugin| match plugin {
            PluginDescriptor::Html { filename, template } => {
                Some((filename.as_str(), template.as_path()))
            }
            _ => None,
        })
    }

    pub fn favicon_logo(&self) -> Option<&Path> {
        self.plugins.iter().find_map(|plugin| match plugin {
            PluginDescriptor::Favicons { logo } => Some(logo.as_path()),
            _ => None,
        })
    }

    /// Project-relative form of `path` with `/` separators, as rules see it.
    pub fn resource_name(&self, path: &Path) -> String {
        match path.strip_prefix(&self.context) {
            Ok(relative) => relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => path.to_string_lossy().replace('\\', "/"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let images = dir.path().join("src/images");
        fs::create_dir_all(&images).unwrap();
        fs::write(images.join("icon.png"), b"png").unwrap();
        fs::write(dir.path().join("src/index.html"), "<html></html>").unwrap();
        dir
    }

    #[test]
    fn bundle_filename_expands_name() {
        let dir = project();
        let mut settings = ProjectSettings::default();
        settings.filename = "[name].bundle.js".to_string();
        let config = resolve(BuildMode::Production, dir.path(), &settings).unwrap();
        assert_eq!(config.bundle_filename("main"), "main.bundle.js");
        assert_eq!(config.css_filename("main").as_deref(), Some("main.css"));
    }

    #[test]
    fn entries_are_cleaned() {
        let dir = project();
        let config = resolve(BuildMode::Development, dir.path(), &ProjectSettings::default()).unwrap();
        assert_eq!(config.entry["main"], PathBuf::from("src/index.js"));
        assert!(config.output.path.is_absolute());
        assert!(config.output.path.ends_with("public"));
    }

    #[test]
    fn resource_name_is_relative_with_forward_slashes() {
        let dir = project();
        let config = resolve(BuildMode::Development, dir.path(), &ProjectSettings::default()).unwrap();
        let path = config.context.join("src").join("images").join("a.png");
        assert_eq!(config.resource_name(&path), "src/images/a.png");
    }

    #[test]
    fn invalid_settings_fail_resolution() {
        let dir = project();
        let mut settings = ProjectSettings::default();
        settings.filename = String::new();
        assert!(resolve(BuildMode::Production, dir.path(), &settings).is_err());
    }
}
