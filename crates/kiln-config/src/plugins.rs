//! Post-transform plugin descriptors.

use std::path::{Path, PathBuf};

use path_clean::PathClean;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CSS_FILENAME: &str = "[name].css";
pub const CSS_CHUNK_FILENAME: &str = "[id].css";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "plugin", rename_all = "kebab-case")]
pub enum PluginDescriptor {
    /// Collect extracted CSS into one sheet per bundle.
    CssExtract {
        filename: String,
        #[serde(rename = "chunkFilename")]
        chunk_filename: String,
    },

    /// Emit `filename` from `template`, with bundle tags injected.
    Html { filename: String, template: PathBuf },

    /// Generate icons and a web manifest from `logo`.
    Favicons { logo: PathBuf },
}

impl PluginDescriptor {
    pub fn css_extract() -> Self {
        PluginDescriptor::CssExtract {
            filename: CSS_FILENAME.to_string(),
            chunk_filename: CSS_CHUNK_FILENAME.to_string(),
        }
    }
}

/// Expand `pattern` under `root` and return matching templates sorted by path.
///
/// Returned paths are relative to `root`.
pub fn discover_templates(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let relative = pattern.trim_start_matches("./");
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        relative
    );

    let paths = glob::glob(&full).map_err(|e| Error::InvalidGlob {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut templates = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| Error::GlobScan {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        if !path.is_file() {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        templates.push(relative);
    }
    templates.sort();

    tracing::debug!(pattern, count = templates.len(), "discovered templates");
    Ok(templates)
}

/// One HTML plugin per template. Output names mirror template base names.
pub fn html_plugins(templates: &[PathBuf]) -> Vec<PluginDescriptor> {
    templates
        .iter()
        .filter_map(|template| {
            let filename = template.file_name()?.to_string_lossy().into_owned();
            Some(PluginDescriptor::Html {
                filename,
                template: template.clone(),
            })
        })
        .collect()
}

/// Favicon plugin for `logo`, which must exist under `root`.
pub fn favicon_plugin(root: &Path, logo: &Path) -> Result<PluginDescriptor> {
    let logo = logo.clean();
    let absolute = root.join(&logo);
    if !absolute.is_file() {
        return Err(Error::FaviconNotFound(absolute));
    }
    Ok(PluginDescriptor::Favicons { logo })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<html></html>").unwrap();
    }

    #[test]
    fn templates_are_sorted_and_relative() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/about.html");
        touch(dir.path(), "src/index.html");
        touch(dir.path(), "src/partials/nav.html");

        let templates = discover_templates(dir.path(), "./src/*.html").unwrap();
        assert_eq!(
            templates,
            vec![PathBuf::from("src/about.html"), PathBuf::from("src/index.html")]
        );
    }

    #[test]
    fn no_templates_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let templates = discover_templates(dir.path(), "./src/*.html").unwrap();
        assert!(templates.is_empty());
    }

    #[test]
    fn malformed_glob_fails() {
        let dir = TempDir::new().unwrap();
        let err = discover_templates(dir.path(), "./src/[*.html").unwrap_err();
        assert!(matches!(err, Error::InvalidGlob { .. }));
    }

    #[test]
    fn html_plugin_filename_is_base_name() {
        let plugins = html_plugins(&[PathBuf::from("src/contact.html")]);
        assert_eq!(
            plugins,
            vec![PluginDescriptor::Html {
                filename: "contact.html".to_string(),
                template: PathBuf::from("src/contact.html"),
            }]
        );
    }

    #[test]
    fn missing_favicon_fails() {
        let dir = TempDir::new().unwrap();
        let err = favicon_plugin(dir.path(), Path::new("./src/images/icon.png")).unwrap_err();
        match err {
            Error::FaviconNotFound(path) => assert!(path.ends_with("src/images/icon.png")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn css_extract_names_are_fixed() {
        let json = serde_json::to_value(PluginDescriptor::css_extract()).unwrap();
        assert_eq!(json["plugin"], "css-extract");
        assert_eq!(json["filename"], "[name].css");
        assert_eq!(json["chunkFilename"], "[id].css");
    }
}
