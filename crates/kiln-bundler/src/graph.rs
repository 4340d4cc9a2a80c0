//! Module ids and import resolution.
//!
//! Only relative specifiers are bundled. A specifier resolves to the exact
//! file, then the file with `.js` appended, then `index.js` inside it.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use path_clean::PathClean;

use crate::{Error, Result};

/// Id used for `path` inside a bundle: project-relative with a `./` prefix.
pub fn module_id(context: &Path, path: &Path) -> String {
    match path.strip_prefix(context) {
        Ok(relative) => {
            let parts: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect();
            format!("./{}", parts.join("/"))
        }
        Err(_) => path.to_string_lossy().replace('\\', "/"),
    }
}

pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

/// Resolve an import of `specifier` made by the file at `importer`.
pub fn resolve_specifier(importer: &Path, specifier: &str) -> Result<PathBuf> {
    let unresolved = || Error::Resolution {
        specifier: specifier.to_string(),
        importer: importer.display().to_string(),
    };

    if !is_relative_specifier(specifier) {
        return Err(unresolved());
    }

    let base = importer
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(specifier)
        .clean();

    let mut with_js = base.clone().into_os_string();
    with_js.push(".js");

    [base.clone(), PathBuf::from(with_js), base.join("index.js")]
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(unresolved)
}

/// A module after loading and linking.
#[derive(Debug, Clone)]
pub struct LinkedModule {
    pub path: PathBuf,
    /// Function body registered under the module id.
    pub code: String,
    /// Ids of the modules this one requires, in source order.
    pub dependencies: Vec<String>,
    /// CSS pulled out of the module by the extraction step.
    pub extracted_css: Option<String>,
}

/// Modules reachable from one entry, in depth-first discovery order.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    pub entry: String,
    pub modules: IndexMap<String, LinkedModule>,
}

impl ModuleGraph {
    pub fn new(entry: String) -> Self {
        Self {
            entry,
            modules: IndexMap::new(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    /// Extracted CSS of every module, in graph order.
    pub fn extracted_css(&self) -> Vec<&str> {
        self.modules
            .values()
            .filter_map(|module| module.extracted_css.as_deref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn module_id_is_relative_with_dot_prefix() {
        let id = module_id(Path::new("/site"), Path::new("/site/src/app.js"));
        assert_eq!(id, "./src/app.js");
    }

    #[test]
    fn resolves_exact_then_extension_then_index() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("widgets")).unwrap();
        fs::write(src.join("index.js"), "").unwrap();
        fs::write(src.join("util.js"), "").unwrap();
        fs::write(src.join("widgets/index.js"), "").unwrap();
        fs::write(src.join("data.json"), "{}").unwrap();

        let importer = src.join("index.js");
        assert_eq!(resolve_specifier(&importer, "./util").unwrap(), src.join("util.js"));
        assert_eq!(resolve_specifier(&importer, "./util.js").unwrap(), src.join("util.js"));
        assert_eq!(
            resolve_specifier(&importer, "./widgets").unwrap(),
            src.join("widgets/index.js")
        );
        assert_eq!(resolve_specifier(&importer, "./data.json").unwrap(), src.join("data.json"));
    }

    #[test]
    fn parent_relative_specifiers_resolve() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("lib")).unwrap();
        fs::write(src.join("shared.js"), "").unwrap();
        fs::write(src.join("lib/a.js"), "").unwrap();

        let resolved = resolve_specifier(&src.join("lib/a.js"), "../shared").unwrap();
        assert_eq!(resolved, src.join("shared.js"));
    }

    #[test]
    fn bare_specifiers_are_rejected() {
        let dir = TempDir::new().unwrap();
        let importer = dir.path().join("index.js");
        let err = resolve_specifier(&importer, "lodash").unwrap_err();
        assert!(matches!(err, Error::Resolution { ref specifier, .. } if specifier == "lodash"));
    }

    #[test]
    fn missing_file_is_a_resolution_error() {
        let dir = TempDir::new().unwrap();
        let importer = dir.path().join("index.js");
        assert!(resolve_specifier(&importer, "./nope").is_err());
    }
}
