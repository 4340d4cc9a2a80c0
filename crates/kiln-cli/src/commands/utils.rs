//! Helpers shared by the commands.

use std::fs;
use std::path::{Path, PathBuf};

use kiln_bundler::{BuildOutput, Compiler};
use kiln_config::{BuildConfig, BuildMode, ProjectSettings};

use crate::cli::CommonArgs;
use crate::config::{Overrides, load_settings};
use crate::error::{BuildError, CliError, Result};

/// A project root with its loaded settings and selected mode.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub mode: BuildMode,
    pub settings: ProjectSettings,
}

impl Project {
    pub fn load(common: &CommonArgs, overrides: &Overrides) -> Result<Self> {
        let root = common.project_root();
        if !root.is_dir() {
            return Err(CliError::FileNotFound(root));
        }

        let settings = load_settings(&root, common.config.as_deref(), overrides)?;
        Ok(Self {
            root,
            mode: common.build_mode(),
            settings,
        })
    }

    /// Resolve the build configuration. Each call rescans templates.
    pub fn resolve(&self) -> Result<BuildConfig> {
        Ok(kiln_config::resolve(self.mode, &self.root, &self.settings)?)
    }
}

/// Compile and write one build off the async runtime.
pub async fn compile_and_write(config: BuildConfig) -> Result<BuildOutput> {
    let output = tokio::task::spawn_blocking(move || {
        let out_dir = config.output.path.clone();
        let output = Compiler::new(config).compile()?;
        output.write_to(&out_dir)?;
        Ok::<_, kiln_bundler::Error>(output)
    })
    .await
    .map_err(|e| BuildError::TaskFailed(e.to_string()))??;
    Ok(output)
}

/// Empty `out_dir`, keeping the directory itself.
///
/// Refuses to clean the project root or any directory containing it.
pub fn clean_output_dir(out_dir: &Path, context: &Path) -> Result<()> {
    if context.starts_with(out_dir) {
        return Err(CliError::InvalidArgument(format!(
            "Refusing to clean {}: it contains the project",
            out_dir.display()
        )));
    }

    if !out_dir.exists() {
        return Ok(());
    }
    if !out_dir.is_dir() {
        return Err(CliError::InvalidArgument(format!(
            "Output path exists but is not a directory: {}",
            out_dir.display()
        )));
    }

    let clean_failed = |source| BuildError::CleanFailed {
        path: out_dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(out_dir).map_err(clean_failed)? {
        let path = entry.map_err(clean_failed)?.path();
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(clean_failed)?;
    }

    Ok(())
}

/// `(filename, size)` pairs for the build summary.
pub fn summary_rows(output: &BuildOutput) -> Vec<(String, u64)> {
    output
        .files()
        .map(|file| (file.filename.clone(), file.size() as u64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_compile_and_write_fills_the_output_dir() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src/images")).unwrap();
        fs::write(root.join("src/index.js"), "export const a = 1;\n").unwrap();
        fs::write(root.join("src/index.html"), "<html><head></head><body></body></html>").unwrap();
        let icon = image::RgbaImage::from_pixel(16, 16, image::Rgba([0, 0, 0, 255]));
        let mut png = Vec::new();
        icon.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        fs::write(root.join("src/images/icon.png"), png).unwrap();

        let config =
            kiln_config::resolve(BuildMode::Development, root, &ProjectSettings::default())
                .unwrap();
        let output = compile_and_write(config).await.unwrap();

        for file in output.files() {
            assert!(root.join("public").join(&file.filename).is_file());
        }
        assert!(root.join("public/bundle.js").is_file());
    }

    #[test]
    fn test_clean_output_dir_empties_but_keeps_dir() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("public");
        fs::create_dir_all(out.join("images")).unwrap();
        fs::write(out.join("bundle.js"), "x").unwrap();
        fs::write(out.join("images/a.png"), "x").unwrap();

        clean_output_dir(&out, temp.path()).unwrap();

        assert!(out.is_dir());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_clean_missing_dir_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        clean_output_dir(&temp.path().join("public"), temp.path()).unwrap();
        assert!(!temp.path().join("public").exists());
    }

    #[test]
    fn test_clean_refuses_project_root() {
        let temp = TempDir::new().unwrap();
        let err = clean_output_dir(temp.path(), temp.path()).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));

        let parent = temp.path().parent().unwrap();
        assert!(clean_output_dir(parent, temp.path()).is_err());
    }

    #[test]
    fn test_clean_rejects_files() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("public");
        fs::write(&file, "not a dir").unwrap();
        assert!(matches!(
            clean_output_dir(&file, temp.path()),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
