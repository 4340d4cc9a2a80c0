//! Atomic, contained writing of build output.
//!
//! Every file is first written next to its target under a temporary name.
//! Only when all temporaries exist are they renamed into place. A file from an
//! earlier build is moved aside first and only deleted once every rename has
//! succeeded. A failure in either phase removes the temporaries and new
//! targets and puts the earlier files back, so a failed write leaves the
//! directory as it was.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;

use super::BuildOutput;
use crate::{Error, Result};

const TEMP_SUFFIX: &str = ".kiln-tmp";
const BACKUP_SUFFIX: &str = ".kiln-bak";

/// A target renamed into place, with the earlier file it replaced.
struct Commit {
    target: PathBuf,
    backup: Option<PathBuf>,
    placed: bool,
}

pub fn write_output_to(output: &BuildOutput, dir: &Path) -> Result<()> {
    let dir = normalize_dir(dir)?;

    fs::create_dir_all(&dir).map_err(|e| {
        Error::WriteFailure(format!(
            "Failed to create output directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let operations = output
        .files()
        .map(|file| Ok((validate_output_path(&dir, &file.filename)?, file.contents.as_slice())))
        .collect::<Result<Vec<_>>>()?;

    write_files_atomic(&operations)?;
    tracing::debug!(dir = %dir.display(), files = operations.len(), "wrote build output");
    Ok(())
}

fn normalize_dir(dir: &Path) -> Result<PathBuf> {
    let cleaned = dir.clean();
    if cleaned.is_absolute() {
        return Ok(cleaned);
    }
    let cwd = std::env::current_dir()
        .map_err(|e| Error::InvalidOutputPath(format!("Failed to get current directory: {}", e)))?;
    Ok(cwd.join(cleaned).clean())
}

/// Join `filename` onto `base_dir`, refusing anything that escapes it.
pub(crate) fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.contains('\0') {
        return Err(Error::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }

    let full_path = base_dir.join(Path::new(filename).clean()).clean();
    if !full_path.starts_with(base_dir) || full_path == base_dir {
        return Err(Error::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}' (resolved to '{}')",
            filename,
            base_dir.display(),
            full_path.display()
        )));
    }

    Ok(full_path)
}

fn with_suffix(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn write_files_atomic(operations: &[(PathBuf, &[u8])]) -> Result<()> {
    let mut temp_files: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(operations.len());

    for (target_path, content) in operations {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                rollback(&temp_files, &[]);
                Error::WriteFailure(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = with_suffix(target_path, TEMP_SUFFIX);
        fs::write(&temp_path, content).map_err(|e| {
            rollback(&temp_files, &[]);
            Error::WriteFailure(format!(
                "Failed to write temporary file '{}': {}",
                temp_path.display(),
                e
            ))
        })?;

        temp_files.push((temp_path, target_path.clone()));
    }

    let mut committed: Vec<Commit> = Vec::with_capacity(temp_files.len());
    for (temp_path, target_path) in &temp_files {
        let mut commit = Commit {
            target: target_path.clone(),
            backup: None,
            placed: false,
        };
        if target_path.is_file() {
            let backup = with_suffix(target_path, BACKUP_SUFFIX);
            if let Err(e) = fs::rename(target_path, &backup) {
                rollback(&temp_files, &committed);
                return Err(Error::WriteFailure(format!(
                    "Failed to move aside '{}': {}",
                    target_path.display(),
                    e
                )));
            }
            commit.backup = Some(backup);
        }

        let renamed = fs::rename(temp_path, target_path);
        commit.placed = renamed.is_ok();
        committed.push(commit);
        if let Err(e) = renamed {
            rollback(&temp_files, &committed);
            return Err(Error::WriteFailure(format!(
                "Failed to rename '{}' to '{}': {}",
                temp_path.display(),
                target_path.display(),
                e
            )));
        }
    }

    for backup in committed.iter().filter_map(|c| c.backup.as_ref()) {
        if let Err(e) = fs::remove_file(backup) {
            tracing::warn!(path = %backup.display(), error = %e, "failed to remove previous output");
        }
    }

    Ok(())
}

/// Best effort: we are already failing, so cleanup errors are only logged.
fn rollback(temp_files: &[(PathBuf, PathBuf)], committed: &[Commit]) {
    for (temp, _) in temp_files {
        if !temp.exists() {
            continue;
        }
        if let Err(e) = fs::remove_file(temp) {
            tracing::warn!(path = %temp.display(), error = %e, "failed to clean up after write error");
        }
    }

    for commit in committed.iter().rev() {
        let removed = if commit.placed {
            fs::remove_file(&commit.target)
        } else {
            Ok(())
        };
        if let Err(e) = removed {
            tracing::warn!(path = %commit.target.display(), error = %e, "failed to clean up after write error");
        }
        if let Some(backup) = &commit.backup {
            if let Err(e) = fs::rename(backup, &commit.target) {
                tracing::warn!(path = %commit.target.display(), error = %e, "failed to restore previous output");
            }
        }
    }
}
