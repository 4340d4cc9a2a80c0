//! Build results held in memory until written.

pub mod writer;

use std::path::Path;

use indexmap::IndexMap;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Script,
    SourceMap,
    Stylesheet,
    Page,
    Asset,
    Icon,
}

#[derive(Debug, Clone)]
pub struct OutputFile {
    /// Path relative to the output directory, `/`-separated.
    pub filename: String,
    pub contents: Vec<u8>,
    pub kind: OutputKind,
}

impl OutputFile {
    pub fn size(&self) -> usize {
        self.contents.len()
    }

    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.contents).ok()
    }
}

/// Every file a build pass produced, in emission order.
#[derive(Debug, Default)]
pub struct BuildOutput {
    files: IndexMap<String, OutputFile>,
}

impl BuildOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file. Emitting the same name twice is allowed only with
    /// identical contents.
    pub fn emit(
        &mut self,
        filename: impl Into<String>,
        contents: Vec<u8>,
        kind: OutputKind,
    ) -> Result<()> {
        let filename = filename.into();
        if let Some(existing) = self.files.get(&filename) {
            if existing.contents == contents {
                return Ok(());
            }
            return Err(Error::OutputConflict(format!(
                "'{}' would be written twice with different contents",
                filename
            )));
        }
        tracing::trace!(filename = %filename, size = contents.len(), "emit");
        self.files.insert(
            filename.clone(),
            OutputFile {
                filename,
                contents,
                kind,
            },
        );
        Ok(())
    }

    pub fn get(&self, filename: &str) -> Option<&OutputFile> {
        self.files.get(filename)
    }

    pub fn files(&self) -> impl Iterator<Item = &OutputFile> {
        self.files.values()
    }

    pub fn of_kind(&self, kind: OutputKind) -> impl Iterator<Item = &OutputFile> {
        self.files().filter(move |file| file.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_size(&self) -> usize {
        self.files().map(OutputFile::size).sum()
    }

    /// Write every file under `dir`. Either all files land or none do.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        writer::write_output_to(self, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_reemit_is_ignored() {
        let mut output = BuildOutput::new();
        output
            .emit("images/a.png", vec![1, 2, 3], OutputKind::Asset)
            .unwrap();
        output
            .emit("images/a.png", vec![1, 2, 3], OutputKind::Asset)
            .unwrap();
        assert_eq!(output.len(), 1);
    }

    #[test]
    fn conflicting_reemit_fails() {
        let mut output = BuildOutput::new();
        output.emit("bundle.js", b"a".to_vec(), OutputKind::Script).unwrap();
        let err = output
            .emit("bundle.js", b"b".to_vec(), OutputKind::Script)
            .unwrap_err();
        assert!(matches!(err, Error::OutputConflict(_)));
    }

    #[test]
    fn of_kind_filters() {
        let mut output = BuildOutput::new();
        output.emit("bundle.js", b"x".to_vec(), OutputKind::Script).unwrap();
        output.emit("main.css", b"y".to_vec(), OutputKind::Stylesheet).unwrap();
        assert_eq!(output.of_kind(OutputKind::Stylesheet).count(), 1);
        assert_eq!(output.total_size(), 2);
    }
}
