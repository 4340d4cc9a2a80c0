//! The `file` step: emit content under an interpolated name.

use std::path::Path;

use crate::hash::content_hash;
use crate::output::{BuildOutput, OutputKind};
use crate::Result;

/// Expand `[name]`, `[ext]` and `[hash]` in `template` for `path`.
pub fn interpolate_name(template: &str, path: &Path, bytes: &[u8]) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut name = template.replace("[name]", &stem).replace("[ext]", &ext);
    if name.contains("[hash]") {
        name = name.replace("[hash]", &content_hash(bytes));
    }
    name
}

/// Emit `bytes` and return the URL the file is served under.
pub fn emit_file(
    output: &mut BuildOutput,
    path: &Path,
    bytes: Vec<u8>,
    template: &str,
) -> Result<String> {
    let filename = interpolate_name(template, path, &bytes);
    output.emit(filename.clone(), bytes, OutputKind::Asset)?;
    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HASH_LEN;

    #[test]
    fn interpolates_every_placeholder() {
        let name = interpolate_name(
            "images/[name][hash].[ext]",
            Path::new("/site/src/images/logo.png"),
            b"pixels",
        );
        assert!(name.starts_with("images/logo"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "images/logo".len() + HASH_LEN + ".png".len());
    }

    #[test]
    fn different_bytes_give_different_names() {
        let path = Path::new("fonts/a.woff");
        let a = interpolate_name("fonts/[name][hash].[ext]", path, b"one");
        let b = interpolate_name("fonts/[name][hash].[ext]", path, b"two");
        assert_ne!(a, b);
    }

    #[test]
    fn emitted_file_is_recorded_unchanged() {
        let mut output = BuildOutput::new();
        let url = emit_file(
            &mut output,
            Path::new("src/fonts/icons.woff2"),
            b"font-bytes".to_vec(),
            "fonts/[name][hash].[ext]",
        )
        .unwrap();

        let file = output.get(&url).unwrap();
        assert_eq!(file.contents, b"font-bytes");
        assert_eq!(file.kind, OutputKind::Asset);
    }
}
