//! Favicon generation from one logo image.

use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::hash::content_hash;
use crate::output::{BuildOutput, OutputKind};
use crate::{Error, Result};

const STEP: &str = "favicons";

/// `(file, size)` for every PNG icon written.
const PNG_ICONS: &[(&str, u32)] = &[
    ("favicon-16x16.png", 16),
    ("favicon-32x32.png", 32),
    ("apple-touch-icon.png", 180),
    ("android-chrome-192x192.png", 192),
    ("android-chrome-512x512.png", 512),
];

const ICO_SIZE: u32 = 48;

/// Icons written for one logo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Favicons {
    /// Directory under the output root, `icons-<hash>`.
    pub dir: String,
    /// Link tags for a page `<head>`.
    pub tags: Vec<String>,
}

impl Favicons {
    pub fn html(&self) -> String {
        self.tags.join("\n")
    }
}

/// Decode the logo at `path` and emit every icon size into `output`.
pub fn generate(output: &mut BuildOutput, path: &Path) -> Result<Favicons> {
    let bytes = std::fs::read(path).map_err(|e| Error::read(path, e))?;
    let logo = image::load_from_memory(&bytes)
        .map_err(|e| Error::transform(STEP, path.display().to_string(), e))?;
    let dir = format!("icons-{}", content_hash(&bytes));

    for (file, size) in PNG_ICONS {
        let png = encode(&logo, *size, ImageFormat::Png, path)?;
        output.emit(format!("{}/{}", dir, file), png, OutputKind::Icon)?;
    }

    let ico = encode(&logo, ICO_SIZE, ImageFormat::Ico, path)?;
    output.emit(format!("{}/favicon.ico", dir), ico, OutputKind::Icon)?;

    let manifest = serde_json::json!({
        "name": "",
        "short_name": "",
        "icons": [
            {
                "src": format!("/{}/android-chrome-192x192.png", dir),
                "sizes": "192x192",
                "type": "image/png"
            },
            {
                "src": format!("/{}/android-chrome-512x512.png", dir),
                "sizes": "512x512",
                "type": "image/png"
            }
        ],
        "display": "standalone"
    });
    let manifest = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| Error::transform(STEP, path.display().to_string(), e))?;
    output.emit(format!("{}/manifest.json", dir), manifest, OutputKind::Icon)?;

    tracing::debug!(dir = %dir, "generated favicons");

    let tags = vec![
        format!(
            r#"<link rel="apple-touch-icon" sizes="180x180" href="{}/apple-touch-icon.png">"#,
            dir
        ),
        format!(
            r#"<link rel="icon" type="image/png" sizes="32x32" href="{}/favicon-32x32.png">"#,
            dir
        ),
        format!(
            r#"<link rel="icon" type="image/png" sizes="16x16" href="{}/favicon-16x16.png">"#,
            dir
        ),
        format!(r#"<link rel="shortcut icon" href="{}/favicon.ico">"#, dir),
        format!(r#"<link rel="manifest" href="{}/manifest.json">"#, dir),
    ];

    Ok(Favicons { dir, tags })
}

fn encode(logo: &DynamicImage, size: u32, format: ImageFormat, path: &Path) -> Result<Vec<u8>> {
    let resized = logo.resize_exact(size, size, FilterType::Lanczos3);
    // The ICO encoder only takes 8-bit RGBA.
    let resized = DynamicImage::ImageRgba8(resized.to_rgba8());
    let mut buf = Vec::new();
    resized
        .write_to(&mut Cursor::new(&mut buf), format)
        .map_err(|e| Error::transform(STEP, path.display().to_string(), e))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use tempfile::TempDir;

    fn logo(dir: &TempDir) -> std::path::PathBuf {
        let img = ImageBuffer::from_fn(64, 64, |x, y| Rgba([x as u8 * 4, y as u8 * 4, 128, 255]));
        let path = dir.path().join("icon.png");
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn every_icon_is_emitted_under_hashed_dir() {
        let dir = TempDir::new().unwrap();
        let path = logo(&dir);
        let mut output = BuildOutput::new();
        let favicons = generate(&mut output, &path).unwrap();

        assert!(favicons.dir.starts_with("icons-"));
        assert_eq!(output.of_kind(OutputKind::Icon).count(), PNG_ICONS.len() + 2);

        let touch = output
            .get(&format!("{}/apple-touch-icon.png", favicons.dir))
            .unwrap();
        let decoded = image::load_from_memory(&touch.contents).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (180, 180));

        let ico = output.get(&format!("{}/favicon.ico", favicons.dir)).unwrap();
        assert_eq!(&ico.contents[..4], &[0, 0, 1, 0]);
    }

    #[test]
    fn link_tags_point_into_icon_dir() {
        let dir = TempDir::new().unwrap();
        let path = logo(&dir);
        let mut output = BuildOutput::new();
        let favicons = generate(&mut output, &path).unwrap();

        let html = favicons.html();
        assert!(html.contains(&format!("{}/favicon.ico", favicons.dir)));
        assert!(html.contains(r#"rel="manifest""#));
        assert_eq!(favicons.tags.len(), 5);
    }

    #[test]
    fn undecodable_logo_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("icon.png");
        std::fs::write(&path, b"not an image").unwrap();
        let err = generate(&mut BuildOutput::new(), &path).unwrap_err();
        assert!(matches!(err, Error::Transform { step: "favicons", .. }));
    }
}
