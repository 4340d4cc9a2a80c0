//! The `image-optimize` step.
//!
//! JPEG is decoded and re-encoded through mozjpeg at the configured quality.
//! PNG goes through oxipng, which is lossless. Anything else passes through.
//! The smaller of input and output is kept, so this step never grows a file.

use std::panic;
use std::path::Path;

use kiln_config::MozjpegOptions;
use oxipng::{Headers, Options};

use crate::{Error, Result};

const STEP: &str = "image-optimize";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Raster {
    Jpeg,
    Png,
}

fn detect(path: &Path) -> Option<Raster> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some(Raster::Jpeg),
        "png" => Some(Raster::Png),
        _ => None,
    }
}

pub fn optimize(path: &Path, bytes: Vec<u8>, options: &MozjpegOptions) -> Result<Vec<u8>> {
    let Some(kind) = detect(path) else {
        return Ok(bytes);
    };

    let optimized = match kind {
        Raster::Jpeg => recompress_jpeg(path, &bytes, options)?,
        Raster::Png => optimize_png(path, &bytes)?,
    };

    tracing::debug!(
        path = %path.display(),
        before = bytes.len(),
        after = optimized.len(),
        "optimized image"
    );

    if optimized.len() < bytes.len() {
        Ok(optimized)
    } else {
        Ok(bytes)
    }
}

fn optimize_png(path: &Path, bytes: &[u8]) -> Result<Vec<u8>> {
    let options = Options {
        strip: Headers::Safe,
        ..Default::default()
    };
    oxipng::optimize_from_memory(bytes, &options)
        .map_err(|e| Error::transform(STEP, path.display().to_string(), e))
}

fn recompress_jpeg(path: &Path, bytes: &[u8], options: &MozjpegOptions) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)
        .map_err(|e| Error::transform(STEP, path.display().to_string(), e))?
        .to_rgb8();
    let (width, height) = decoded.dimensions();
    let pixels = decoded.into_raw();
    let quality = f32::from(options.quality);
    let progressive = options.progressive;

    // libjpeg reports fatal errors by unwinding.
    let encoded = panic::catch_unwind(move || -> std::io::Result<Vec<u8>> {
        let mut compress = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        compress.set_size(width as usize, height as usize);
        compress.set_quality(quality);
        if progressive {
            compress.set_progressive_mode();
        }
        let mut started = compress.start_compress(Vec::new())?;
        started.write_scanlines(&pixels)?;
        started.finish()
    });

    match encoded {
        Ok(Ok(data)) => Ok(data),
        Ok(Err(e)) => Err(Error::transform(STEP, path.display().to_string(), e)),
        Err(_) => Err(Error::transform(
            STEP,
            path.display().to_string(),
            "mozjpeg aborted while encoding",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;

    fn gradient(width: u32, height: u32) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
        ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, ((x + y) % 256) as u8])
        })
    }

    fn jpeg_at_full_quality() -> Vec<u8> {
        let img = gradient(64, 64);
        let mut buf = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, 100);
        encoder.encode_image(&img).unwrap();
        buf
    }

    #[test]
    fn jpeg_shrinks() {
        let original = jpeg_at_full_quality();
        let optimized = optimize(
            Path::new("src/images/photo.jpg"),
            original.clone(),
            &MozjpegOptions::default(),
        )
        .unwrap();
        assert!(optimized.len() < original.len());
        assert!(image::load_from_memory(&optimized).is_ok());
    }

    #[test]
    fn png_never_grows() {
        let img = gradient(32, 32);
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();

        let optimized = optimize(
            Path::new("src/images/icon.PNG"),
            buf.clone(),
            &MozjpegOptions::default(),
        )
        .unwrap();
        assert!(optimized.len() <= buf.len());
    }

    #[test]
    fn other_formats_pass_through() {
        let svg = b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>".to_vec();
        let out = optimize(
            Path::new("src/images/logo.svg"),
            svg.clone(),
            &MozjpegOptions::default(),
        )
        .unwrap();
        assert_eq!(out, svg);
    }

    #[test]
    fn corrupt_jpeg_is_an_error() {
        let err = optimize(
            Path::new("src/images/broken.jpg"),
            b"definitely not a jpeg".to_vec(),
            &MozjpegOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Transform { step: "image-optimize", .. }));
    }
}
