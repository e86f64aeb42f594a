//! Per-frame crop, rotate, and resize.
//!
//! Raw frames are 1024×1024 full-disk images. The animation keeps the left
//! half of the disk, trimmed of the caption bands at top and bottom, turned
//! on its side and halved:
//!
//! ```text
//! 1024×1024 ── crop (x 0..512, y 72..952) ──► 512×880
//!          ── rotate 90° clockwise ─────────► 880×512
//!          ── Lanczos3 to half size ─────────► 440×256
//! ```
//!
//! The 90° turn is an exact pixel permutation, equivalent to
//! nearest-neighbour rotation with the canvas expanded to fit.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, RgbImage};
use suncast_common::error::{SuncastError, SuncastResult};

/// A transformed frame, still tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedFrame {
    /// Position in the located frame sequence.
    pub index: usize,

    /// Cache key of the source frame; names the scratch file.
    pub cache_key: String,

    pub image: RgbImage,
}

/// Fixed geometry applied to every frame of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTransformer {
    /// Required raw frame width.
    pub raw_width: u32,

    /// Required raw frame height.
    pub raw_height: u32,

    /// Rows dropped from both the top and the bottom.
    pub margin: u32,
}

impl Default for FrameTransformer {
    fn default() -> Self {
        Self {
            raw_width: 1024,
            raw_height: 1024,
            margin: 72,
        }
    }
}

impl FrameTransformer {
    /// Size of the region kept from the raw frame.
    pub fn crop_dimensions(&self) -> (u32, u32) {
        (self.raw_width / 2, self.raw_height - 2 * self.margin)
    }

    /// Size of every processed frame.
    pub fn output_dimensions(&self) -> (u32, u32) {
        let (w, h) = self.crop_dimensions();
        // width and height swap in the rotation
        (h / 2, w / 2)
    }

    /// Load a raw frame from disk and transform it.
    pub fn transform_file(&self, path: &Path) -> SuncastResult<RgbImage> {
        if !path.is_file() {
            return Err(SuncastError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        tracing::debug!(path = %path.display(), "Cropping, rotating, and resizing");
        // sniff the format from content; cache keys carry the archive's extension
        let image = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| SuncastError::image(format!("failed to load {}: {e}", path.display())))?;
        let processed = self.transform(&image, path)?;
        tracing::debug!(path = %path.display(), "Frame processed");
        Ok(processed)
    }

    /// Transform an already decoded frame. `origin` only labels errors.
    pub fn transform(&self, image: &DynamicImage, origin: &Path) -> SuncastResult<RgbImage> {
        let actual = (image.width(), image.height());
        let expected = (self.raw_width, self.raw_height);
        if actual != expected {
            return Err(SuncastError::InvalidFrame {
                path: origin.to_path_buf(),
                expected,
                actual,
            });
        }

        let turned = self.crop_and_rotate(&image.to_rgb8());
        let (w, h) = self.output_dimensions();
        Ok(imageops::resize(&turned, w, h, FilterType::Lanczos3))
    }

    fn crop_and_rotate(&self, raw: &RgbImage) -> RgbImage {
        let (w, h) = self.crop_dimensions();
        let cropped = imageops::crop_imm(raw, 0, self.margin, w, h).to_image();
        imageops::rotate90(&cropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_output_dimensions() {
        let transformer = FrameTransformer::default();
        assert_eq!(transformer.crop_dimensions(), (512, 880));
        assert_eq!(transformer.output_dimensions(), (440, 256));
    }

    #[test]
    fn test_transform_file_produces_fixed_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        gradient(1024, 1024).save(&path).unwrap();

        let processed = FrameTransformer::default().transform_file(&path).unwrap();
        assert_eq!(processed.dimensions(), (440, 256));
    }

    #[test]
    fn test_transform_is_deterministic() {
        let raw = DynamicImage::ImageRgb8(gradient(1024, 1024));
        let transformer = FrameTransformer::default();
        let a = transformer.transform(&raw, Path::new("a")).unwrap();
        let b = transformer.transform(&raw, Path::new("a")).unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_rejects_wrong_dimensions() {
        let raw = DynamicImage::ImageRgb8(gradient(512, 512));
        let err = FrameTransformer::default()
            .transform(&raw, Path::new("small.jpg"))
            .unwrap_err();
        match err {
            SuncastError::InvalidFrame {
                expected, actual, ..
            } => {
                assert_eq!(expected, (1024, 1024));
                assert_eq!(actual, (512, 512));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_crop_and_rotate_moves_pixels_clockwise() {
        let transformer = FrameTransformer::default();
        let mut raw = RgbImage::new(1024, 1024);
        // first kept row, first column
        raw.put_pixel(0, 72, Rgb([255, 0, 0]));
        // last kept row, last kept column
        raw.put_pixel(511, 951, Rgb([0, 255, 0]));
        // inside the dropped top band and the dropped right half
        raw.put_pixel(10, 10, Rgb([0, 0, 255]));
        raw.put_pixel(700, 500, Rgb([0, 0, 255]));

        let turned = transformer.crop_and_rotate(&raw);
        assert_eq!(turned.dimensions(), (880, 512));
        assert_eq!(turned.get_pixel(879, 0), &Rgb([255, 0, 0]));
        assert_eq!(turned.get_pixel(0, 511), &Rgb([0, 255, 0]));
        assert!(turned.pixels().all(|p| p != &Rgb([0, 0, 255])));
    }

    #[test]
    fn test_missing_file() {
        let err = FrameTransformer::default()
            .transform_file(Path::new("/nonexistent/frame.jpg"))
            .unwrap_err();
        assert!(matches!(err, SuncastError::FileNotFound { .. }));
    }
}
