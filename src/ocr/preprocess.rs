//! Image normalization ahead of OCR.
//!
//! Calendar screenshots arrive in arbitrary resolutions. Large captures are
//! scaled down so their longest edge is at most `MAX_DIMENSION`, which keeps
//! recognition time and decoded memory bounded.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

use crate::models::RawImage;

/// Longest edge, in pixels, of a raster handed to the recognizer.
pub const MAX_DIMENSION: u32 = 2000;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("cannot decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("decoder task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A decoded image whose longest edge is at most `MAX_DIMENSION`.
#[derive(Debug, Clone)]
pub struct NormalizedRaster {
    image: DynamicImage,
}

impl NormalizedRaster {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Encode the raster as PNG, for engines that read from files.
    pub fn to_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut buf = Cursor::new(Vec::new());
        self.image.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}

/// Output dimensions for an image of the given size.
///
/// Both axes use the same scale factor and are rounded independently.
pub fn target_dimensions(width: u32, height: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= MAX_DIMENSION {
        return (width, height);
    }

    let scale = f64::from(MAX_DIMENSION) / f64::from(longest);
    let scaled = |v: u32| ((f64::from(v) * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Decode and downscale on the current thread.
pub fn downscale_blocking(image: &RawImage) -> Result<NormalizedRaster, PreprocessError> {
    let decoded =
        image::load_from_memory(image.bytes()).map_err(|source| PreprocessError::Decode {
            name: image.name().to_string(),
            source,
        })?;

    let (width, height) = (decoded.width(), decoded.height());
    let (target_w, target_h) = target_dimensions(width, height);
    if (target_w, target_h) == (width, height) {
        return Ok(NormalizedRaster { image: decoded });
    }

    tracing::debug!(
        "Downscaling {} from {}x{} to {}x{}",
        image.name(),
        width,
        height,
        target_w,
        target_h
    );
    Ok(NormalizedRaster {
        image: decoded.resize_exact(target_w, target_h, FilterType::Triangle),
    })
}

/// Decode and downscale on the blocking pool.
pub async fn downscale(image: &RawImage) -> Result<NormalizedRaster, PreprocessError> {
    let image = image.clone();
    tokio::task::spawn_blocking(move || downscale_blocking(&image)).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn png_image(width: u32, height: u32) -> RawImage {
        let raster = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut buf = Cursor::new(Vec::new());
        raster.write_to(&mut buf, ImageFormat::Png).unwrap();
        RawImage::new("test.png", "image/png", buf.into_inner())
    }

    #[test]
    fn test_small_image_is_unscaled() {
        assert_eq!(target_dimensions(1200, 800), (1200, 800));
        assert_eq!(target_dimensions(2000, 2000), (2000, 2000));
    }

    #[test]
    fn test_large_image_longest_edge_is_bounded() {
        assert_eq!(target_dimensions(4000, 3000), (2000, 1500));
        assert_eq!(target_dimensions(3000, 6000), (1000, 2000));
    }

    #[test]
    fn test_axes_are_rounded_independently() {
        // 10 * (2000 / 3001) = 6.66
        assert_eq!(target_dimensions(3001, 10), (2000, 7));
        // Never collapses an axis to zero
        assert_eq!(target_dimensions(100_000, 10), (2000, 1));
    }

    #[test]
    fn test_aspect_ratio_is_preserved() {
        let (w, h) = target_dimensions(5120, 2880);
        assert_eq!(w.max(h), 2000);
        let before = 5120.0 / 2880.0;
        let after = f64::from(w) / f64::from(h);
        assert!((before - after).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_downscale_decodes_and_resizes() {
        let raster = downscale(&png_image(2500, 1000)).await.unwrap();
        assert_eq!((raster.width(), raster.height()), (2000, 800));
    }

    #[tokio::test]
    async fn test_downscale_keeps_small_raster() {
        let raster = downscale(&png_image(640, 480)).await.unwrap();
        assert_eq!((raster.width(), raster.height()), (640, 480));
        assert!(!raster.to_png().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_bytes_fail_to_decode() {
        let image = RawImage::new("broken.png", "image/png", vec![0x89, b'P', b'N', b'G', 1, 2]);
        let err = downscale(&image).await.unwrap_err();
        assert!(matches!(err, PreprocessError::Decode { ref name, .. } if name == "broken.png"));
    }
}
