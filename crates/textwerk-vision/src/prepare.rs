// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image preparation ahead of text recognition: decode, downscale, grayscale,
// histogram equalisation. Operates on in-memory images using the `image` and
// `imageproc` crates.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use imageproc::contrast::equalize_histogram;
use textwerk_core::error::TextwerkError;
use tracing::{debug, info, instrument};

/// Longest side, in pixels, that recognition is run at by default.
///
/// Phone cameras produce 12+ megapixel frames; text detection gains nothing
/// above this and the recognizer's cost grows with pixel count.
pub const DEFAULT_MAX_SIDE: u32 = 2400;

/// Filesystem path behind an image locator. Accepts plain paths and
/// `file://` URIs.
pub fn locator_path(locator: &str) -> PathBuf {
    PathBuf::from(locator.strip_prefix("file://").unwrap_or(locator))
}

/// How an image is normalised before it reaches the recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Downscale so neither side exceeds this many pixels.
    pub max_side: u32,
    /// Stretch the luma histogram to improve faint or low-contrast text.
    pub equalize: bool,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            max_side: DEFAULT_MAX_SIDE,
            equalize: true,
        }
    }
}

/// A single image moving through the preparation steps.
///
/// Each step consumes `self` and returns the transformed image, so steps
/// chain:
///
/// ```ignore
/// let ready = PageImage::open("receipt.jpg")?
///     .downscale(2400)
///     .grayscale()
///     .equalize()
///     .into_dynamic();
/// ```
pub struct PageImage {
    image: DynamicImage,
}

impl PageImage {
    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TextwerkError> {
        let image = image::open(path.as_ref()).map_err(|err| {
            TextwerkError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = image.width(), height = image.height(), "Image loaded");
        Ok(Self { image })
    }

    /// Decode an image from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, TextwerkError> {
        let image = image::load_from_memory(data).map_err(|err| {
            TextwerkError::ImageError(format!("failed to decode image: {}", err))
        })?;
        debug!(width = image.width(), height = image.height(), "Image decoded from bytes");
        Ok(Self { image })
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Shrink so that neither side exceeds `max_side`, preserving aspect
    /// ratio. Images already small enough are returned untouched.
    pub fn downscale(self, max_side: u32) -> Self {
        let (width, height) = (self.image.width(), self.image.height());
        if max_side == 0 || (width <= max_side && height <= max_side) {
            return self;
        }
        debug!(from_w = width, from_h = height, max_side, "Downscaling image");
        let resized = self
            .image
            .resize(max_side, max_side, image::imageops::FilterType::Lanczos3);
        Self { image: resized }
    }

    pub fn grayscale(self) -> Self {
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    /// Histogram equalisation on the luma channel.
    pub fn equalize(self) -> Self {
        let luma = self.image.to_luma8();
        Self {
            image: DynamicImage::ImageLuma8(equalize_histogram(&luma)),
        }
    }

    /// Apply every step selected by `options`.
    #[instrument(skip(self), fields(width = self.image.width(), height = self.image.height()))]
    pub fn prepare(self, options: &PrepareOptions) -> Self {
        let page = self.downscale(options.max_side).grayscale();
        if options.equalize { page.equalize() } else { page }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn file_uri_locators_become_paths() {
        assert_eq!(locator_path("file:///tmp/a.jpg"), PathBuf::from("/tmp/a.jpg"));
        assert_eq!(locator_path("/tmp/b.png"), PathBuf::from("/tmp/b.png"));
    }

    #[test]
    fn downscale_caps_longest_side() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4000, 1000, Rgb([10, 20, 30])));
        let page = PageImage::from_dynamic(img).downscale(2000);
        assert_eq!(page.width(), 2000);
        assert_eq!(page.height(), 500);
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 200, Rgb([0, 0, 0])));
        let page = PageImage::from_dynamic(img).downscale(2400);
        assert_eq!((page.width(), page.height()), (300, 200));
    }

    #[test]
    fn prepare_yields_luma() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 32, Rgb([200, 180, 160])));
        let ready = PageImage::from_dynamic(img)
            .prepare(&PrepareOptions::default())
            .into_dynamic();
        assert!(matches!(ready, DynamicImage::ImageLuma8(_)));
        assert_eq!((ready.width(), ready.height()), (64, 32));
    }

    #[test]
    fn equalize_spreads_narrow_histogram() {
        let mut gray = GrayImage::from_pixel(16, 16, Luma([120u8]));
        for x in 0..16 {
            gray.put_pixel(x, 0, Luma([130u8]));
        }
        let out = PageImage::from_dynamic(DynamicImage::ImageLuma8(gray))
            .equalize()
            .into_dynamic()
            .to_luma8();
        let dark = out.get_pixel(0, 1).0[0];
        let light = out.get_pixel(0, 0).0[0];
        assert!(light > dark);
        assert!(light - dark > 10, "expected stretched contrast, got {dark}..{light}");
    }

    #[test]
    fn garbage_bytes_are_an_image_error() {
        let err = PageImage::from_bytes(b"definitely not an image").err().unwrap();
        assert!(matches!(err, TextwerkError::ImageError(_)));
    }

    #[test]
    fn open_missing_file_is_an_image_error() {
        let err = PageImage::open("/nonexistent/textwerk/page.png").err().unwrap();
        assert!(matches!(err, TextwerkError::ImageError(_)));
    }
}
