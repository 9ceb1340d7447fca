use crate::utils::{PaymentProofError, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::map::map_colors;
use log::{debug, warn};
use std::io::Cursor;

/// Screenshots narrower than this are upscaled to recover small text.
pub const MIN_WIDTH: u32 = 800;
/// Photos wider than this are downscaled to bound processing cost.
pub const MAX_WIDTH: u32 = 1800;

const WHITE_ABOVE: f32 = 160.0;
const BLACK_BELOW: f32 = 80.0;
const MIDTONE_THRESHOLD: f32 = 120.0;

/// Normalizes uploaded photos and screenshots into a high-contrast bitmap
/// for text recognition.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Decode, rescale and binarize an uploaded image.
    ///
    /// Undecodable input yields an empty canvas so later stages report
    /// "no text found" instead of failing.
    pub fn preprocess(image_bytes: &[u8]) -> RgbaImage {
        let img = Self::load(image_bytes);
        if img.width() == 0 || img.height() == 0 {
            return img;
        }

        let (width, height) = Self::target_dimensions(img.width(), img.height());
        let scaled = if (width, height) == img.dimensions() {
            img
        } else {
            debug!(
                "Rescaling {}x{} -> {}x{}",
                img.width(),
                img.height(),
                width,
                height
            );
            imageops::resize(&img, width, height, FilterType::Lanczos3)
        };

        Self::binarize_image(&scaled)
    }

    /// Decode image bytes, falling back to an empty canvas.
    pub fn load(image_bytes: &[u8]) -> RgbaImage {
        match image::load_from_memory(image_bytes) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                warn!("Failed to decode image ({} bytes): {}", image_bytes.len(), e);
                RgbaImage::new(0, 0)
            }
        }
    }

    /// Width is clamped into [MIN_WIDTH, MAX_WIDTH], height follows the aspect ratio.
    pub fn target_dimensions(width: u32, height: u32) -> (u32, u32) {
        if width == 0 {
            return (width, height);
        }
        let target = if width < MIN_WIDTH {
            MIN_WIDTH
        } else if width > MAX_WIDTH {
            MAX_WIDTH
        } else {
            return (width, height);
        };
        let scaled_height = (height as f64 * target as f64 / width as f64).round().max(1.0);
        (target, scaled_height as u32)
    }

    /// Weighted luminance of an RGB pixel.
    pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
        0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
    }

    /// Bright pixels go white, dark pixels black, midtones split at 120.
    pub fn binarize(gray: f32) -> u8 {
        if gray > WHITE_ABOVE {
            255
        } else if gray < BLACK_BELOW {
            0
        } else if gray > MIDTONE_THRESHOLD {
            255
        } else {
            0
        }
    }

    /// Grayscale + binarize every pixel, keeping alpha.
    pub fn binarize_image(img: &RgbaImage) -> RgbaImage {
        map_colors(img, |p: Rgba<u8>| {
            let value = Self::binarize(Self::luminance(p[0], p[1], p[2]));
            Rgba([value, value, value, p[3]])
        })
    }

    pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        DynamicImage::ImageRgba8(img.clone())
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| {
                PaymentProofError::ImageProcessing(format!("Failed to encode image: {}", e))
            })?;
        Ok(buffer)
    }
}
