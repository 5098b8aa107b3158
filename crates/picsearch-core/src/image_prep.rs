//! Image preprocessing: fit an image into the embedding API's payload limits
//!
//! Large images are downscaled to a pixel budget, converted to RGB and
//! re-encoded as JPEG with decreasing quality until the payload fits.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

use crate::{Config, Result};

const START_QUALITY: u8 = 95;
const MIN_QUALITY: u8 = 20;
const QUALITY_STEP: u8 = 10;

/// Share of `max_bytes` the raw JPEG may use; base64 adds about a third.
const BASE64_HEADROOM: f64 = 0.7;

/// Payload limits applied before upload.
#[derive(Debug, Clone, Copy)]
pub struct ImageLimits {
    pub max_pixels: u64,
    pub max_bytes: u64,
}

impl From<&Config> for ImageLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_pixels: config.max_pixels,
            max_bytes: config.max_bytes,
        }
    }
}

/// An image ready to send as an `image_base64` content piece.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// `data:image/jpeg;base64,...`
    pub data_url: String,
    pub width: u32,
    pub height: u32,
    /// Whether the image was downscaled
    pub resized: bool,
    /// Final JPEG quality
    pub quality: u8,
}

/// Load an image from disk and encode it for upload.
pub fn encode_file(path: &Path, limits: &ImageLimits) -> Result<EncodedImage> {
    let img = image::open(path)?;
    let encoded = encode_image(img, limits)?;
    if encoded.resized {
        tracing::info!(
            "Resized {} to {}x{}",
            path.display(),
            encoded.width,
            encoded.height
        );
    }
    Ok(encoded)
}

/// Downscale and JPEG-encode a decoded image.
pub fn encode_image(img: DynamicImage, limits: &ImageLimits) -> Result<EncodedImage> {
    let (img, resized) = fit_pixels(img, limits.max_pixels);
    let rgb = img.to_rgb8();

    let budget = (limits.max_bytes as f64 * BASE64_HEADROOM) as usize;
    let mut quality = START_QUALITY;
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        JpegEncoder::new_with_quality(&mut buffer, quality).encode_image(&rgb)?;

        if buffer.len() <= budget || quality <= MIN_QUALITY {
            break;
        }
        quality = quality.saturating_sub(QUALITY_STEP).max(MIN_QUALITY);
    }

    tracing::debug!(
        "Encoded {}x{} image at quality {} ({} bytes)",
        rgb.width(),
        rgb.height(),
        quality,
        buffer.len()
    );

    Ok(EncodedImage {
        data_url: format!("data:image/jpeg;base64,{}", STANDARD.encode(&buffer)),
        width: rgb.width(),
        height: rgb.height(),
        resized,
        quality,
    })
}

/// Scale the image down so `width * height <= max_pixels`, keeping the aspect ratio.
fn fit_pixels(img: DynamicImage, max_pixels: u64) -> (DynamicImage, bool) {
    let (width, height) = (img.width(), img.height());
    let pixels = width as u64 * height as u64;

    if max_pixels == 0 || pixels <= max_pixels {
        return (img, false);
    }

    let scale = (max_pixels as f64 / pixels as f64).sqrt();
    let new_width = ((width as f64 * scale) as u32).max(1);
    let new_height = ((height as f64 * scale) as u32).max(1);

    (
        img.resize_exact(new_width, new_height, FilterType::Lanczos3),
        true,
    )
}
