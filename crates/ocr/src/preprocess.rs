//! Image preparation before recognition.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};

/// Images narrower or shorter than this are upscaled.
pub const MIN_DIMENSION: u32 = 300;

/// Contrast gain applied around the mean grey level.
pub const CONTRAST_FACTOR: f32 = 1.5;

/// Greyscale, upscale small images, then boost contrast.
pub fn preprocess(image: DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray;
    }

    let gray = if width < MIN_DIMENSION || height < MIN_DIMENSION {
        let scale = f64::max(
            MIN_DIMENSION as f64 / width as f64,
            MIN_DIMENSION as f64 / height as f64,
        );
        let new_width = ((width as f64 * scale) as u32).max(1);
        let new_height = ((height as f64 * scale) as u32).max(1);
        log::debug!("Upscaling {}x{} to {}x{}", width, height, new_width, new_height);
        image::imageops::resize(&gray, new_width, new_height, FilterType::Lanczos3)
    } else {
        gray
    };

    enhance_contrast(&gray, CONTRAST_FACTOR)
}

/// Scale every pixel's distance from the mean grey level by `factor`.
pub fn enhance_contrast(gray: &GrayImage, factor: f32) -> GrayImage {
    let count = gray.width() as u64 * gray.height() as u64;
    if count == 0 {
        return gray.clone();
    }

    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    let mean = (sum as f64 / count as f64).round() as f32;

    let mut out = gray.clone();
    for pixel in out.pixels_mut() {
        let value = mean + factor * (pixel.0[0] as f32 - mean);
        *pixel = Luma([value.round().clamp(0.0, 255.0) as u8]);
    }
    out
}
