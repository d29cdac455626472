//! Page image cleanup ahead of OCR
//!
//! Grayscale, Gaussian-weighted adaptive threshold, then a linear upscale.
//! The transform is pure: the same bitmap and parameters always produce the
//! same bytes.

use crate::config::PreprocessConfig;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

const WHITE: Luma<u8> = Luma([255]);
const BLACK: Luma<u8> = Luma([0]);

/// Binarize and upscale a rendered page for recognition
pub fn preprocess(page: &DynamicImage, config: &PreprocessConfig) -> GrayImage {
    let gray = page.to_luma8();
    let binary = adaptive_threshold(&gray, config.window, config.constant);
    upscale(&binary, config.scale)
}

/// Threshold each pixel against its Gaussian-weighted neighbourhood mean.
///
/// A pixel becomes white when it is strictly brighter than the local mean
/// minus `constant`, black otherwise.
pub fn adaptive_threshold(gray: &GrayImage, window: u32, constant: f32) -> GrayImage {
    if gray.width() == 0 || gray.height() == 0 {
        return gray.clone();
    }

    let local_mean = gaussian_blur_f32(gray, window_sigma(window));

    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let threshold = local_mean.get_pixel(x, y)[0] as f32 - constant;
        let value = if pixel[0] as f32 > threshold { WHITE } else { BLACK };
        out.put_pixel(x, y, value);
    }
    out
}

/// Gaussian sigma for a square window, same derivation OpenCV uses for
/// `getGaussianKernel` when sigma is left unspecified.
fn window_sigma(window: u32) -> f32 {
    let window = window.max(3) as f32;
    0.3 * ((window - 1.0) * 0.5 - 1.0) + 0.8
}

/// Scale both axes by `factor` with linear interpolation
pub fn upscale(image: &GrayImage, factor: f32) -> GrayImage {
    let width = scaled(image.width(), factor);
    let height = scaled(image.height(), factor);
    if (width, height) == image.dimensions() {
        return image.clone();
    }
    image::imageops::resize(image, width, height, FilterType::Triangle)
}

fn scaled(length: u32, factor: f32) -> u32 {
    if length == 0 {
        return 0;
    }
    ((length as f32 * factor).round() as u32).max(1)
}
