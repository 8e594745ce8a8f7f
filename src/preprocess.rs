//! # Preprocess: Status-Line Image Cleanup Before OCR
//!
//! Fixed pipeline applied to every captured frame:
//!
//! 1. Single-channel intensity (`to_luma8`).
//! 2. 2× upscale with Catmull-Rom (cubic) interpolation. Tesseract reads
//!    small UI fonts far better at roughly double size.
//! 3. Global binarization at the Otsu threshold: pixels strictly above the
//!    threshold become white, the rest black.
//! 4. 3×3 median filter, borders replicated, to drop isolated speckles left
//!    by antialiasing.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};

pub const UPSCALE: u32 = 2;

/// Run the full pipeline on a captured frame.
pub fn prepare(frame: &DynamicImage) -> GrayImage {
    let gray = frame.to_luma8();
    let scaled = imageops::resize(
        &gray,
        gray.width() * UPSCALE,
        gray.height() * UPSCALE,
        FilterType::CatmullRom,
    );
    let level = otsu_level(&scaled);
    let binary = binarize(&scaled, level);
    median3(&binary)
}

/// Otsu's threshold: the level maximizing between-class variance.
pub fn otsu_level(image: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for p in image.pixels() {
        histogram[p[0] as usize] += 1;
    }
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }
    let weighted_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut background_weight = 0u64;
    let mut background_sum = 0.0f64;
    let mut best_variance = 0.0f64;
    let mut best_level = 0u8;
    for (level, &count) in histogram.iter().enumerate() {
        background_weight += count;
        if background_weight == 0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight == 0 {
            break;
        }
        background_sum += level as f64 * count as f64;
        let mean_b = background_sum / background_weight as f64;
        let mean_f = (weighted_sum - background_sum) / foreground_weight as f64;
        let variance =
            background_weight as f64 * foreground_weight as f64 * (mean_b - mean_f).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }
    best_level
}

pub fn binarize(image: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y)[0] > level {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// 3×3 median with replicated borders.
pub fn median3(image: &GrayImage) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }
    GrayImage::from_fn(w, h, |x, y| {
        let mut window = [0u8; 9];
        let mut i = 0;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let sx = (i64::from(x) + dx).clamp(0, i64::from(w) - 1) as u32;
                let sy = (i64::from(y) + dy).clamp(0, i64::from(h) - 1) as u32;
                window[i] = image.get_pixel(sx, sy)[0];
                i += 1;
            }
        }
        window.sort_unstable();
        Luma([window[4]])
    })
}
