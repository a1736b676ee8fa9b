//! Quality scoring stage.
//!
//! Pure numeric analysis over the grayscale frame, no models involved.
//! Five measurements (sharpness, exposure, noise, dynamic range, clipping)
//! are stored raw and folded into one weighted composite score in [0, 1].

use image::{DynamicImage, GrayImage};

use crate::data::media::FrameRecord;
use crate::pipeline::{FrameStage, StageError};

const SHARPNESS_WEIGHT: f64 = 2.0;
const EXPOSURE_WEIGHT: f64 = 1.0;
const NOISE_WEIGHT: f64 = 0.2;
const DYNAMIC_RANGE_WEIGHT: f64 = 1.0;
const CLIPPING_WEIGHT: f64 = 1.0;

/// Mid-gray that counts as ideally exposed on a 0-255 scale.
const IDEAL_BRIGHTNESS: f64 = 160.0;

pub struct QualityStage;

impl FrameStage for QualityStage {
    fn name(&self) -> &'static str {
        "quality"
    }

    fn process(&self, record: &mut FrameRecord, image: &DynamicImage) -> Result<(), StageError> {
        let gray = image.to_luma8();

        let sharpness = laplacian_variance(&gray);
        let (brightness, contrast) = exposure_measurement(&gray);
        let noise = noise_measurement(&gray);
        let dynamic_range = dynamic_range(&gray, 0.1);
        let clipping = clipping_fraction(&gray);

        record.measured_sharpness = Some(sharpness);
        record.measured_brightness = Some(brightness);
        record.measured_contrast = Some(contrast);
        record.measured_noise = Some(noise);
        record.measured_dynamic_range = Some(dynamic_range);
        record.measured_clipping = Some(clipping);
        record.quality_score = Some(composite_score(
            sharpness,
            brightness,
            contrast,
            noise,
            dynamic_range,
            clipping,
        ));

        Ok(())
    }
}

/// Variance of the 4-neighbor Laplacian; higher means sharper.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    let count = (width as f64) * (height as f64);
    if count == 0.0 {
        return 0.0;
    }

    let at = |x: i64, y: i64| -> f64 {
        let x = reflect_101(x, width as i64);
        let y = reflect_101(y, height as i64);
        gray.get_pixel(x, y).0[0] as f64
    };

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let response =
                at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y);
            sum += response;
            sum_sq += response * response;
        }
    }

    let mean = sum / count;
    sum_sq / count - mean * mean
}

/// Mean brightness and contrast (standard deviation of intensities).
pub fn exposure_measurement(gray: &GrayImage) -> (f64, f64) {
    let count = gray.len() as f64;
    if count == 0.0 {
        return (0.0, 0.0);
    }

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for pixel in gray.pixels() {
        let v = pixel.0[0] as f64;
        sum += v;
        sum_sq += v * v;
    }

    let mean = sum / count;
    let variance = (sum_sq / count - mean * mean).max(0.0);
    (mean, variance.sqrt())
}

/// Total absolute difference between the image and its 5x5 Gaussian blur;
/// residual high-frequency content reads as noise.
pub fn noise_measurement(gray: &GrayImage) -> i64 {
    let blurred = gaussian_blur_5x5(gray);
    gray.pixels()
        .zip(blurred.pixels())
        .map(|(a, b)| (a.0[0] as i64 - b.0[0] as i64).abs())
        .sum()
}

/// Mean of the brightest decile minus mean of the darkest decile.
pub fn dynamic_range(gray: &GrayImage, sample_fraction: f64) -> f64 {
    let mut pixels: Vec<u8> = gray.pixels().map(|p| p.0[0]).collect();
    if pixels.is_empty() {
        return 0.0;
    }
    pixels.sort_unstable();

    let sample_size = ((pixels.len() as f64 * sample_fraction) as usize).max(1);
    let darkest: f64 = pixels[..sample_size].iter().map(|&v| v as f64).sum::<f64>()
        / sample_size as f64;
    let brightest: f64 = pixels[pixels.len() - sample_size..]
        .iter()
        .map(|&v| v as f64)
        .sum::<f64>()
        / sample_size as f64;

    brightest - darkest
}

/// Fraction of pixels at exactly 0 or 255.
pub fn clipping_fraction(gray: &GrayImage) -> f64 {
    let count = gray.len();
    if count == 0 {
        return 0.0;
    }
    let clipped = gray
        .pixels()
        .filter(|p| p.0[0] == 0 || p.0[0] == 255)
        .count();
    clipped as f64 / count as f64
}

pub fn composite_score(
    sharpness: f64,
    brightness: f64,
    contrast: f64,
    noise: i64,
    dynamic_range: f64,
    clipping: f64,
) -> f64 {
    let sharpness_score = (sharpness / 2000.0).min(1.0);
    let brightness_score = 1.0 - ((brightness - IDEAL_BRIGHTNESS).abs() / IDEAL_BRIGHTNESS).min(1.0);
    let contrast_score = (contrast / 100.0).min(1.0);
    let noise_score = (1.0 - (noise as f64 / 2e8).min(1.0)).max(0.0);
    let dynamic_range_score = (dynamic_range / 100.0).min(1.0);
    let clipping_score = (1.0 - clipping / 0.1).max(0.0);

    let total_weight = SHARPNESS_WEIGHT
        + EXPOSURE_WEIGHT
        + NOISE_WEIGHT
        + DYNAMIC_RANGE_WEIGHT
        + CLIPPING_WEIGHT;

    (SHARPNESS_WEIGHT * sharpness_score
        + EXPOSURE_WEIGHT * (brightness_score + contrast_score) / 2.0
        + NOISE_WEIGHT * noise_score
        + DYNAMIC_RANGE_WEIGHT * dynamic_range_score
        + CLIPPING_WEIGHT * clipping_score)
        / total_weight
}

/// Separable 5x5 binomial Gaussian ([1 4 6 4 1] / 16) with mirrored
/// borders, rounded back to u8.
fn gaussian_blur_5x5(gray: &GrayImage) -> GrayImage {
    const KERNEL: [f64; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let mut horizontal = vec![0.0f64; (width * height) as usize];
    for y in 0..height {
        for x in 0..width as i64 {
            let mut acc = 0.0;
            for (k, weight) in KERNEL.iter().enumerate() {
                let sx = reflect_101(x + k as i64 - 2, width as i64);
                acc += weight * gray.get_pixel(sx, y).0[0] as f64;
            }
            horizontal[(y * width + x as u32) as usize] = acc;
        }
    }

    let mut out = GrayImage::new(width, height);
    for y in 0..height as i64 {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, weight) in KERNEL.iter().enumerate() {
                let sy = reflect_101(y + k as i64 - 2, height as i64);
                acc += weight * horizontal[sy as usize * width as usize + x as usize];
            }
            out.put_pixel(x, y as u32, image::Luma([acc.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// Mirror an out-of-range index without repeating the edge sample.
fn reflect_101(mut i: i64, len: i64) -> u32 {
    if len == 1 {
        return 0;
    }
    loop {
        if i < 0 {
            i = -i;
        } else if i >= len {
            i = 2 * (len - 1) - i;
        } else {
            return i as u32;
        }
    }
}
