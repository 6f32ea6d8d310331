use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{dilate, erode};
use std::io::Cursor;
use thiserror::Error;

/// Glyph upscale before anything else.
pub const UPSCALE_FACTOR: f32 = 1.5;
/// Sigma of a 5×5 Gaussian kernel (OpenCV's derivation for ksize = 5).
const NOISE_BLUR_SIGMA: f32 = 1.1;
/// Sigma of the 11×11 Gaussian-weighted neighbourhood used for thresholding.
const THRESHOLD_BLOCK_SIGMA: f32 = 2.0;
/// Subtracted from the local mean before comparing.
const THRESHOLD_OFFSET: i16 = 2;
/// Radius 0 is a 1×1 structuring element.
const MORPH_RADIUS: u8 = 0;

#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// Decode raw upload bytes (JPEG / PNG / WEBP / …).
pub fn decode(data: &[u8]) -> Result<DynamicImage, EnhanceError> {
    Ok(image::load_from_memory(data)?)
}

/// Normalize a receipt photo into a black-on-white binary image.
///
/// Upscale (cubic) → luminance → 5×5 Gaussian blur → Gaussian adaptive
/// threshold (block 11, C = 2) → erode → dilate. Ink is 0, paper is 255.
pub fn enhance(img: &DynamicImage) -> GrayImage {
    if img.width() == 0 || img.height() == 0 {
        return GrayImage::new(img.width(), img.height());
    }

    let gray = upscale(img).to_luma8();
    let blurred = gaussian_blur_f32(&gray, NOISE_BLUR_SIGMA);
    let binary = adaptive_threshold(&blurred);
    let opened = erode(&binary, Norm::LInf, MORPH_RADIUS);
    dilate(&opened, Norm::LInf, MORPH_RADIUS)
}

/// Encode a grayscale image as PNG bytes for the recognizer.
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, EnhanceError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| EnhanceError::Encode(e.to_string()))?;
    Ok(buf)
}

fn upscale(img: &DynamicImage) -> DynamicImage {
    let width = ((img.width() as f32) * UPSCALE_FACTOR).round().max(1.0) as u32;
    let height = ((img.height() as f32) * UPSCALE_FACTOR).round().max(1.0) as u32;
    img.resize_exact(width, height, FilterType::CatmullRom)
}

/// A pixel stays paper when it is brighter than its Gaussian-weighted
/// neighbourhood mean minus the offset.
fn adaptive_threshold(gray: &GrayImage) -> GrayImage {
    let local_mean = gaussian_blur_f32(gray, THRESHOLD_BLOCK_SIGMA);
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let p = gray.get_pixel(x, y)[0] as i16;
        let t = local_mean.get_pixel(x, y)[0] as i16 - THRESHOLD_OFFSET;
        if p > t {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}
