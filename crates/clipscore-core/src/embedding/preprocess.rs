//! Image preprocessing for CLIP vision towers.
//!
//! CLIP expects:
//! - Shortest side resized to the input size (bicubic), then center-cropped square
//! - Channel order: RGB
//! - Normalization: (pixel/255 - mean) / std with the OpenAI CLIP constants
//! - Tensor layout: NCHW [batch, channels, height, width]

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// CLIP normalization mean (per-channel, RGB).
const NORM_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP normalization std (per-channel, RGB).
const NORM_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Preprocess an image for CLIP inference.
pub fn preprocess(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let (width, height) = (image.width().max(1), image.height().max(1));
    let scale = image_size as f32 / width.min(height) as f32;
    let scaled_w = ((width as f32 * scale).round() as u32).max(image_size);
    let scaled_h = ((height as f32 * scale).round() as u32).max(image_size);

    let resized = image.resize_exact(scaled_w, scaled_h, FilterType::CatmullRom);
    let left = (scaled_w - image_size) / 2;
    let top = (scaled_h - image_size) / 2;
    let rgb = resized.crop_imm(left, top, image_size, image_size).to_rgb8();

    let size = image_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, size, size));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..CHANNELS {
            let val = pixel.0[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (val - NORM_MEAN[c]) / NORM_STD[c];
        }
    }

    tensor
}
