/// Classifier input preparation
///
/// Photos of any resolution and colour mode are force-fitted to the
/// classifier's 224x224 RGB input. Content outside the target aspect ratio
/// is cropped (centered), never padded.

use image::{imageops::FilterType, DynamicImage, ImageReader};
use ndarray::Array4;
use std::path::Path;

use crate::error::{InspectError, Result};

/// Side length of the square classifier input
pub const INPUT_SIZE: u32 = 224;

/// Classifier input, NHWC layout `[1, 224, 224, 3]`, values in 0..=255
pub type InputTensor = Array4<f32>;

/// Decode an image from disk, sniffing the format from its content
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let reader = ImageReader::open(path)
        .map_err(|e| InspectError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| InspectError::io(path, e))?;

    reader.decode().map_err(|e| InspectError::decode(path, e))
}

/// Load a photo and turn it into a classifier tensor
pub fn preprocess(path: &Path) -> Result<InputTensor> {
    let img = load_image(path)?;
    Ok(preprocess_image(&img))
}

/// Turn a decoded photo into a classifier tensor
///
/// Grayscale sources are replicated across three channels and alpha (or any
/// extra channel) is dropped.
pub fn preprocess_image(img: &DynamicImage) -> InputTensor {
    let fitted = img.resize_to_fill(INPUT_SIZE, INPUT_SIZE, FilterType::Lanczos3);
    let rgb = fitted.to_rgb8();

    let size = INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, size, size, 3));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, y as usize, x as usize, c]] = pixel[c] as f32;
        }
    }

    tensor
}
