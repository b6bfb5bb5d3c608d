//! Turning a decoded image into the network input blob.
use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::errors::{ClassifyError, ClassifyResult};

/// How an image is shaped and normalized into a `(1, 3, height, width)` blob.
///
/// Blob channels come in decoded order, B, G, R, and `mean` is given in that
/// same order. `swap_rb` turns them into R, G, B.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobParams {
    pub width: u32,
    pub height: u32,
    pub mean: [f32; 3],
    pub scale: f32,
    pub swap_rb: bool,
    /// Resize keeping the aspect ratio, then center-crop, instead of stretching.
    pub crop: bool,
}

impl Default for BlobParams {
    fn default() -> BlobParams {
        BlobParams {
            width: 224,
            height: 224,
            mean: [104.0, 117.0, 123.0],
            scale: 1.0,
            swap_rb: false,
            crop: true,
        }
    }
}

pub fn read_image(path: impl AsRef<Path>) -> ClassifyResult<RgbImage> {
    let path = path.as_ref();
    let image = image::open(path)
        .map_err(|e| ClassifyError::ImageRead { path: path.to_owned(), source: Some(e) })?
        .to_rgb8();
    if image.width() == 0 || image.height() == 0 {
        return Err(ClassifyError::ImageRead { path: path.to_owned(), source: None });
    }
    Ok(image)
}

/// Builds the blob: `(pixel - mean) * scale` for every channel.
pub fn blob_from_image(image: &RgbImage, params: &BlobParams) -> Tensor {
    let fitted = fit(image, params);
    let channels = if params.swap_rb { [0, 1, 2] } else { [2, 1, 0] };
    tract_ndarray::Array4::from_shape_fn(
        (1, 3, params.height as usize, params.width as usize),
        |(_, c, y, x)| {
            (fitted[(x as _, y as _)][channels[c]] as f32 - params.mean[c]) * params.scale
        },
    )
    .into()
}

fn fit(image: &RgbImage, params: &BlobParams) -> RgbImage {
    let (width, height) = (params.width, params.height);
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    if !params.crop {
        return imageops::resize(image, width, height, FilterType::Triangle);
    }
    let factor =
        f32::max(width as f32 / image.width() as f32, height as f32 / image.height() as f32);
    let scaled_width = ((image.width() as f32 * factor).round() as u32).max(width);
    let scaled_height = ((image.height() as f32 * factor).round() as u32).max(height);
    trace!(
        "Resizing {:?} to {}x{} before cropping to {}x{}",
        image.dimensions(),
        scaled_width,
        scaled_height,
        width,
        height
    );
    let scaled = imageops::resize(image, scaled_width, scaled_height, FilterType::Triangle);
    let x = (scaled_width - width) / 2;
    let y = (scaled_height - height) / 2;
    imageops::crop_imm(&scaled, x, y, width, height).to_image()
}
