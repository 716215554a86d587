use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;

use crate::bitmap::{Bitmap, BitmapFormat};

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("invalid dimensions {width}x{height} with stride {stride}")]
    Dimensions { width: i32, height: i32, stride: i32 },

    #[error("buffer holds {actual} bytes, {expected} needed")]
    ShortBuffer { expected: usize, actual: usize },

    #[error("unknown bitmap format")]
    UnknownFormat,

    #[error("png:{0}")]
    Png(#[from] image::ImageError),
}

/// Rejects negative dimensions and buffers whose size overflows an `i32`.
pub fn check_dimensions(stride: i32, width: i32, height: i32) -> bool {
    if stride < 0 || width < 0 || height < 0 {
        return false;
    }
    if height > 0 && stride > i32::MAX / height {
        return false;
    }
    true
}

pub fn encode_png(
    input: &[u8],
    width: i32,
    height: i32,
    stride: i32,
    format: BitmapFormat,
) -> Result<Vec<u8>, EncodeError> {
    if !check_dimensions(stride, width, height) {
        return Err(EncodeError::Dimensions {
            width,
            height,
            stride,
        });
    }
    let (color_type, channels) = match format {
        BitmapFormat::Unknown => return Err(EncodeError::UnknownFormat),
        BitmapFormat::Gray => (ExtendedColorType::L8, 1),
        BitmapFormat::Bgr | BitmapFormat::Bgrx => (ExtendedColorType::Rgb8, 3),
        BitmapFormat::Bgra => (ExtendedColorType::Rgba8, 4),
    };

    let (width, height, stride) = (width as usize, height as usize, stride as usize);
    let row_bytes = width * format.bytes_per_pixel();
    if stride < row_bytes {
        return Err(EncodeError::Dimensions {
            width: width as i32,
            height: height as i32,
            stride: stride as i32,
        });
    }
    let expected = stride * height;
    if input.len() < expected {
        return Err(EncodeError::ShortBuffer {
            expected,
            actual: input.len(),
        });
    }

    let mut pixels = Vec::with_capacity(width * height * channels);
    for row in input.chunks(stride.max(1)).take(height) {
        let row = &row[..row_bytes];
        match format {
            BitmapFormat::Gray => pixels.extend_from_slice(row),
            BitmapFormat::Bgr => {
                for px in row.chunks_exact(3) {
                    pixels.extend_from_slice(&[px[2], px[1], px[0]]);
                }
            }
            BitmapFormat::Bgrx => {
                for px in row.chunks_exact(4) {
                    pixels.extend_from_slice(&[px[2], px[1], px[0]]);
                }
            }
            BitmapFormat::Bgra => {
                for px in row.chunks_exact(4) {
                    pixels.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                }
            }
            BitmapFormat::Unknown => {}
        }
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(&pixels, width as u32, height as u32, color_type)?;
    Ok(png)
}

/// Encodes a bitmap in its own pixel format.
pub fn encode_bitmap(bitmap: &Bitmap) -> Result<Vec<u8>, EncodeError> {
    encode_png(
        bitmap.buffer(),
        bitmap.width(),
        bitmap.height(),
        bitmap.stride(),
        bitmap.format(),
    )
}
