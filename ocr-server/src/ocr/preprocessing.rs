use crate::config::{OcrConfig, RecognitionLevel, RecognitionOptions};
use crate::error::{OcrServerError, Result};
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};

/// An uploaded image decoded and normalized for the recognition engine.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// Pixel size of the image as uploaded.
    pub source_width: u32,
    pub source_height: u32,
    /// Grayscale PNG handed to the engine. May be downscaled.
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode image bytes and prepare them for OCR.
///
/// `Accurate` keeps the configured maximum dimension and stretches contrast.
/// `Fast` halves the maximum dimension and skips the contrast pass.
///
/// Fails with [`OcrServerError::Decode`] when the bytes are not a raster image
/// with a known size.
pub fn prepare_image(
    bytes: &[u8],
    config: &OcrConfig,
    options: &RecognitionOptions,
) -> Result<PreparedImage> {
    let img = decode(bytes)?;
    let (source_width, source_height) = img.dimensions();
    if source_width == 0 || source_height == 0 {
        return Err(OcrServerError::Decode(format!(
            "Image has no pixels: {source_width}x{source_height}"
        )));
    }

    let max_dim = match options.level {
        RecognitionLevel::Accurate => config.max_image_dimension,
        RecognitionLevel::Fast => (config.max_image_dimension / 2).max(config.min_image_dimension),
    };

    let img = resize_if_needed(img, max_dim);
    let gray = img.to_luma8();
    let gray = match options.level {
        RecognitionLevel::Accurate => enhance_grayscale_contrast(gray),
        RecognitionLevel::Fast => gray,
    };
    let (width, height) = gray.dimensions();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(gray)
        .write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| OcrServerError::Recognition(format!("Failed to encode image: {e}")))?;

    Ok(PreparedImage {
        source_width,
        source_height,
        png,
        width,
        height,
    })
}

fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| OcrServerError::Decode(format!("Failed to read image: {e}")))?
        .decode()
        .map_err(|e| OcrServerError::Decode(format!("Failed to decode image: {e}")))
}

/// Downscale so neither side exceeds `max_dim`, keeping the aspect ratio.
fn resize_if_needed(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if max_dim == 0 || (width <= max_dim && height <= max_dim) {
        return img;
    }

    let ratio = max_dim as f32 / width.max(height) as f32;
    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);

    img.resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

/// Histogram stretch: darkest pixel maps to 0, lightest to 255.
fn enhance_grayscale_contrast(gray: image::GrayImage) -> image::GrayImage {
    let (min_val, max_val) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    if max_val <= min_val {
        return gray;
    }

    let range = (max_val - min_val) as f32;
    image::GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let pixel = gray.get_pixel(x, y);
        let normalized = (pixel[0] - min_val) as f32 / range;
        image::Luma([(normalized * 255.0).round() as u8])
    })
}
