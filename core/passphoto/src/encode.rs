use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageEncoder, RgbImage, RgbaImage};

use crate::error::IdPhotoError;

/// Quality used for every lossy output the crate hands back.
pub const DEFAULT_QUALITY: f32 = 0.95;

/// Output image format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// JPEG encoding at the requested quality.
    #[default]
    Jpeg,

    /// Lossless PNG encoding. Quality is ignored.
    Png,
}

impl OutputFormat {
    /// MIME type for download headers and data URLs.
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

/// Encoded bytes ready to hand to the host for saving or download.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// The encoded image bytes.
    pub data: Vec<u8>,

    /// The output format used.
    pub format: OutputFormat,

    /// Width of the encoded image in pixels.
    pub width: u32,

    /// Height of the encoded image in pixels.
    pub height: u32,
}

/// Decode input bytes (JPEG, PNG or WebP) into a `DynamicImage`.
pub fn decode_image(input: &[u8]) -> Result<DynamicImage, IdPhotoError> {
    let image =
        image::load_from_memory(input).map_err(|e| IdPhotoError::DecodeError(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(IdPhotoError::ZeroDimensions);
    }
    Ok(image)
}

/// Flatten alpha channel by compositing onto a white background.
pub(crate) fn flatten_alpha(image: &RgbaImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut rgb = RgbImage::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        rgb.put_pixel(x, y, image::Rgb(blend_over_white(pixel.0)));
    }

    rgb
}

/// Composite one RGBA value over white (255, 255, 255).
pub(crate) fn blend_over_white([r, g, b, a]: [u8; 4]) -> [u8; 3] {
    let alpha = a as f32 / 255.0;
    let inv_alpha = 1.0 - alpha;
    [
        (r as f32 * alpha + 255.0 * inv_alpha).round() as u8,
        (g as f32 * alpha + 255.0 * inv_alpha).round() as u8,
        (b as f32 * alpha + 255.0 * inv_alpha).round() as u8,
    ]
}

/// Encode an RGB image to the specified format at the given quality (0.0–1.0).
pub fn encode_rgb(
    image: &RgbImage,
    format: OutputFormat,
    quality: f32,
) -> Result<EncodedImage, IdPhotoError> {
    if !(0.0..=1.0).contains(&quality) {
        return Err(IdPhotoError::InvalidQuality(quality));
    }

    let mut buffer = Vec::new();
    match format {
        OutputFormat::Jpeg => {
            let quality_percent = ((quality * 100.0).round() as u8).max(1);
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality_percent);
            encoder
                .write_image(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    image::ExtendedColorType::Rgb8,
                )
                .map_err(|e| IdPhotoError::EncodeError(e.to_string()))?;
        }
        OutputFormat::Png => {
            let encoder = PngEncoder::new(&mut buffer);
            encoder
                .write_image(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    image::ExtendedColorType::Rgb8,
                )
                .map_err(|e| IdPhotoError::EncodeError(e.to_string()))?;
        }
    }

    Ok(EncodedImage {
        data: buffer,
        format,
        width: image.width(),
        height: image.height(),
    })
}

/// Encode an RGBA image as PNG, keeping transparency.
///
/// Used to hand the face crop to an external segmenter without losing the
/// transparent area past the source edges.
pub fn encode_rgba_png(image: &RgbaImage) -> Result<EncodedImage, IdPhotoError> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| IdPhotoError::EncodeError(e.to_string()))?;

    Ok(EncodedImage {
        data: buffer,
        format: OutputFormat::Png,
        width: image.width(),
        height: image.height(),
    })
}
