//! Final sharpening and contrast pass on the standardized photo.
//!
//! Both filters touch the RGB channels only; alpha passes through untouched.

use image::RgbaImage;

/// Unsharp-mask strength applied by [`sharpen`].
pub const SHARPEN_AMOUNT: f32 = 0.2;

/// Contrast boost applied by [`adjust_contrast`]. 1.0 leaves the image as is.
pub const CONTRAST_BOOST: f32 = 1.1;

/// 4-neighbor unsharp mask.
///
/// Each interior channel value becomes
/// `center + (center - mean(up, down, left, right)) * amount`, clamped to
/// 0..=255. The outermost 1-pixel ring is copied unchanged. Reads come from
/// the input only, so the result does not depend on traversal order.
pub fn sharpen(image: &RgbaImage, amount: f32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let mut out = image.clone();
    if width < 3 || height < 3 {
        return out;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = image.get_pixel(x, y).0;
            let up = image.get_pixel(x, y - 1).0;
            let down = image.get_pixel(x, y + 1).0;
            let left = image.get_pixel(x - 1, y).0;
            let right = image.get_pixel(x + 1, y).0;

            let pixel = out.get_pixel_mut(x, y);
            for c in 0..3 {
                let avg = (up[c] as f32 + down[c] as f32 + left[c] as f32 + right[c] as f32) / 4.0;
                let value = center[c] as f32 + (center[c] as f32 - avg) * amount;
                pixel.0[c] = value.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    out
}

/// Multiplier of the standard contrast curve for a boost such as `1.1`.
///
/// The boost is turned into a normalized contrast amount `boost - 1.0` and
/// fed to `259 (c·255 + 255) / (255 (259 − c·255))`.
pub fn contrast_factor(boost: f32) -> f32 {
    let c = (boost - 1.0) * 255.0;
    (259.0 * (c + 255.0)) / (255.0 * (259.0 - c))
}

/// Linear contrast stretch around mid-gray.
///
/// Takes ownership and rewrites the buffer in place; callers hand over a
/// freshly produced image that nothing else references.
pub fn adjust_contrast(mut image: RgbaImage, boost: f32) -> RgbaImage {
    let factor = contrast_factor(boost);
    for pixel in image.pixels_mut() {
        for c in 0..3 {
            let value = factor * (pixel.0[c] as f32 - 128.0) + 128.0;
            pixel.0[c] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    image
}
