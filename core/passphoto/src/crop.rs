use image::{imageops, DynamicImage, RgbaImage};

use crate::error::IdPhotoError;
use crate::face_detector::FaceBox;

/// Portrait aspect ratio: 3:4 (width / height)
const PORTRAIT_ASPECT: f64 = 3.0 / 4.0;

/// Crop height as a multiple of the face box height (face + hair + shoulders).
pub const FRAME_HEIGHT_FACTOR: f64 = 1.6;

/// Fraction of the crop height kept above the face center.
/// 0.5 would center the face; 0.4 leaves more headroom above than below.
const FACE_VERTICAL_ANCHOR: f64 = 0.4;

/// Largest crop accepted, as a multiple of the source image area.
const MAX_CROP_AREA_FACTOR: u64 = 16;

/// Unclamped crop window around a face, in source coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropFrame {
    /// Left edge; negative when the frame starts left of the image.
    pub x: f64,
    /// Top edge; negative when the frame starts above the image.
    pub y: f64,
    /// Frame width (3/4 of the height).
    pub width: f64,
    /// Frame height.
    pub height: f64,
}

/// Crop region actually sampled from the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    /// Left edge in source pixels.
    pub x: u32,
    /// Top edge in source pixels.
    pub y: u32,
    /// Output width.
    pub width: u32,
    /// Output height.
    pub height: u32,
}

/// Compute the 3:4 crop window for a face box.
///
/// `height_factor` scales the face height into the crop height. The face
/// center sits horizontally centered and 40% down from the top of the crop.
pub fn face_crop_frame(face: &FaceBox, height_factor: f64) -> CropFrame {
    let height = face.height * height_factor;
    let width = height * PORTRAIT_ASPECT;
    let center = face.center();

    CropFrame {
        x: center.x - width / 2.0,
        y: center.y - height * FACE_VERTICAL_ANCHOR,
        width,
        height,
    }
}

/// Round a crop frame to the pixel region that will be sampled.
///
/// A negative origin is clamped to 0 without moving the window back over the
/// face, so a face close to the top or left edge ends up off-center in the
/// crop. The output size is always the rounded frame size.
pub fn crop_region(frame: &CropFrame) -> CropRegion {
    if frame.x < 0.0 || frame.y < 0.0 {
        log::warn!(
            "crop origin ({:.1}, {:.1}) clamped to the image edge; subject will be off-center",
            frame.x,
            frame.y
        );
    }

    CropRegion {
        x: frame.x.max(0.0).round() as u32,
        y: frame.y.max(0.0).round() as u32,
        width: frame.width.round() as u32,
        height: frame.height.round() as u32,
    }
}

/// Cut the crop region for `face` out of `image` into a new RGBA buffer.
///
/// Parts of the region that fall past the right or bottom edge of the source
/// stay fully transparent.
pub fn crop_to_face(
    image: &DynamicImage,
    face: &FaceBox,
    height_factor: f64,
) -> Result<RgbaImage, IdPhotoError> {
    let frame = face_crop_frame(face, height_factor);
    if ![frame.x, frame.y, frame.width, frame.height]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(IdPhotoError::ProcessingError(format!(
            "face box {}x{} yields a non-finite crop",
            face.width, face.height
        )));
    }

    let region = crop_region(&frame);
    log::debug!("crop frame {frame:?} → region {region:?}");

    if region.width == 0 || region.height == 0 {
        return Err(IdPhotoError::ProcessingError(format!(
            "face box {}x{} yields an empty crop",
            face.width, face.height
        )));
    }

    let (src_w, src_h) = (image.width(), image.height());
    let area = u64::from(region.width) * u64::from(region.height);
    let limit = (u64::from(src_w) * u64::from(src_h)).saturating_mul(MAX_CROP_AREA_FACTOR);
    let fits_memory = area
        .checked_mul(4)
        .is_some_and(|bytes| usize::try_from(bytes).is_ok());
    if area > limit || !fits_memory {
        return Err(IdPhotoError::ProcessingError(format!(
            "crop {}x{} is too large for a {src_w}x{src_h} image",
            region.width, region.height
        )));
    }

    let mut out = RgbaImage::new(region.width, region.height);
    if region.x < src_w && region.y < src_h {
        let visible_w = region.width.min(src_w - region.x);
        let visible_h = region.height.min(src_h - region.y);
        let visible = image
            .crop_imm(region.x, region.y, visible_w, visible_h)
            .to_rgba8();
        imageops::replace(&mut out, &visible, 0, 0);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn frame_follows_face_geometry() {
        let face = FaceBox::new(300.0, 200.0, 300.0, 400.0);
        let frame = face_crop_frame(&face, FRAME_HEIGHT_FACTOR);
        assert!((frame.height - 640.0).abs() < 1e-9);
        assert!((frame.width - 480.0).abs() < 1e-9);
        // center (450, 400)
        assert!((frame.x - 210.0).abs() < 1e-9);
        assert!((frame.y - 144.0).abs() < 1e-9);
    }

    #[test]
    fn face_sits_below_vertical_center() {
        let face = FaceBox::new(100.0, 100.0, 100.0, 100.0);
        let frame = face_crop_frame(&face, FRAME_HEIGHT_FACTOR);
        let face_center_in_crop = face.center().y - frame.y;
        assert!(face_center_in_crop < frame.height / 2.0);
    }

    #[test]
    fn negative_origin_is_clamped_not_recentered() {
        let frame = CropFrame {
            x: -30.4,
            y: -12.0,
            width: 300.4,
            height: 400.6,
        };
        let region = crop_region(&frame);
        assert_eq!(
            region,
            CropRegion {
                x: 0,
                y: 0,
                width: 300,
                height: 401,
            }
        );
    }

    #[test]
    fn crop_output_has_rounded_frame_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1000, 1000, Rgb([10, 20, 30])));
        let face = FaceBox::new(300.0, 200.0, 300.0, 400.0);
        let crop = crop_to_face(&img, &face, FRAME_HEIGHT_FACTOR).unwrap();
        assert_eq!(crop.dimensions(), (480, 640));
        assert_eq!(crop.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn region_past_the_edge_is_transparent() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 200, Rgb([200, 100, 50])));
        // Face near the bottom-right corner: the frame overhangs both edges.
        let face = FaceBox::new(170.0, 150.0, 40.0, 40.0);
        let crop = crop_to_face(&img, &face, FRAME_HEIGHT_FACTOR).unwrap();
        assert_eq!(crop.dimensions(), (48, 64));
        assert_eq!(crop.get_pixel(0, 0).0[3], 255);
        assert_eq!(crop.get_pixel(47, 63).0[3], 0);
    }

    #[test]
    fn shifted_crop_near_top_left() {
        let mut src = RgbImage::from_pixel(400, 400, Rgb([0, 0, 0]));
        src.put_pixel(0, 0, Rgb([255, 0, 0]));
        let img = DynamicImage::ImageRgb8(src);
        let face = FaceBox::new(0.0, 0.0, 100.0, 100.0);
        let crop = crop_to_face(&img, &face, FRAME_HEIGHT_FACTOR).unwrap();
        // Origin clamped to (0, 0): the source corner lands in the crop corner.
        assert_eq!(crop.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(crop.dimensions(), (120, 160));
    }

    #[test]
    fn oversized_face_box_is_an_error() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        let face = FaceBox::new(10.0, 10.0, 50.0, 3.0e9);
        assert!(matches!(
            crop_to_face(&img, &face, FRAME_HEIGHT_FACTOR),
            Err(IdPhotoError::ProcessingError(_))
        ));
    }

    #[test]
    fn non_finite_face_box_is_an_error() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        for face in [
            FaceBox::new(f64::NAN, 10.0, 50.0, 50.0),
            FaceBox::new(10.0, 10.0, 50.0, f64::INFINITY),
        ] {
            assert!(matches!(
                crop_to_face(&img, &face, FRAME_HEIGHT_FACTOR),
                Err(IdPhotoError::ProcessingError(_))
            ));
        }
    }

    #[test]
    fn face_box_larger_than_image_still_crops() {
        // Out-of-frame boxes are representable: 192x256 crop from a 100x100 source.
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 100, Rgb([1, 2, 3])));
        let face = FaceBox::new(0.0, 0.0, 120.0, 160.0);
        let crop = crop_to_face(&img, &face, FRAME_HEIGHT_FACTOR).unwrap();
        assert_eq!(crop.dimensions(), (192, 256));
    }

    #[test]
    fn degenerate_face_is_an_error() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
        let face = FaceBox::new(1.0, 1.0, 0.0, 0.0);
        assert!(matches!(
            crop_to_face(&img, &face, FRAME_HEIGHT_FACTOR),
            Err(IdPhotoError::ProcessingError(_))
        ));
    }
}
