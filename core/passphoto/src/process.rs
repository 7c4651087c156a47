//! Turns a validated portrait into the standardized 3×4 cm photo.
//!
//! Stages, each feeding the next: crop around the face → background
//! removal → recompose on white at the standard size → sharpen → contrast.
//! A failure in any stage aborts the run; no partial photo is returned.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage, RgbaImage};

use crate::crop::{crop_to_face, FRAME_HEIGHT_FACTOR};
use crate::encode::{
    blend_over_white, encode_rgb, flatten_alpha, EncodedImage, OutputFormat, DEFAULT_QUALITY,
};
use crate::enhance::{adjust_contrast, sharpen, CONTRAST_BOOST, SHARPEN_AMOUNT};
use crate::error::IdPhotoError;
use crate::face_detector::{DetectedFace, FaceBox};
use crate::model::ModelError;
use crate::segmenter::BackgroundRemover;
use crate::units::{cm_to_px, DPI, PHOTO_HEIGHT_CM, PHOTO_WIDTH_CM};

/// The standardized photo: fixed size, white background.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedPhoto {
    image: RgbImage,
    quality: f32,
}

impl ProcessedPhoto {
    /// Wrap an already standardized image, e.g. one decoded from a previous run.
    pub fn from_image(image: RgbImage) -> Result<Self, IdPhotoError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(IdPhotoError::ZeroDimensions);
        }
        Ok(Self {
            image,
            quality: DEFAULT_QUALITY,
        })
    }

    /// Width in pixels (354 at 300 DPI).
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels (472 at 300 DPI).
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The raster.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Take the raster out.
    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Encode as JPEG at the quality configured on the [`Processor`].
    pub fn encode(&self) -> Result<EncodedImage, IdPhotoError> {
        encode_rgb(&self.image, OutputFormat::Jpeg, self.quality)
    }

    /// Encode with an explicit format and quality.
    pub fn encode_as(
        &self,
        format: OutputFormat,
        quality: f32,
    ) -> Result<EncodedImage, IdPhotoError> {
        encode_rgb(&self.image, format, quality)
    }
}

/// Builder for the photo processing pipeline.
#[derive(Debug, Clone)]
pub struct Processor {
    frame_height_factor: f64,
    sharpen_amount: f32,
    contrast_boost: f32,
    quality: f32,
    dpi: u32,
}

impl Default for Processor {
    fn default() -> Self {
        Self {
            frame_height_factor: FRAME_HEIGHT_FACTOR,
            sharpen_amount: SHARPEN_AMOUNT,
            contrast_boost: CONTRAST_BOOST,
            quality: DEFAULT_QUALITY,
            dpi: DPI,
        }
    }
}

impl Processor {
    /// Processor with the standard settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Crop height as a multiple of the face height (default: 1.6).
    pub fn frame_height_factor(mut self, factor: f64) -> Self {
        self.frame_height_factor = factor;
        self
    }

    /// Unsharp-mask strength (default: 0.2). `0.0` disables sharpening.
    pub fn sharpen_amount(mut self, amount: f32) -> Self {
        self.sharpen_amount = amount;
        self
    }

    /// Contrast boost (default: 1.1). `1.0` disables the contrast pass.
    pub fn contrast_boost(mut self, boost: f32) -> Self {
        self.contrast_boost = boost;
        self
    }

    /// JPEG quality from 0.0 to 1.0 used by [`ProcessedPhoto::encode`] (default: 0.95).
    pub fn quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }

    /// Output resolution (default: 300).
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Pixel size of the standardized photo at the configured DPI.
    pub fn canvas_size(&self) -> (u32, u32) {
        (
            cm_to_px(PHOTO_WIDTH_CM, self.dpi),
            cm_to_px(PHOTO_HEIGHT_CM, self.dpi),
        )
    }

    /// Run the full pipeline for the face found during validation.
    pub fn process(
        &self,
        image: &DynamicImage,
        face: &DetectedFace,
        segmenter: &dyn BackgroundRemover,
    ) -> Result<ProcessedPhoto, IdPhotoError> {
        self.check_settings()?;

        let cropped = self.crop(image, &face.face_box)?;
        log::debug!("cropped to {}x{}", cropped.width(), cropped.height());

        segmenter.ensure_loaded().map_err(segmenter_error)?;
        let segmented = segmenter
            .remove_background(&cropped)
            .map_err(segmenter_error)?;
        log::debug!("background removed");

        self.finish(&segmented)
    }

    /// First stage only: the crop that gets handed to the segmenter.
    pub fn crop(&self, image: &DynamicImage, face: &FaceBox) -> Result<RgbaImage, IdPhotoError> {
        crop_to_face(image, face, self.frame_height_factor)
    }

    /// Remaining stages for an image whose background was already removed.
    pub fn finish(&self, segmented: &RgbaImage) -> Result<ProcessedPhoto, IdPhotoError> {
        self.check_settings()?;

        let (canvas_w, canvas_h) = self.canvas_size();
        let composed = recompose_on_white(segmented, canvas_w, canvas_h)?;
        log::debug!("recomposed on {canvas_w}x{canvas_h} white canvas");

        let sharpened = sharpen(&composed, self.sharpen_amount);
        let optimized = adjust_contrast(sharpened, self.contrast_boost);

        Ok(ProcessedPhoto {
            image: flatten_alpha(&optimized),
            quality: self.quality,
        })
    }

    fn check_settings(&self) -> Result<(), IdPhotoError> {
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(IdPhotoError::InvalidQuality(self.quality));
        }
        if self.dpi == 0 {
            return Err(IdPhotoError::ProcessingError("dpi must be > 0".into()));
        }
        Ok(())
    }
}

/// Scale `segmented` uniformly to fit a white `canvas_w`×`canvas_h` canvas and center it.
///
/// The scale is `min(canvas_w / w, canvas_h / h)`, so the image is never
/// cropped. Transparent pixels show the white background.
pub fn recompose_on_white(
    segmented: &RgbaImage,
    canvas_w: u32,
    canvas_h: u32,
) -> Result<RgbaImage, IdPhotoError> {
    let (src_w, src_h) = segmented.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(IdPhotoError::ProcessingError(
            "segmented image is empty".into(),
        ));
    }
    if canvas_w == 0 || canvas_h == 0 {
        return Err(IdPhotoError::ProcessingError("canvas is empty".into()));
    }

    let scale = (canvas_w as f64 / src_w as f64).min(canvas_h as f64 / src_h as f64);
    let draw_w = ((src_w as f64 * scale).round() as u32).clamp(1, canvas_w);
    let draw_h = ((src_h as f64 * scale).round() as u32).clamp(1, canvas_h);
    let offset_x = (canvas_w - draw_w) / 2;
    let offset_y = (canvas_h - draw_h) / 2;

    let resized = if (draw_w, draw_h) == (src_w, src_h) {
        segmented.clone()
    } else {
        imageops::resize(segmented, draw_w, draw_h, FilterType::Lanczos3)
    };

    let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, image::Rgba([255, 255, 255, 255]));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let [r, g, b] = blend_over_white(pixel.0);
        canvas.put_pixel(offset_x + x, offset_y + y, image::Rgba([r, g, b, 255]));
    }

    Ok(canvas)
}

fn segmenter_error(err: ModelError) -> IdPhotoError {
    match err {
        ModelError::Unavailable(msg) => IdPhotoError::ModelUnavailable(msg),
        ModelError::Inference(msg) => IdPhotoError::SegmentationFailed(msg),
    }
}
