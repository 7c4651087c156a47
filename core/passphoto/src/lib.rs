//! Document photos: validate a portrait against passport-style composition
//! rules, standardize it to 3×4 cm at 300 DPI on a white background, and lay
//! copies out on printable sheets.
//!
//! Face detection and background removal are supplied by the host through the
//! [`FaceDetector`] and [`BackgroundRemover`] traits.
//!
//! # Example
//!
//! ```no_run
//! use passphoto::{decode_image, layout_grid, Processor, SheetLayout, Validator};
//! # fn run(
//! #     detector: &dyn passphoto::FaceDetector,
//! #     segmenter: &dyn passphoto::BackgroundRemover,
//! # ) -> Result<(), passphoto::IdPhotoError> {
//! let image = decode_image(&std::fs::read("portrait.jpg").unwrap())?;
//! let report = Validator::new().validate(&image, detector)?;
//! if let Some(face) = report.face_data().filter(|_| report.is_valid()) {
//!     let photo = Processor::new().process(&image, face, segmenter)?;
//!     let sheet = layout_grid(&photo, SheetLayout::A4)?;
//!     std::fs::write("sheet.jpg", sheet.encode()?.data).unwrap();
//! }
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]

mod caption;
mod crop;
mod encode;
mod enhance;
mod error;
/// Face detection capability and landmark types.
pub mod face_detector;
/// Landmark measurements: pose, eye and mouth openness, framing.
pub mod geometry;
/// Print sheet layouts.
pub mod layout;
/// Load-once model state for capability implementations.
pub mod model;
/// Crop, background removal and recomposition into the standard photo.
pub mod process;
/// Background removal capability.
pub mod segmenter;
/// Physical units at print resolution.
pub mod units;
/// Composition checks.
pub mod validate;
/// Upload to layout state machine.
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_helpers;

/// Crop window computation around a detected face.
pub use crop::{crop_region, face_crop_frame, CropFrame, CropRegion, FRAME_HEIGHT_FACTOR};
/// Decoding and encoding at the host boundary.
pub use encode::{
    decode_image, encode_rgb, encode_rgba_png, EncodedImage, OutputFormat, DEFAULT_QUALITY,
};
/// Sharpen and contrast filters.
pub use enhance::{adjust_contrast, contrast_factor, sharpen, CONTRAST_BOOST, SHARPEN_AMOUNT};
/// Error type returned by passphoto operations.
pub use error::IdPhotoError;
/// Face detection trait and its result types.
pub use face_detector::{DetectedFace, FaceBox, FaceDetector, LandmarkSet, LANDMARK_COUNT};
/// Points and pose angles.
pub use geometry::{Point, PoseAngles};
/// Sheet layouts.
pub use layout::{layout_grid, CellRect, GridMargin, PrintSheet, SheetLayout, SheetSpec};
/// Lazy model loading.
pub use model::{LazyModel, ModelError};
/// Photo standardization.
pub use process::{recompose_on_white, ProcessedPhoto, Processor};
/// Background removal trait.
pub use segmenter::BackgroundRemover;
/// Composition checks and their report.
pub use validate::{
    CheckName, ValidationCheck, ValidationReport, ValidationThresholds, Validator,
};
/// Workflow state machine and driver.
pub use workflow::{transition, Effect, Rejection, Workflow, WorkflowEvent, WorkflowState};
