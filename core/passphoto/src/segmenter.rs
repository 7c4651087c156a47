use image::RgbaImage;

use crate::model::ModelError;

/// Pluggable background segmentation backend.
///
/// Given a cropped portrait, returns an image of the same content with
/// non-subject pixels made transparent. The output may differ in size from
/// the input; the processor rescales it onto the standard canvas.
pub trait BackgroundRemover: Send + Sync {
    /// Make the underlying model ready. Called before every segmentation.
    fn ensure_loaded(&self) -> Result<(), ModelError> {
        Ok(())
    }

    /// Remove the background of `image`.
    fn remove_background(&self, image: &RgbaImage) -> Result<RgbaImage, ModelError>;
}
