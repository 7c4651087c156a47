use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum IdPhotoError {
    #[error("failed to decode image: {0}")]
    DecodeError(String),

    #[error("image dimensions are zero")]
    ZeroDimensions,

    #[error("expected {expected} landmark points, got {actual}")]
    InvalidLandmarks { expected: usize, actual: usize },

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("face detection failed: {0}")]
    DetectionFailed(String),

    #[error("background removal failed: {0}")]
    SegmentationFailed(String),

    #[error("photo processing failed: {0}")]
    ProcessingError(String),

    #[error("sheet layout failed: {0}")]
    LayoutError(String),

    #[error("failed to encode image: {0}")]
    EncodeError(String),

    #[error("quality must be between 0.0 and 1.0, got {0}")]
    InvalidQuality(f32),

    #[error("{0}")]
    NotReady(&'static str),
}
