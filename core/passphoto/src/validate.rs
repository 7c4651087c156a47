//! Document-photo composition checks.
//!
//! [`Validator::validate`] runs the detector once and turns the result into
//! an ordered [`ValidationReport`]. A photo that fails the rules is not an
//! error: the report simply has `is_valid == false`. Only decode and model
//! failures come back as `Err`.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::IdPhotoError;
use crate::face_detector::{DetectedFace, FaceDetector};
use crate::geometry::{
    estimate_pose, eye_aspect_ratio, head_size_ratio, is_within_frame, mouth_aspect_ratio,
};
use crate::model::ModelError;

/// Largest accepted |yaw|, in degrees.
pub const MAX_YAW_DEGREES: f64 = 15.0;

/// Largest accepted |roll|, in degrees.
pub const MAX_ROLL_DEGREES: f64 = 15.0;

/// Each eye's aspect ratio must exceed this to count as open.
pub const MIN_EYE_ASPECT_RATIO: f64 = 0.15;

/// Required clearance between the face box and every image edge, in pixels.
pub const FRAME_MARGIN_PX: f64 = 20.0;

/// Smallest accepted face-height / image-height ratio (inclusive).
pub const MIN_HEAD_RATIO: f64 = 0.50;

/// Largest accepted face-height / image-height ratio (inclusive).
pub const MAX_HEAD_RATIO: f64 = 0.75;

/// The mouth aspect ratio must stay below this for a neutral expression.
pub const MAX_MOUTH_ASPECT_RATIO: f64 = 0.35;

/// Identifies one check in a [`ValidationReport`], in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckName {
    /// Exactly one face was found.
    FaceDetected,
    /// Yaw and roll are within limits.
    FaceFrontal,
    /// Both eyes are open.
    EyesVisible,
    /// The face box keeps its margin from every edge.
    FaceInFrame,
    /// Face height is within the accepted share of the image height.
    HeadSize,
    /// The mouth is closed.
    Expression,
    /// Placeholder for glasses and glare; always passes.
    GlassesCheck,
}

impl CheckName {
    /// Name as it appears in serialized reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckName::FaceDetected => "faceDetected",
            CheckName::FaceFrontal => "faceFrontal",
            CheckName::EyesVisible => "eyesVisible",
            CheckName::FaceInFrame => "faceInFrame",
            CheckName::HeadSize => "headSize",
            CheckName::Expression => "expression",
            CheckName::GlassesCheck => "glassesCheck",
        }
    }
}

impl std::fmt::Display for CheckName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCheck {
    /// Which check this is.
    pub name: CheckName,
    /// Whether the photo satisfies it.
    pub passed: bool,
    /// User-facing explanation.
    pub message: String,
    /// Extra information that does not affect the outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ValidationCheck {
    fn new(name: CheckName, passed: bool, message: impl Into<String>) -> Self {
        Self {
            name,
            passed,
            message: message.into(),
            note: None,
        }
    }

    fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Ordered results of one validation attempt.
///
/// Serialized as `{ checks, isValid, faceData }` where `checks` is an object
/// keyed by check name, in evaluation order. `isValid` is always recomputed
/// from the checks when a report is deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawReport")]
pub struct ValidationReport {
    #[serde(serialize_with = "checks_by_name::serialize")]
    checks: Vec<ValidationCheck>,
    is_valid: bool,
    face_data: Option<DetectedFace>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReport {
    #[serde(deserialize_with = "checks_by_name::deserialize")]
    checks: Vec<ValidationCheck>,
    #[serde(default)]
    face_data: Option<DetectedFace>,
}

impl From<RawReport> for ValidationReport {
    fn from(raw: RawReport) -> Self {
        ValidationReport::new(raw.checks, raw.face_data)
    }
}

mod checks_by_name {
    use std::fmt;

    use serde::de::{self, MapAccess, Visitor};
    use serde::{Deserializer, Serializer};

    use super::ValidationCheck;

    pub fn serialize<S: Serializer>(
        checks: &[ValidationCheck],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(checks.iter().map(|check| (check.name.as_str(), check)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<ValidationCheck>, D::Error> {
        deserializer.deserialize_map(ChecksVisitor)
    }

    struct ChecksVisitor;

    impl<'de> Visitor<'de> for ChecksVisitor {
        type Value = Vec<ValidationCheck>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map from check name to check")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut checks = Vec::with_capacity(map.size_hint().unwrap_or(0).min(7));
            while let Some((key, check)) = map.next_entry::<String, ValidationCheck>()? {
                if key != check.name.as_str() {
                    return Err(de::Error::custom(format!(
                        "check '{}' stored under key '{key}'",
                        check.name
                    )));
                }
                checks.push(check);
            }
            Ok(checks)
        }
    }
}

impl ValidationReport {
    fn new(checks: Vec<ValidationCheck>, face_data: Option<DetectedFace>) -> Self {
        let is_valid = checks.iter().all(|check| check.passed);
        Self {
            checks,
            is_valid,
            face_data,
        }
    }

    /// True when every reported check passed.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Checks in evaluation order.
    pub fn checks(&self) -> &[ValidationCheck] {
        &self.checks
    }

    /// Look up a check by name. `None` if it was not evaluated.
    pub fn check(&self, name: CheckName) -> Option<&ValidationCheck> {
        self.checks.iter().find(|check| check.name == name)
    }

    /// Checks that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &ValidationCheck> {
        self.checks.iter().filter(|check| !check.passed)
    }

    /// The single detected face. Present only when exactly one face was found.
    pub fn face_data(&self) -> Option<&DetectedFace> {
        self.face_data.as_ref()
    }
}

/// Acceptance limits for each check. Defaults come from the module constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationThresholds {
    /// See [`MAX_YAW_DEGREES`].
    pub max_yaw_degrees: f64,
    /// See [`MAX_ROLL_DEGREES`].
    pub max_roll_degrees: f64,
    /// See [`MIN_EYE_ASPECT_RATIO`].
    pub min_eye_aspect_ratio: f64,
    /// See [`FRAME_MARGIN_PX`].
    pub frame_margin_px: f64,
    /// See [`MIN_HEAD_RATIO`].
    pub min_head_ratio: f64,
    /// See [`MAX_HEAD_RATIO`].
    pub max_head_ratio: f64,
    /// See [`MAX_MOUTH_ASPECT_RATIO`].
    pub max_mouth_aspect_ratio: f64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            max_yaw_degrees: MAX_YAW_DEGREES,
            max_roll_degrees: MAX_ROLL_DEGREES,
            min_eye_aspect_ratio: MIN_EYE_ASPECT_RATIO,
            frame_margin_px: FRAME_MARGIN_PX,
            min_head_ratio: MIN_HEAD_RATIO,
            max_head_ratio: MAX_HEAD_RATIO,
            max_mouth_aspect_ratio: MAX_MOUTH_ASPECT_RATIO,
        }
    }
}

/// Runs the composition checks against a face detector.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    thresholds: ValidationThresholds,
}

impl Validator {
    /// Validator with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the acceptance limits.
    pub fn thresholds(mut self, thresholds: ValidationThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Detect faces in `image` and evaluate every check.
    ///
    /// With zero or several faces only `faceDetected` is reported. With one
    /// face all seven checks are reported and the face is attached to the
    /// report whether or not the other checks pass.
    pub fn validate(
        &self,
        image: &DynamicImage,
        detector: &dyn FaceDetector,
    ) -> Result<ValidationReport, IdPhotoError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(IdPhotoError::ZeroDimensions);
        }

        detector.ensure_loaded().map_err(detector_error)?;
        let faces = detector.detect(&image.to_rgb8()).map_err(detector_error)?;
        log::debug!("detector returned {} face(s)", faces.len());

        let report = match <[DetectedFace; 1]>::try_from(faces) {
            Ok([face]) => {
                let checks = self.face_checks(&face, image.width(), image.height());
                ValidationReport::new(checks, Some(face))
            }
            Err(faces) if faces.is_empty() => ValidationReport::new(
                vec![ValidationCheck::new(
                    CheckName::FaceDetected,
                    false,
                    "No face detected. Use a photo showing one face clearly.",
                )],
                None,
            ),
            Err(faces) => ValidationReport::new(
                vec![ValidationCheck::new(
                    CheckName::FaceDetected,
                    false,
                    format!(
                        "Multiple faces detected ({}). The photo must show exactly one person.",
                        faces.len()
                    ),
                )],
                None,
            ),
        };

        for failed in report.failures() {
            log::debug!("check {} failed: {}", failed.name, failed.message);
        }
        log::info!(
            "validation finished: {} ({} check(s))",
            if report.is_valid() { "valid" } else { "invalid" },
            report.checks().len()
        );

        Ok(report)
    }

    fn face_checks(
        &self,
        face: &DetectedFace,
        image_width: u32,
        image_height: u32,
    ) -> Vec<ValidationCheck> {
        let limits = &self.thresholds;
        let landmarks = &face.landmarks;
        let right_eye = landmarks.right_eye();
        let left_eye = landmarks.left_eye();

        let mut checks = Vec::with_capacity(7);
        checks.push(ValidationCheck::new(
            CheckName::FaceDetected,
            true,
            "Face detected",
        ));

        let pose = estimate_pose(&right_eye, &left_eye, landmarks.nose_tip());
        let frontal =
            pose.yaw.abs() <= limits.max_yaw_degrees && pose.roll.abs() <= limits.max_roll_degrees;
        checks.push(ValidationCheck::new(
            CheckName::FaceFrontal,
            frontal,
            if frontal {
                "Face is looking straight at the camera".to_string()
            } else {
                format!(
                    "Face is turned or tilted (yaw {:.1}°, roll {:.1}°). Look straight at the camera.",
                    pose.yaw, pose.roll
                )
            },
        ));

        let right_ear = eye_aspect_ratio(&right_eye);
        let left_ear = eye_aspect_ratio(&left_eye);
        let eyes_open =
            right_ear > limits.min_eye_aspect_ratio && left_ear > limits.min_eye_aspect_ratio;
        checks.push(ValidationCheck::new(
            CheckName::EyesVisible,
            eyes_open,
            if eyes_open {
                "Both eyes are open".to_string()
            } else {
                format!(
                    "Eyes appear closed (ratios {right_ear:.2} / {left_ear:.2}). Keep both eyes open."
                )
            },
        ));

        let in_frame = is_within_frame(
            &face.face_box,
            image_width,
            image_height,
            limits.frame_margin_px,
        );
        checks.push(ValidationCheck::new(
            CheckName::FaceInFrame,
            in_frame,
            if in_frame {
                "Face is fully inside the frame"
            } else {
                "Face is too close to the edge of the photo"
            },
        ));

        let head_ratio = head_size_ratio(&face.face_box, image_height);
        let head_ok = (limits.min_head_ratio..=limits.max_head_ratio).contains(&head_ratio);
        let head_message = if head_ok {
            format!("Head size is correct ({:.0}% of height)", head_ratio * 100.0)
        } else if head_ratio < limits.min_head_ratio {
            format!(
                "Head is too small ({:.0}% of height). Move closer to the camera.",
                head_ratio * 100.0
            )
        } else {
            format!(
                "Head is too large ({:.0}% of height). Move away from the camera.",
                head_ratio * 100.0
            )
        };
        checks.push(ValidationCheck::new(
            CheckName::HeadSize,
            head_ok,
            head_message,
        ));

        let (mouth_left, mouth_top, mouth_right, mouth_bottom) = landmarks.inner_mouth();
        let mar = mouth_aspect_ratio(mouth_left, mouth_top, mouth_right, mouth_bottom);
        let neutral = mar < limits.max_mouth_aspect_ratio;
        checks.push(ValidationCheck::new(
            CheckName::Expression,
            neutral,
            if neutral {
                "Neutral expression".to_string()
            } else {
                format!("Mouth appears open (ratio {mar:.2}). Keep a neutral expression.")
            },
        ));

        checks.push(
            ValidationCheck::new(
                CheckName::GlassesCheck,
                true,
                "Glasses check not performed",
            )
            .with_note("Glasses and glare are not detected automatically. Remove glasses before taking the photo."),
        );

        checks
    }
}

fn detector_error(err: ModelError) -> IdPhotoError {
    match err {
        ModelError::Unavailable(msg) => IdPhotoError::ModelUnavailable(msg),
        ModelError::Inference(msg) => IdPhotoError::DetectionFailed(msg),
    }
}
