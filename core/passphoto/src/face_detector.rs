use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::IdPhotoError;
use crate::geometry::Point;
use crate::model::ModelError;

/// Number of points in the 68-point facial landmark layout.
pub const LANDMARK_COUNT: usize = 68;

const JAW: std::ops::Range<usize> = 0..17;
const RIGHT_EYEBROW: std::ops::Range<usize> = 17..22;
const LEFT_EYEBROW: std::ops::Range<usize> = 22..27;
const NOSE: std::ops::Range<usize> = 27..36;
const RIGHT_EYE: std::ops::Range<usize> = 36..42;
const LEFT_EYE: std::ops::Range<usize> = 42..48;
const MOUTH: std::ops::Range<usize> = 48..68;

/// Index of the nose tip within the nose group.
const NOSE_TIP: usize = 3;

/// Inner-lip landmarks, as offsets into the mouth group.
const INNER_MOUTH_LEFT: usize = 12;
const INNER_MOUTH_TOP: usize = 14;
const INNER_MOUTH_RIGHT: usize = 16;
const INNER_MOUTH_BOTTOM: usize = 18;

/// Bounding box of a detected face within an image.
///
/// Boxes reaching outside the image are representable; containment is a
/// validation check, not a construction rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    /// X coordinate of the top-left corner (pixels).
    pub x: f64,
    /// Y coordinate of the top-left corner (pixels).
    pub y: f64,
    /// Width of the bounding box (pixels).
    pub width: f64,
    /// Height of the bounding box (pixels).
    pub height: f64,
}

impl FaceBox {
    /// Create a box from its top-left corner and size.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center of the box.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// The 68 facial landmarks of one face, grouped by feature.
///
/// Uses the iBUG 300-W ordering shared by dlib and face-api models. "Left"
/// and "right" refer to the subject's own sides, so the right eye appears on
/// the image's left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    /// Build a landmark set, rejecting any point count other than 68.
    pub fn new(points: Vec<Point>) -> Result<Self, IdPhotoError> {
        if points.len() != LANDMARK_COUNT {
            return Err(IdPhotoError::InvalidLandmarks {
                expected: LANDMARK_COUNT,
                actual: points.len(),
            });
        }
        Ok(Self { points })
    }

    /// All points in model order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Jawline, 17 points from the right ear to the left ear.
    pub fn jaw(&self) -> &[Point] {
        &self.points[JAW]
    }

    /// Right eyebrow (subject's right), 5 points.
    pub fn right_eyebrow(&self) -> &[Point] {
        &self.points[RIGHT_EYEBROW]
    }

    /// Left eyebrow, 5 points.
    pub fn left_eyebrow(&self) -> &[Point] {
        &self.points[LEFT_EYEBROW]
    }

    /// Nose bridge and base, 9 points.
    pub fn nose(&self) -> &[Point] {
        &self.points[NOSE]
    }

    /// Point 30, the tip of the nose.
    pub fn nose_tip(&self) -> Point {
        self.nose()[NOSE_TIP]
    }

    /// Subject's right eye: outer corner, upper lid ×2, inner corner, lower lid ×2.
    pub fn right_eye(&self) -> [Point; 6] {
        std::array::from_fn(|i| self.points[RIGHT_EYE.start + i])
    }

    /// Subject's left eye, same point order as [`LandmarkSet::right_eye`].
    pub fn left_eye(&self) -> [Point; 6] {
        std::array::from_fn(|i| self.points[LEFT_EYE.start + i])
    }

    /// Outer lip (12 points) followed by inner lip (8 points).
    pub fn mouth(&self) -> &[Point] {
        &self.points[MOUTH]
    }

    /// Inner-lip corners and midpoints: (left corner, top, right corner, bottom).
    pub fn inner_mouth(&self) -> (Point, Point, Point, Point) {
        let mouth = self.mouth();
        (
            mouth[INNER_MOUTH_LEFT],
            mouth[INNER_MOUTH_TOP],
            mouth[INNER_MOUTH_RIGHT],
            mouth[INNER_MOUTH_BOTTOM],
        )
    }
}

impl TryFrom<Vec<Point>> for LandmarkSet {
    type Error = IdPhotoError;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<LandmarkSet> for Vec<Point> {
    fn from(set: LandmarkSet) -> Self {
        set.points
    }
}

/// One face returned by a detector: its box and its landmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    /// Bounding box, serialized as `box`.
    #[serde(rename = "box")]
    pub face_box: FaceBox,
    /// The 68 landmark points.
    pub landmarks: LandmarkSet,
}

/// Pluggable face detection and landmark backend.
///
/// The host constructs one detector and passes it by reference wherever
/// detection is needed. Implementations that hold model weights should load
/// them through [`crate::LazyModel`] so `ensure_loaded` is cheap after the
/// first success.
pub trait FaceDetector: Send + Sync {
    /// Make the underlying model ready. Called before every detection.
    fn ensure_loaded(&self) -> Result<(), ModelError> {
        Ok(())
    }

    /// Detect all faces in an RGB image.
    ///
    /// An empty vector means no face was found. Model failures must be
    /// reported as `Err`, never as an empty result.
    fn detect(&self, image: &RgbImage) -> Result<Vec<DetectedFace>, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_points(n: usize) -> Vec<Point> {
        (0..n).map(|i| Point::new(i as f64, 0.0)).collect()
    }

    #[test]
    fn rejects_wrong_point_count() {
        let err = LandmarkSet::new(numbered_points(5)).unwrap_err();
        assert!(matches!(
            err,
            IdPhotoError::InvalidLandmarks {
                expected: 68,
                actual: 5
            }
        ));
    }

    #[test]
    fn groups_cover_expected_indices() {
        let set = LandmarkSet::new(numbered_points(68)).unwrap();
        assert_eq!(set.jaw().len(), 17);
        assert_eq!(set.right_eyebrow()[0].x, 17.0);
        assert_eq!(set.left_eyebrow()[0].x, 22.0);
        assert_eq!(set.nose().len(), 9);
        assert_eq!(set.nose_tip().x, 30.0);
        assert_eq!(set.right_eye()[0].x, 36.0);
        assert_eq!(set.right_eye()[5].x, 41.0);
        assert_eq!(set.left_eye()[0].x, 42.0);
        assert_eq!(set.mouth().len(), 20);

        let (left, top, right, bottom) = set.inner_mouth();
        assert_eq!(
            (left.x, top.x, right.x, bottom.x),
            (60.0, 62.0, 64.0, 66.0)
        );
    }

    #[test]
    fn face_box_center() {
        let face = FaceBox::new(300.0, 200.0, 300.0, 400.0);
        assert_eq!(face.center(), Point::new(450.0, 400.0));
    }
}
