//! Synthetic faces and fake capabilities for unit tests.

use image::{Rgba, RgbImage, RgbaImage};

use crate::face_detector::{DetectedFace, FaceBox, FaceDetector, LandmarkSet};
use crate::geometry::{Point, YAW_SCALE_DEGREES};
use crate::model::ModelError;
use crate::segmenter::BackgroundRemover;

/// Parameters of a synthetic 68-point face.
#[derive(Debug, Clone)]
pub struct SyntheticFace {
    pub face_box: FaceBox,
    pub right_ear: f64,
    pub left_ear: f64,
    pub mar: f64,
    pub roll_degrees: f64,
    pub yaw_degrees: f64,
}

impl Default for SyntheticFace {
    fn default() -> Self {
        Self {
            face_box: FaceBox::new(300.0, 200.0, 300.0, 600.0),
            right_ear: 0.3,
            left_ear: 0.3,
            mar: 0.1,
            roll_degrees: 0.0,
            yaw_degrees: 0.0,
        }
    }
}

fn eye_points(center: Point, width: f64, ear: f64) -> [Point; 6] {
    let half_w = width / 2.0;
    let half_o = ear * width / 2.0;
    [
        Point::new(center.x - half_w, center.y),
        Point::new(center.x - half_w / 3.0, center.y - half_o),
        Point::new(center.x + half_w / 3.0, center.y - half_o),
        Point::new(center.x + half_w, center.y),
        Point::new(center.x + half_w / 3.0, center.y + half_o),
        Point::new(center.x - half_w / 3.0, center.y + half_o),
    ]
}

/// Build landmarks whose measured EAR, MAR, roll and yaw match `params`.
pub fn synthetic_face(params: &SyntheticFace) -> DetectedFace {
    let b = params.face_box;
    let center = b.center();
    let interocular = b.width * 0.4;
    let eye_mid = Point::new(center.x, b.y + b.height * 0.4);

    let (sin, cos) = params.roll_degrees.to_radians().sin_cos();
    let half = interocular / 2.0;
    let right_center = Point::new(eye_mid.x - half * cos, eye_mid.y - half * sin);
    let left_center = Point::new(eye_mid.x + half * cos, eye_mid.y + half * sin);

    let mut points = Vec::with_capacity(68);

    // jaw
    for i in 0..17 {
        let t = std::f64::consts::PI * i as f64 / 16.0;
        points.push(Point::new(
            center.x - b.width / 2.0 * t.cos(),
            center.y + b.height / 2.0 * t.sin(),
        ));
    }
    // eyebrows
    for i in 0..5 {
        points.push(Point::new(
            right_center.x - 20.0 + 10.0 * i as f64,
            right_center.y - 30.0,
        ));
    }
    for i in 0..5 {
        points.push(Point::new(
            left_center.x - 20.0 + 10.0 * i as f64,
            left_center.y - 30.0,
        ));
    }
    // nose: bridge (4 points ending at the tip) then the base (5 points)
    let tip = Point::new(
        eye_mid.x + params.yaw_degrees / YAW_SCALE_DEGREES * interocular,
        center.y + b.height * 0.05,
    );
    for i in 0..4 {
        let t = i as f64 / 3.0;
        points.push(Point::new(
            eye_mid.x + (tip.x - eye_mid.x) * t,
            eye_mid.y + (tip.y - eye_mid.y) * t,
        ));
    }
    for i in 0..5 {
        points.push(Point::new(tip.x - 20.0 + 10.0 * i as f64, tip.y + 10.0));
    }
    // eyes
    let eye_width = b.width * 0.2;
    points.extend(eye_points(right_center, eye_width, params.right_ear));
    points.extend(eye_points(left_center, eye_width, params.left_ear));
    // mouth: 12 outer points then 8 inner points
    let mouth_center = Point::new(center.x, b.y + b.height * 0.75);
    let mouth_width = b.width * 0.4;
    for i in 0..12 {
        let t = std::f64::consts::TAU * i as f64 / 12.0;
        points.push(Point::new(
            mouth_center.x - mouth_width / 2.0 * t.cos(),
            mouth_center.y - mouth_width / 4.0 * t.sin(),
        ));
    }
    let inner_w = mouth_width * 0.8;
    let half_open = params.mar * inner_w / 2.0;
    let inner = [
        (-inner_w / 2.0, 0.0),
        (-inner_w / 4.0, -half_open),
        (0.0, -half_open),
        (inner_w / 4.0, -half_open),
        (inner_w / 2.0, 0.0),
        (inner_w / 4.0, half_open),
        (0.0, half_open),
        (-inner_w / 4.0, half_open),
    ];
    for (dx, dy) in inner {
        points.push(Point::new(mouth_center.x + dx, mouth_center.y + dy));
    }

    DetectedFace {
        face_box: b,
        landmarks: LandmarkSet::new(points).unwrap(),
    }
}

/// Detector returning a canned outcome.
pub struct FakeDetector {
    outcome: Result<Vec<DetectedFace>, ModelError>,
}

impl FakeDetector {
    pub fn with_faces(faces: Vec<DetectedFace>) -> Self {
        Self { outcome: Ok(faces) }
    }

    pub fn unavailable() -> Self {
        Self {
            outcome: Err(ModelError::Unavailable("weights not found".into())),
        }
    }

    pub fn failing() -> Self {
        Self {
            outcome: Err(ModelError::Inference("tensor shape mismatch".into())),
        }
    }
}

impl FaceDetector for FakeDetector {
    fn ensure_loaded(&self) -> Result<(), ModelError> {
        match &self.outcome {
            Err(ModelError::Unavailable(msg)) => Err(ModelError::Unavailable(msg.clone())),
            _ => Ok(()),
        }
    }

    fn detect(&self, _image: &RgbImage) -> Result<Vec<DetectedFace>, ModelError> {
        self.outcome.clone()
    }
}

/// Segmenter that makes every pixel equal to `key` transparent.
pub struct KeySegmenter {
    pub key: [u8; 3],
    pub fail: bool,
}

impl KeySegmenter {
    pub fn new(key: [u8; 3]) -> Self {
        Self { key, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            key: [0, 0, 0],
            fail: true,
        }
    }
}

impl BackgroundRemover for KeySegmenter {
    fn remove_background(&self, image: &RgbaImage) -> Result<RgbaImage, ModelError> {
        if self.fail {
            return Err(ModelError::Inference("segmentation mask empty".into()));
        }
        let mut out = image.clone();
        for pixel in out.pixels_mut() {
            let [r, g, b, _] = pixel.0;
            if [r, g, b] == self.key {
                *pixel = Rgba([r, g, b, 0]);
            }
        }
        Ok(out)
    }
}
