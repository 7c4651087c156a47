//! Pose, aspect-ratio and framing measurements derived from face landmarks.
//!
//! Everything here is plain arithmetic over points that have already been
//! produced by a detector. None of these functions fail; degenerate inputs
//! (coincident corner points, zero-height images) yield `0.0`.
//!
//! The pose estimate is a coarse geometric approximation from eye and nose
//! positions, not a 3-D head pose solver. Pitch is not estimated.

use serde::{Deserialize, Serialize};

use crate::face_detector::FaceBox;

/// Scale factor turning the normalized nose offset into degrees of yaw.
///
/// Empirical, uncalibrated. Treat it as a tuning knob.
pub const YAW_SCALE_DEGREES: f64 = 45.0;

/// A 2D point in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position, growing to the right.
    pub x: f64,
    /// Vertical position, growing downwards.
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Point halfway to `other`.
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl std::ops::Mul<f64> for Point {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

/// Head orientation estimated from landmarks, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseAngles {
    /// Horizontal rotation. Positive when the nose tip sits right of the eye midpoint.
    pub yaw: f64,
    /// In-plane tilt of the line through both eye centroids.
    pub roll: f64,
}

/// Mean of a group of points. An empty group yields the origin.
pub fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::new(0.0, 0.0);
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point::new(sx / n, sy / n)
}

/// Estimate yaw and roll from the two eye groups and the nose tip.
///
/// Roll is the angle of the vector from the right-eye centroid to the
/// left-eye centroid. Yaw is the horizontal nose-tip offset from the eye
/// midpoint, divided by the interocular distance and scaled by
/// [`YAW_SCALE_DEGREES`].
pub fn estimate_pose(right_eye: &[Point], left_eye: &[Point], nose_tip: Point) -> PoseAngles {
    let right = centroid(right_eye);
    let left = centroid(left_eye);

    let roll = (left.y - right.y).atan2(left.x - right.x).to_degrees();

    let interocular = right.distance(&left);
    let yaw = if interocular > 0.0 {
        let offset = nose_tip.x - right.midpoint(&left).x;
        (offset / interocular) * YAW_SCALE_DEGREES
    } else {
        0.0
    };

    PoseAngles { yaw, roll }
}

/// Eye aspect ratio of a 6-point eye contour.
///
/// Points are ordered: outer corner, two upper-lid points, inner corner, two
/// lower-lid points. The two lid-to-lid distances are averaged and divided by
/// the corner-to-corner distance.
pub fn eye_aspect_ratio(eye: &[Point; 6]) -> f64 {
    let vertical = eye[1].distance(&eye[5]) + eye[2].distance(&eye[4]);
    let horizontal = eye[0].distance(&eye[3]);
    if horizontal == 0.0 {
        return 0.0;
    }
    vertical / (2.0 * horizontal)
}

/// Mouth aspect ratio from the inner lip: top-to-bottom over corner-to-corner.
pub fn mouth_aspect_ratio(
    left_corner: Point,
    top: Point,
    right_corner: Point,
    bottom: Point,
) -> f64 {
    let horizontal = left_corner.distance(&right_corner);
    if horizontal == 0.0 {
        return 0.0;
    }
    top.distance(&bottom) / horizontal
}

/// Whether `face` lies at least `margin` pixels inside every image edge.
pub fn is_within_frame(face: &FaceBox, image_width: u32, image_height: u32, margin: f64) -> bool {
    face.x >= margin
        && face.y >= margin
        && face.x + face.width <= image_width as f64 - margin
        && face.y + face.height <= image_height as f64 - margin
}

/// Face box height as a fraction of image height.
pub fn head_size_ratio(face: &FaceBox, image_height: u32) -> f64 {
    if image_height == 0 {
        return 0.0;
    }
    face.height / image_height as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eye_at(cx: f64, cy: f64, width: f64, opening: f64) -> [Point; 6] {
        let half_w = width / 2.0;
        let half_o = opening / 2.0;
        [
            Point::new(cx - half_w, cy),
            Point::new(cx - half_w / 3.0, cy - half_o),
            Point::new(cx + half_w / 3.0, cy - half_o),
            Point::new(cx + half_w, cy),
            Point::new(cx + half_w / 3.0, cy + half_o),
            Point::new(cx - half_w / 3.0, cy + half_o),
        ]
    }

    #[test]
    fn level_eyes_have_zero_roll() {
        let right = eye_at(100.0, 200.0, 40.0, 12.0);
        let left = eye_at(200.0, 200.0, 40.0, 12.0);
        let pose = estimate_pose(&right, &left, Point::new(150.0, 250.0));
        assert!(pose.roll.abs() < 1e-9);
        assert!(pose.yaw.abs() < 1e-9);
    }

    #[test]
    fn diagonal_eyes_give_45_degree_roll() {
        let right = eye_at(100.0, 100.0, 40.0, 12.0);
        let left = eye_at(200.0, 200.0, 40.0, 12.0);
        let pose = estimate_pose(&right, &left, Point::new(150.0, 200.0));
        assert!((pose.roll - 45.0).abs() < 1e-9);
    }

    #[test]
    fn nose_offset_drives_yaw() {
        let right = eye_at(100.0, 200.0, 40.0, 12.0);
        let left = eye_at(200.0, 200.0, 40.0, 12.0);
        // Offset of 20 px over an interocular distance of 100 px → 0.2 × 45 = 9°
        let pose = estimate_pose(&right, &left, Point::new(170.0, 250.0));
        assert!((pose.yaw - 9.0).abs() < 1e-9);

        let pose = estimate_pose(&right, &left, Point::new(130.0, 250.0));
        assert!((pose.yaw + 9.0).abs() < 1e-9);
    }

    #[test]
    fn coincident_eyes_give_zero_yaw() {
        let eye = eye_at(100.0, 100.0, 40.0, 12.0);
        let pose = estimate_pose(&eye, &eye, Point::new(140.0, 150.0));
        assert_eq!(pose.yaw, 0.0);
    }

    #[test]
    fn ear_matches_opening_over_width() {
        let eye = eye_at(0.0, 0.0, 40.0, 12.0);
        assert!((eye_aspect_ratio(&eye) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn ear_is_scale_invariant() {
        let eye = eye_at(50.0, 80.0, 30.0, 6.0);
        let base = eye_aspect_ratio(&eye);
        for k in [0.5, 2.0, 7.25] {
            let scaled = eye.map(|p| p * k);
            assert!((eye_aspect_ratio(&scaled) - base).abs() < 1e-9, "k = {k}");
        }
    }

    #[test]
    fn ear_of_degenerate_eye_is_zero() {
        let eye = [Point::new(3.0, 3.0); 6];
        assert_eq!(eye_aspect_ratio(&eye), 0.0);
    }

    #[test]
    fn mar_of_open_mouth() {
        let mar = mouth_aspect_ratio(
            Point::new(0.0, 0.0),
            Point::new(25.0, -10.0),
            Point::new(50.0, 0.0),
            Point::new(25.0, 10.0),
        );
        assert!((mar - 0.4).abs() < 1e-9);
    }

    #[test]
    fn frame_containment_respects_margin() {
        let inside = FaceBox::new(20.0, 20.0, 60.0, 60.0);
        assert!(is_within_frame(&inside, 100, 100, 20.0));

        let touching_left = FaceBox::new(19.0, 20.0, 60.0, 60.0);
        assert!(!is_within_frame(&touching_left, 100, 100, 20.0));

        let past_bottom = FaceBox::new(20.0, 21.0, 60.0, 60.0);
        assert!(!is_within_frame(&past_bottom, 100, 100, 20.0));

        let outside = FaceBox::new(-5.0, 10.0, 30.0, 30.0);
        assert!(!is_within_frame(&outside, 100, 100, 20.0));
    }

    #[test]
    fn head_ratio_is_height_fraction() {
        let face = FaceBox::new(0.0, 0.0, 100.0, 600.0);
        assert!((head_size_ratio(&face, 1000) - 0.6).abs() < 1e-12);
        assert_eq!(head_size_ratio(&face, 0), 0.0);
    }
}
