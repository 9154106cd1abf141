//! Geometric signals from a face-mesh landmark set.
//!
//! All outputs are ratios of distances between fixed landmark pairs, so they
//! do not depend on camera resolution or distance to the camera. They do
//! drift under extreme pose, which is what the scorer's bands tolerate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CoordinateSpace, LandmarkSet, Point};

/// Face-mesh indices (468-point mesh with refined iris landmarks).
pub mod mesh {
    // Eye contours in EAR order: outer corner, two upper lid points,
    // inner corner, two lower lid points.
    pub const LEFT_EYE_EAR: [usize; 6] = [33, 160, 158, 133, 153, 144];
    pub const RIGHT_EYE_EAR: [usize; 6] = [362, 385, 387, 263, 373, 380];

    pub const LEFT_EYE_TOP: usize = 159;
    pub const LEFT_EYE_BOTTOM: usize = 145;
    pub const RIGHT_EYE_TOP: usize = 386;
    pub const RIGHT_EYE_BOTTOM: usize = 374;

    pub const LEFT_IRIS_CENTER: usize = 468;
    pub const RIGHT_IRIS_CENTER: usize = 473;

    pub const NOSE_TIP: usize = 1;
    pub const CHIN: usize = 152;
    pub const FOREHEAD: usize = 10;
    pub const LEFT_TEMPLE: usize = 234;
    pub const RIGHT_TEMPLE: usize = 454;
}

// Values reported when a denominator collapses to zero.
const NEUTRAL_EAR: f64 = 0.3;
const NEUTRAL_IRIS: f64 = 0.5;
const NEUTRAL_HEAD_RATIO: f64 = 1.0;
const MIN_DENOMINATOR: f64 = 1e-6;

#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("no face in frame")]
    NoFace,
    #[error("landmark {0} missing from face mesh")]
    MissingLandmark(usize),
    #[error("landmark {0} has non-finite coordinates")]
    NonFiniteLandmark(usize),
    #[error("derived {0} is not finite")]
    NonFiniteSignal(&'static str),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeometricSignals {
    /// Mean eye aspect ratio of both eyes; ~0.3 open, near 0 closed.
    pub eye_aspect_ratio: f64,
    /// Iris centre within the eye box, 0 = outer/top edge, 1 = inner/bottom.
    pub iris_x: f64,
    pub iris_y: f64,
    /// Nose-to-left-temple over nose-to-right-temple; 1.0 facing the camera.
    pub head_tilt: f64,
    /// Nose-to-chin over forehead-to-nose; shrinks when the head drops.
    pub head_down: f64,
}

/// Stateless extractor; frame dimensions are only needed to lift normalized
/// landmarks into pixel space so horizontal and vertical distances compare.
#[derive(Debug, Clone, Copy)]
pub struct GeometricFeatureExtractor {
    width: f64,
    height: f64,
}

impl GeometricFeatureExtractor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: f64::from(width),
            height: f64::from(height),
        }
    }

    pub fn extract(&self, landmarks: &LandmarkSet) -> Result<GeometricSignals, FeatureError> {
        if landmarks.is_empty() {
            return Err(FeatureError::NoFace);
        }

        let point = |index: usize| -> Result<Point, FeatureError> {
            let raw = landmarks
                .get(index)
                .ok_or(FeatureError::MissingLandmark(index))?;
            if !raw.x.is_finite() || !raw.y.is_finite() {
                return Err(FeatureError::NonFiniteLandmark(index));
            }
            Ok(match landmarks.space() {
                CoordinateSpace::Pixel => raw,
                CoordinateSpace::Normalized => Point::new(raw.x * self.width, raw.y * self.height),
            })
        };

        let left_ear = eye_aspect_ratio(&mesh::LEFT_EYE_EAR, &point)?;
        let right_ear = eye_aspect_ratio(&mesh::RIGHT_EYE_EAR, &point)?;

        let (left_x, left_y) = iris_position(
            point(mesh::LEFT_IRIS_CENTER)?,
            point(mesh::LEFT_EYE_EAR[0])?,
            point(mesh::LEFT_EYE_EAR[3])?,
            point(mesh::LEFT_EYE_TOP)?,
            point(mesh::LEFT_EYE_BOTTOM)?,
        );
        let (right_x, right_y) = iris_position(
            point(mesh::RIGHT_IRIS_CENTER)?,
            point(mesh::RIGHT_EYE_EAR[0])?,
            point(mesh::RIGHT_EYE_EAR[3])?,
            point(mesh::RIGHT_EYE_TOP)?,
            point(mesh::RIGHT_EYE_BOTTOM)?,
        );

        let nose = point(mesh::NOSE_TIP)?;
        let head_tilt = ratio_or(
            nose.distance(&point(mesh::LEFT_TEMPLE)?),
            nose.distance(&point(mesh::RIGHT_TEMPLE)?),
            NEUTRAL_HEAD_RATIO,
        );
        let head_down = ratio_or(
            nose.distance(&point(mesh::CHIN)?),
            point(mesh::FOREHEAD)?.distance(&nose),
            NEUTRAL_HEAD_RATIO,
        );

        let signals = GeometricSignals {
            eye_aspect_ratio: (left_ear + right_ear) / 2.0,
            iris_x: (left_x + right_x) / 2.0,
            iris_y: (left_y + right_y) / 2.0,
            head_tilt,
            head_down,
        };
        signals.ensure_finite()?;
        Ok(signals)
    }
}

impl GeometricSignals {
    fn ensure_finite(&self) -> Result<(), FeatureError> {
        let named = [
            ("eye aspect ratio", self.eye_aspect_ratio),
            ("iris x", self.iris_x),
            ("iris y", self.iris_y),
            ("head tilt", self.head_tilt),
            ("head down", self.head_down),
        ];
        match named.iter().find(|(_, value)| !value.is_finite()) {
            Some((name, _)) => Err(FeatureError::NonFiniteSignal(name)),
            None => Ok(()),
        }
    }
}

fn ratio_or(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator.abs() < MIN_DENOMINATOR {
        fallback
    } else {
        numerator / denominator
    }
}

fn eye_aspect_ratio<F>(indices: &[usize; 6], point: &F) -> Result<f64, FeatureError>
where
    F: Fn(usize) -> Result<Point, FeatureError>,
{
    let [p1, p2, p3, p4, p5, p6] = (*indices).map(point);
    let (p1, p2, p3, p4, p5, p6) = (p1?, p2?, p3?, p4?, p5?, p6?);
    let vertical = p2.distance(&p6) + p3.distance(&p5);
    Ok(ratio_or(vertical, 2.0 * p1.distance(&p4), NEUTRAL_EAR))
}

fn iris_position(iris: Point, corner_a: Point, corner_b: Point, top: Point, bottom: Point) -> (f64, f64) {
    let left = corner_a.x.min(corner_b.x);
    let width = (corner_a.x - corner_b.x).abs();
    let x = ratio_or(iris.x - left, width, NEUTRAL_IRIS);
    let y = ratio_or(iris.y - top.y, bottom.y - top.y, NEUTRAL_IRIS);
    (x, y)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Synthetic frontal face in pixel space: eyes open (EAR 0.4), irises
    /// centred, temples equidistant from the nose, nose halfway between
    /// forehead and chin.
    pub(crate) fn frontal_face() -> LandmarkSet {
        let mut face = LandmarkSet::new(CoordinateSpace::Pixel);
        add_eye(&mut face, &mesh::LEFT_EYE_EAR, mesh::LEFT_EYE_TOP, mesh::LEFT_EYE_BOTTOM, mesh::LEFT_IRIS_CENTER, 100.0);
        add_eye(&mut face, &mesh::RIGHT_EYE_EAR, mesh::RIGHT_EYE_TOP, mesh::RIGHT_EYE_BOTTOM, mesh::RIGHT_IRIS_CENTER, 200.0);
        face.insert(mesh::NOSE_TIP, Point::new(160.0, 150.0));
        face.insert(mesh::FOREHEAD, Point::new(160.0, 70.0));
        face.insert(mesh::CHIN, Point::new(160.0, 230.0));
        face.insert(mesh::LEFT_TEMPLE, Point::new(80.0, 150.0));
        face.insert(mesh::RIGHT_TEMPLE, Point::new(240.0, 150.0));
        face
    }

    // Eye box 40 px wide centred on (x0 + 20, 100), lids 16 px apart.
    fn add_eye(face: &mut LandmarkSet, ear: &[usize; 6], top: usize, bottom: usize, iris: usize, x0: f64) {
        let y = 100.0;
        face.insert(ear[0], Point::new(x0, y));
        face.insert(ear[1], Point::new(x0 + 13.0, y - 8.0));
        face.insert(ear[2], Point::new(x0 + 27.0, y - 8.0));
        face.insert(ear[3], Point::new(x0 + 40.0, y));
        face.insert(ear[4], Point::new(x0 + 27.0, y + 8.0));
        face.insert(ear[5], Point::new(x0 + 13.0, y + 8.0));
        face.insert(top, Point::new(x0 + 20.0, y - 8.0));
        face.insert(bottom, Point::new(x0 + 20.0, y + 8.0));
        face.insert(iris, Point::new(x0 + 20.0, y));
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn frontal_face_yields_neutral_signals() {
        let signals = GeometricFeatureExtractor::new(640, 480)
            .extract(&frontal_face())
            .unwrap();

        assert!(approx(signals.eye_aspect_ratio, 0.4));
        assert!(approx(signals.iris_x, 0.5));
        assert!(approx(signals.iris_y, 0.5));
        assert!(approx(signals.head_tilt, 1.0));
        assert!(approx(signals.head_down, 1.0));
    }

    #[test]
    fn empty_landmarks_are_no_face() {
        let err = GeometricFeatureExtractor::new(640, 480)
            .extract(&LandmarkSet::default())
            .unwrap_err();
        assert_eq!(err, FeatureError::NoFace);
    }

    #[test]
    fn missing_landmark_is_reported() {
        let mut face = LandmarkSet::new(CoordinateSpace::Pixel);
        face.insert(mesh::NOSE_TIP, Point::new(1.0, 1.0));
        let err = GeometricFeatureExtractor::new(640, 480).extract(&face).unwrap_err();
        assert!(matches!(err, FeatureError::MissingLandmark(_)));
    }

    #[test]
    fn nan_landmarks_are_rejected() {
        let mut face = frontal_face();
        face.insert(mesh::LEFT_IRIS_CENTER, Point::new(f64::NAN, f64::NAN));
        face.insert(mesh::NOSE_TIP, Point::new(f64::NAN, f64::NAN));
        let err = GeometricFeatureExtractor::new(640, 480).extract(&face).unwrap_err();
        assert!(matches!(err, FeatureError::NonFiniteLandmark(_)));
    }

    #[test]
    fn overflowing_geometry_is_rejected() {
        let mut face = frontal_face();
        // Finite coordinates whose distance overflows.
        face.insert(mesh::CHIN, Point::new(f64::MAX, f64::MAX));
        let err = GeometricFeatureExtractor::new(640, 480).extract(&face).unwrap_err();
        assert!(matches!(err, FeatureError::NonFiniteSignal(_)));
    }

    #[test]
    fn normalized_landmarks_scale_to_frame() {
        let (w, h) = (640.0, 480.0);
        let pixel = frontal_face();
        let mut normalized = LandmarkSet::new(CoordinateSpace::Normalized);
        for index in [
            33, 160, 158, 133, 153, 144, 362, 385, 387, 263, 373, 380, 159, 145, 386, 374, 468,
            473, 1, 10, 152, 234, 454,
        ] {
            let p = pixel.get(index).unwrap();
            normalized.insert(index, Point::new(p.x / w, p.y / h));
        }

        let extractor = GeometricFeatureExtractor::new(640, 480);
        let a = extractor.extract(&pixel).unwrap();
        let b = extractor.extract(&normalized).unwrap();
        assert!((a.eye_aspect_ratio - b.eye_aspect_ratio).abs() < 1e-9);
        assert!((a.head_tilt - b.head_tilt).abs() < 1e-9);
    }

    #[test]
    fn turned_head_skews_tilt_ratio() {
        let mut face = frontal_face();
        face.insert(mesh::LEFT_TEMPLE, Point::new(150.0, 150.0));
        let signals = GeometricFeatureExtractor::new(640, 480).extract(&face).unwrap();
        assert!(signals.head_tilt < 0.2);
    }

    #[test]
    fn collapsed_eye_falls_back_to_neutral() {
        let mut face = frontal_face();
        for index in mesh::LEFT_EYE_EAR {
            face.insert(index, Point::new(100.0, 100.0));
        }
        let signals = GeometricFeatureExtractor::new(640, 480).extract(&face).unwrap();
        assert!(signals.eye_aspect_ratio.is_finite());
        assert!(signals.iris_x.is_finite());
    }
}
