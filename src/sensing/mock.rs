//! Randomised stand-ins for the face-mesh model and the object detector,
//! used for demos and when no camera models are wired in. They plug in
//! through the same traits as real models and never touch scoring logic.

use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{BoundingBox, CoordinateSpace, Detection, Frame, LandmarkSet, Point};
use crate::signals::features::mesh;

const NO_FACE_CHANCE: f64 = 0.02;
const SECOND_FACE_CHANCE: f64 = 0.01;
const EYES_CLOSED_CHANCE: f64 = 0.03;
const PHONE_CHANCE: f64 = 0.03;

fn seeded(seed: Option<u64>) -> Mutex<StdRng> {
    Mutex::new(match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    })
}

fn lock(rng: &Mutex<StdRng>) -> MutexGuard<'_, StdRng> {
    rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Pose and gaze knobs for one synthetic face.
#[derive(Debug, Clone, Copy)]
pub struct FacePose {
    pub iris_x: f64,
    pub iris_y: f64,
    pub eye_aspect_ratio: f64,
    /// Left temple distance relative to the right one.
    pub tilt: f64,
    /// Chin distance relative to the forehead one.
    pub head_down: f64,
}

impl Default for FacePose {
    fn default() -> Self {
        Self {
            iris_x: 0.5,
            iris_y: 0.5,
            eye_aspect_ratio: 0.3,
            tilt: 1.0,
            head_down: 1.0,
        }
    }
}

/// Build a full face mesh (only the points the extractor reads) centred in
/// a frame of the given size.
pub fn synthetic_face(width: u32, height: u32, pose: FacePose) -> LandmarkSet {
    let s = f64::from(height.max(1)) / 480.0;
    let cx = f64::from(width) / 2.0;
    let cy = f64::from(height) / 2.0;
    let mut face = LandmarkSet::new(CoordinateSpace::Pixel);

    let eye_y = cy - 50.0 * s;
    let lid_gap = pose.eye_aspect_ratio * 20.0 * s;
    let eyes = [
        (mesh::LEFT_EYE_EAR, mesh::LEFT_EYE_TOP, mesh::LEFT_EYE_BOTTOM, mesh::LEFT_IRIS_CENTER, cx - 60.0 * s),
        (mesh::RIGHT_EYE_EAR, mesh::RIGHT_EYE_TOP, mesh::RIGHT_EYE_BOTTOM, mesh::RIGHT_IRIS_CENTER, cx + 20.0 * s),
    ];
    for (ear, top, bottom, iris, x0) in eyes {
        face.insert(ear[0], Point::new(x0, eye_y));
        face.insert(ear[1], Point::new(x0 + 13.0 * s, eye_y - lid_gap));
        face.insert(ear[2], Point::new(x0 + 27.0 * s, eye_y - lid_gap));
        face.insert(ear[3], Point::new(x0 + 40.0 * s, eye_y));
        face.insert(ear[4], Point::new(x0 + 27.0 * s, eye_y + lid_gap));
        face.insert(ear[5], Point::new(x0 + 13.0 * s, eye_y + lid_gap));
        face.insert(top, Point::new(x0 + 20.0 * s, eye_y - 8.0 * s));
        face.insert(bottom, Point::new(x0 + 20.0 * s, eye_y + 8.0 * s));
        face.insert(
            iris,
            Point::new(x0 + 40.0 * s * pose.iris_x, eye_y - 8.0 * s + 16.0 * s * pose.iris_y),
        );
    }

    face.insert(mesh::NOSE_TIP, Point::new(cx, cy));
    face.insert(mesh::FOREHEAD, Point::new(cx, cy - 80.0 * s));
    face.insert(mesh::CHIN, Point::new(cx, cy + 80.0 * s * pose.head_down));
    face.insert(mesh::LEFT_TEMPLE, Point::new(cx - 80.0 * s * pose.tilt, cy));
    face.insert(mesh::RIGHT_TEMPLE, Point::new(cx + 80.0 * s, cy));
    face
}

pub struct MockLandmarkProvider {
    rng: Mutex<StdRng>,
}

impl MockLandmarkProvider {
    pub fn new(seed: Option<u64>) -> Self {
        Self { rng: seeded(seed) }
    }

    fn random_pose(rng: &mut StdRng) -> FacePose {
        let jitter = |rng: &mut StdRng, spread: f64| rng.gen_range(-spread..=spread);
        let roll: f64 = rng.gen();

        // Mostly on task, sometimes drifting, occasionally looking away.
        let (iris_x, iris_y) = if roll < 0.70 {
            (0.5 + jitter(rng, 0.08), 0.5 + jitter(rng, 0.08))
        } else if roll < 0.85 {
            (0.5 + 0.15 + jitter(rng, 0.05), 0.5 - 0.15 + jitter(rng, 0.05))
        } else {
            (0.85 + jitter(rng, 0.05), 0.5 + jitter(rng, 0.08))
        };

        let eye_aspect_ratio = if rng.gen_bool(EYES_CLOSED_CHANCE) {
            0.1
        } else {
            0.3 + jitter(rng, 0.04)
        };

        FacePose {
            iris_x,
            iris_y,
            eye_aspect_ratio,
            tilt: 1.0 + jitter(rng, 0.3),
            head_down: 1.0 + jitter(rng, 0.15),
        }
    }
}

impl super::LandmarkProvider for MockLandmarkProvider {
    fn detect_faces(&self, frame: &Frame) -> Result<Vec<LandmarkSet>> {
        let mut rng = lock(&self.rng);
        if rng.gen_bool(NO_FACE_CHANCE) {
            return Ok(Vec::new());
        }

        let pose = Self::random_pose(&mut rng);
        let mut faces = vec![synthetic_face(frame.width, frame.height, pose)];
        if rng.gen_bool(SECOND_FACE_CHANCE) {
            faces.push(synthetic_face(frame.width, frame.height, FacePose::default()));
        }
        Ok(faces)
    }
}

pub struct MockObjectDetector {
    rng: Mutex<StdRng>,
}

impl MockObjectDetector {
    pub fn new(seed: Option<u64>) -> Self {
        Self { rng: seeded(seed) }
    }
}

impl super::ObjectDetector for MockObjectDetector {
    fn detect_objects(&self, frame: &Frame) -> Result<Vec<Detection>> {
        let mut rng = lock(&self.rng);
        if !rng.gen_bool(PHONE_CHANCE) {
            return Ok(Vec::new());
        }

        let bbox = BoundingBox {
            x: frame.width as f32 * 0.6,
            y: frame.height as f32 * 0.5,
            width: frame.width as f32 * 0.15,
            height: frame.height as f32 * 0.25,
        };
        Ok(vec![Detection::new("cell phone", rng.gen_range(0.55..0.95), bbox)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::{LandmarkProvider, ObjectDetector};
    use crate::signals::GeometricFeatureExtractor;

    #[test]
    fn synthetic_face_matches_requested_pose() {
        let pose = FacePose {
            iris_x: 0.3,
            iris_y: 0.6,
            eye_aspect_ratio: 0.25,
            tilt: 1.5,
            head_down: 0.9,
        };
        let face = synthetic_face(1280, 720, pose);
        let signals = GeometricFeatureExtractor::new(1280, 720).extract(&face).unwrap();

        assert!((signals.iris_x - 0.3).abs() < 1e-9);
        assert!((signals.iris_y - 0.6).abs() < 1e-9);
        assert!((signals.eye_aspect_ratio - 0.25).abs() < 1e-9);
        assert!((signals.head_tilt - 1.5).abs() < 1e-9);
        assert!((signals.head_down - 0.9).abs() < 1e-9);
    }

    #[test]
    fn seeded_mocks_are_repeatable() {
        let frame = Frame::blank(64, 48, 0.0);
        let a = MockLandmarkProvider::new(Some(11));
        let b = MockLandmarkProvider::new(Some(11));
        for _ in 0..20 {
            assert_eq!(a.detect_faces(&frame).unwrap(), b.detect_faces(&frame).unwrap());
        }

        let detector = MockObjectDetector::new(Some(3));
        for _ in 0..50 {
            for hit in detector.detect_objects(&frame).unwrap() {
                assert_eq!(hit.label, "cell phone");
                assert!(hit.confidence > 0.5);
            }
        }
    }
}
