use std::sync::Arc;

use anyhow::{Context, Result};

use crate::models::{Detection, Frame, LandmarkSet, Observation};

use super::mock::{MockLandmarkProvider, MockObjectDetector};

/// Face-mesh model boundary. Returns every face found, primary first; an
/// empty vector means no face.
pub trait LandmarkProvider: Send + Sync {
    fn detect_faces(&self, frame: &Frame) -> Result<Vec<LandmarkSet>>;
}

/// Object-detector boundary.
pub trait ObjectDetector: Send + Sync {
    fn detect_objects(&self, frame: &Frame) -> Result<Vec<Detection>>;
}

/// Runs both external models on a frame. Shared by every session.
#[derive(Clone)]
pub struct FrameAnalyzer {
    landmarks: Arc<dyn LandmarkProvider>,
    objects: Arc<dyn ObjectDetector>,
    mock: bool,
}

impl FrameAnalyzer {
    pub fn new(landmarks: Arc<dyn LandmarkProvider>, objects: Arc<dyn ObjectDetector>) -> Self {
        Self {
            landmarks,
            objects,
            mock: false,
        }
    }

    /// Randomised stand-ins for both models. A seed makes runs repeatable.
    pub fn mock(seed: Option<u64>) -> Self {
        Self {
            landmarks: Arc::new(MockLandmarkProvider::new(seed)),
            objects: Arc::new(MockObjectDetector::new(seed.map(|s| s.wrapping_add(1)))),
            mock: true,
        }
    }

    pub fn is_mock(&self) -> bool {
        self.mock
    }

    pub fn analyze(&self, frame: &Frame) -> Result<Observation> {
        let faces = self
            .landmarks
            .detect_faces(frame)
            .context("landmark provider failed")?;
        let detections = self
            .objects
            .detect_objects(frame)
            .context("object detector failed")?;
        Ok(Observation { faces, detections })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn analyzer_combines_both_models() {
        let observation = steady_analyzer().analyze(&Frame::blank(64, 48, 0.0)).unwrap();
        assert_eq!(observation.face_count(), 1);
        assert!(observation.detections.is_empty());
    }

    #[test]
    fn provider_failures_carry_context() {
        let err = broken_analyzer().analyze(&Frame::blank(64, 48, 0.0)).unwrap_err();
        assert_eq!(format!("{err:#}"), "landmark provider failed: model crashed");
    }
}
