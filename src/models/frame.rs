use serde::{Deserialize, Serialize};

use super::LandmarkSet;

/// One decoded video frame as handed over by the transport layer.
///
/// `pixels` is a packed RGB8 buffer of `width * height * 3` bytes and
/// `timestamp` is seconds since the session started.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: f64,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, timestamp: f64) -> Self {
        Self {
            pixels,
            width,
            height,
            timestamp,
        }
    }

    /// Black frame of the given size, mostly useful with mock providers.
    pub fn blank(width: u32, height: u32, timestamp: f64) -> Self {
        let len = width as usize * height as usize * 3;
        Self::new(vec![0; len], width, height, timestamp)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A single object-detector hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}

/// Everything the external models reported for one frame.
#[derive(Debug, Clone, Default)]
pub struct Observation {
    /// All faces found, primary face first. Empty means no face.
    pub faces: Vec<LandmarkSet>,
    pub detections: Vec<Detection>,
}

impl Observation {
    pub fn primary_face(&self) -> Option<&LandmarkSet> {
        self.faces.first().filter(|face| !face.is_empty())
    }

    pub fn face_count(&self) -> usize {
        self.faces.iter().filter(|face| !face.is_empty()).count()
    }
}
