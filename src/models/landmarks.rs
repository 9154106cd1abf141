use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// How the coordinates of a [`LandmarkSet`] are expressed. Face-mesh models
/// usually report normalized `[0, 1]` coordinates; the extractor scales
/// those by the frame size so every distance is measured in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    #[default]
    Pixel,
    Normalized,
}

/// Facial landmarks for one face in one frame, keyed by face-mesh index.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LandmarkSet {
    space: CoordinateSpace,
    points: BTreeMap<usize, Point>,
}

impl LandmarkSet {
    pub fn new(space: CoordinateSpace) -> Self {
        Self {
            space,
            points: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, index: usize, point: Point) {
        self.points.insert(index, point);
    }

    pub fn get(&self, index: usize) -> Option<Point> {
        self.points.get(&index).copied()
    }

    pub fn space(&self) -> CoordinateSpace {
        self.space
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
