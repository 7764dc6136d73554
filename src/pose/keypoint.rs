//! Keypoints as delivered by the external pose estimator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::geometry::Point;

/// A named anatomical landmark with 2D position and detection confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// MoveNet/BlazePose emit this as `score`.
    #[serde(alias = "score")]
    pub confidence: f64,
}

impl Keypoint {
    pub fn new(name: impl Into<String>, x: f64, y: f64, confidence: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            confidence,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Strictly above `min_confidence`, with finite coordinates.
    pub fn is_reliable(&self, min_confidence: f64) -> bool {
        self.confidence > min_confidence && self.x.is_finite() && self.y.is_finite()
    }
}

/// All keypoints observed at one instant, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Keypoint>", into = "Vec<Keypoint>")]
pub struct Pose {
    keypoints: HashMap<String, Keypoint>,
}

impl Pose {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, keypoint: Keypoint) {
        self.keypoints.insert(keypoint.name.clone(), keypoint);
    }

    pub fn with(mut self, keypoint: Keypoint) -> Self {
        self.insert(keypoint);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Keypoint> {
        self.keypoints.get(name)
    }

    /// Position of `name` if it was detected reliably enough to measure with.
    pub fn reliable_point(&self, name: &str, min_confidence: f64) -> Option<Point> {
        self.get(name)
            .filter(|keypoint| keypoint.is_reliable(min_confidence))
            .map(Keypoint::point)
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

// Duplicate names keep the last occurrence.
impl From<Vec<Keypoint>> for Pose {
    fn from(keypoints: Vec<Keypoint>) -> Self {
        keypoints.into_iter().fold(Pose::new(), Pose::with)
    }
}

impl From<Pose> for Vec<Keypoint> {
    fn from(pose: Pose) -> Self {
        let mut keypoints: Vec<Keypoint> = pose.keypoints.into_values().collect();
        keypoints.sort_by(|a, b| a.name.cmp(&b.name));
        keypoints
    }
}

impl FromIterator<Keypoint> for Pose {
    fn from_iter<I: IntoIterator<Item = Keypoint>>(iter: I) -> Self {
        iter.into_iter().fold(Pose::new(), Pose::with)
    }
}
