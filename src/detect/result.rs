use serde::{Deserialize, Serialize};

/// One candidate ball box produced by a detector backend.
///
/// Coordinates are in frame pixels; (`x`, `y`) is the box center.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub confidence: f32,
}

impl Detection {
    pub fn new(x: f32, y: f32, w: f32, h: f32, confidence: f32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            confidence,
        }
    }

    /// Point-sized candidate at (x, y).
    pub fn at(x: f32, y: f32, confidence: f32) -> Self {
        Self::new(x, y, 0.0, 0.0, confidence)
    }

    /// Build from corner coordinates (xmin, ymin, xmax, ymax).
    pub fn from_corners(xmin: f32, ymin: f32, xmax: f32, ymax: f32, confidence: f32) -> Self {
        Self::new(
            (xmin + xmax) / 2.0,
            (ymin + ymax) / 2.0,
            (xmax - xmin).max(0.0),
            (ymax - ymin).max(0.0),
            confidence,
        )
    }
}

/// Candidates for a single frame, stamped with where they came from.
#[derive(Clone, Debug, Default)]
pub struct FrameDetections {
    pub frame_index: u64,
    /// Seconds since stream start.
    pub timestamp: f64,
    pub candidates: Vec<Detection>,
}
