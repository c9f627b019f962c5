use serde::{Deserialize, Serialize};

/// A position in frame pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Pixel delta between consecutive trajectory points (pixels per frame).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

impl Velocity {
    pub fn between(prev: Point, curr: Point) -> Self {
        Self {
            dx: curr.x - prev.x,
            dy: curr.y - prev.y,
        }
    }

    /// Euclidean length of the delta.
    pub fn magnitude(&self) -> f32 {
        (self.dx * self.dx + self.dy * self.dy).sqrt()
    }
}

/// The selected detection for one frame, enriched with derived motion.
///
/// `velocity` and `speed` are `None` when they could not be derived (first point of a
/// trajectory, or no usable time step). `Some(0.0)` means the ball did not move.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BallObservation {
    pub frame_index: u64,
    /// Seconds since stream start.
    pub timestamp: f64,
    pub position: Point,
    pub confidence: f32,
    pub velocity: Option<Velocity>,
    /// Pixels per second.
    pub speed: Option<f32>,
}
