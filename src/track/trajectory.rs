use std::collections::VecDeque;

use super::observation::Point;

/// Trajectory capacity for live camera sessions.
pub const LIVE_TRAJECTORY_CAPACITY: usize = 30;

/// Trajectory capacity for stored-video sessions.
pub const VIDEO_TRAJECTORY_CAPACITY: usize = 50;

/// Bounded FIFO of recent ball positions.
///
/// - Appends at the tail; evicts from the head once `capacity` is reached
/// - Never drops the newest point, never reorders
/// - `len() == min(capacity, pushes since the last clear)`
#[derive(Clone, Debug)]
pub struct TrajectoryBuffer {
    points: VecDeque<Point>,
    capacity: usize,
}

impl TrajectoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a position. Evicts the oldest entries as needed.
    pub fn push(&mut self, point: Point) {
        if self.capacity == 0 {
            return;
        }
        while self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Ordered copy of the current positions, oldest first.
    pub fn snapshot(&self) -> Vec<Point> {
        self.points.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> + '_ {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<Point> {
        self.points.back().copied()
    }

    /// The two most recent positions as `(previous, latest)`.
    pub fn last_two(&self) -> Option<(Point, Point)> {
        let len = self.points.len();
        if len < 2 {
            return None;
        }
        Some((self.points[len - 2], self.points[len - 1]))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
