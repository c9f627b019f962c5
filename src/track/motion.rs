use super::observation::Velocity;
use super::trajectory::TrajectoryBuffer;

/// Motion derived from the last two trajectory points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionEstimate {
    pub velocity: Velocity,
    /// Pixels per second; `None` when the time step is unknown or not positive.
    pub speed: Option<f32>,
}

/// Estimate motion from the trajectory's two most recent positions.
///
/// Returns `None` with fewer than two positions. `dt` is the frame's time step in seconds.
pub fn estimate(trajectory: &TrajectoryBuffer, dt: Option<f64>) -> Option<MotionEstimate> {
    let (prev, curr) = trajectory.last_two()?;
    let velocity = Velocity::between(prev, curr);
    let speed = dt
        .filter(|dt| dt.is_finite() && *dt > 0.0)
        .map(|dt| (velocity.magnitude() as f64 / dt) as f32);
    Some(MotionEstimate { velocity, speed })
}
