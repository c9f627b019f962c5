//! Trajectory and motion primitives.
//!
//! - `TrajectoryBuffer`: bounded FIFO of recent positions
//! - `motion::estimate`: velocity/speed from the last two positions
//! - `FrameClock`: per-frame timestamps under a fixed-FPS or wall-clock policy
//! - `BallObservation`: the typed per-frame record handed to callers

pub mod motion;
mod observation;
mod timing;
mod trajectory;

pub use motion::MotionEstimate;
pub use observation::{BallObservation, Point, Velocity};
pub use timing::{FrameClock, FrameTime, TimestampPolicy};
pub use trajectory::{TrajectoryBuffer, LIVE_TRAJECTORY_CAPACITY, VIDEO_TRAJECTORY_CAPACITY};
