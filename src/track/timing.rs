use std::time::Instant;

use anyhow::{anyhow, Result};

use crate::frame::Frame;

/// How frame timestamps (and thus the motion time step) are derived.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimestampPolicy {
    /// Stored video: `timestamp = frame_index / fps`, constant step `1 / fps`.
    FixedFps(f64),
    /// Live capture: elapsed time since the first frame, step = difference from the
    /// previous frame.
    WallClock,
}

impl TimestampPolicy {
    pub fn validate(&self) -> Result<()> {
        match self {
            TimestampPolicy::FixedFps(fps) if !fps.is_finite() || *fps <= 0.0 => {
                Err(anyhow!("fps must be positive, got {}", fps))
            }
            _ => Ok(()),
        }
    }
}

/// Timestamp and step assigned to a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTime {
    /// Seconds since stream start.
    pub timestamp: f64,
    /// Seconds since the previous frame; `None` for the first wall-clock frame.
    pub dt: Option<f64>,
}

/// Stamps frames according to a `TimestampPolicy`.
#[derive(Clone, Debug)]
pub struct FrameClock {
    policy: TimestampPolicy,
    origin: Option<Instant>,
    last: Option<f64>,
}

impl FrameClock {
    pub fn new(policy: TimestampPolicy) -> Self {
        Self {
            policy,
            origin: None,
            last: None,
        }
    }

    pub fn policy(&self) -> TimestampPolicy {
        self.policy
    }

    pub fn stamp(&mut self, frame: &Frame) -> FrameTime {
        let time = match self.policy {
            TimestampPolicy::FixedFps(fps) => FrameTime {
                timestamp: frame.index as f64 / fps,
                dt: Some(1.0 / fps),
            },
            TimestampPolicy::WallClock => {
                let origin = *self.origin.get_or_insert(frame.captured_at());
                let timestamp = frame
                    .captured_at()
                    .saturating_duration_since(origin)
                    .as_secs_f64();
                FrameTime {
                    timestamp,
                    dt: self.last.map(|last| timestamp - last),
                }
            }
        };
        self.last = Some(time.timestamp);
        time
    }
}
