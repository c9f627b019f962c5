//! Frame ingestion sources.
//!
//! This module provides different sources for frames:
//! - Local video files (stored-video sessions; FFmpeg decode behind `ingest-file-ffmpeg`)
//! - Cameras (live sessions; V4L2 capture behind `ingest-v4l2`)
//! - In-memory replays (tests, tooling)
//! - `stub://` synthetic rallies for both file and camera paths
//!
//! Every source implements `FrameSource`. `next_frame` returning `Ok(None)` is end of
//! stream; the pipeline treats an `Err` mid-run the same way, since a failed read cannot be
//! told apart from a stream that simply ended.

pub mod camera;
pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
mod synthetic;

use std::collections::VecDeque;

use anyhow::Result;

use crate::frame::Frame;

pub use camera::{CameraConfig, CameraSource};
pub use file::{FileConfig, FileSource};

/// Frame-acquisition capability consumed by the pipeline.
pub trait FrameSource {
    /// Open the underlying device or file. Failures here are configuration errors.
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    /// Next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Frame rate the source was recorded or configured at, when known.
    fn nominal_fps(&self) -> Option<f64> {
        None
    }

    /// Total frames the source will produce, when known up front.
    fn frame_count(&self) -> Option<u64> {
        None
    }

    /// Human-readable description for logs and reports.
    fn describe(&self) -> String;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn nominal_fps(&self) -> Option<f64> {
        (**self).nominal_fps()
    }

    fn frame_count(&self) -> Option<u64> {
        (**self).frame_count()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Replays frames held in memory, in order.
pub struct MemorySource {
    frames: VecDeque<Frame>,
    fps: Option<f64>,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            fps: None,
        }
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = Some(fps);
        self
    }

    /// `count` solid frames indexed `0..count`.
    pub fn blank(count: u64, width: u32, height: u32) -> Result<Self> {
        let frames = (0..count)
            .map(|index| Frame::filled(index, width, height, [0, 0, 0]))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(frames))
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }

    fn nominal_fps(&self) -> Option<f64> {
        self.fps
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.frames.len() as u64)
    }

    fn describe(&self) -> String {
        format!("memory ({} frames queued)", self.frames.len())
    }
}
