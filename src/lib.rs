//! Ball Tracker
//!
//! Single-ball tracking over a stream of video frames: detect candidates in each frame,
//! keep the best one, accumulate a bounded trajectory, estimate motion, and report
//! per-frame results plus a session summary.
//!
//! # Architecture
//!
//! ```text
//! FrameSource ──> Pipeline ──────────────────────────────> OutputSink(s)
//!                   │  DetectorBackend -> DetectionSelector       │
//!                   │  TrajectoryBuffer -> motion::estimate       ├─ ProgressSink
//!                   │  FrameClock, SessionAggregator              ├─ ObservationLog -> TrackingReport
//!                   └─ Controller / Command (pause, reset, stop)  └─ FrameDirWriter (render)
//! ```
//!
//! # Module Structure
//!
//! - `frame`: RGB frame container
//! - `ingest`: frame sources (video files, cameras, in-memory replays, `stub://` rallies)
//! - `detect`: detector backends, registry, best-candidate selection
//! - `track`: trajectory buffer, motion estimation, frame timing, observations
//! - `stats`: per-session aggregation
//! - `pipeline`: the per-frame loop, session state machine and control channel
//! - `render`: overlay planning and rasterization
//! - `output`: sinks for progress, observations and annotated frames
//! - `report`: JSON tracking report
//! - `config`: file/env configuration

pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod stats;
pub mod track;

pub use config::TrackerConfig;
pub use detect::{Detection, DetectorBackend};
pub use frame::Frame;
pub use ingest::{FrameSource, MemorySource};
pub use output::OutputSink;
pub use pipeline::{
    command_channel, Command, Controller, FrameOutput, Pipeline, PipelineConfig, PipelineState,
    SessionReport, StopReason,
};
pub use report::TrackingReport;
pub use stats::{SessionAggregator, SessionSummary};
pub use track::{BallObservation, Point, TimestampPolicy, TrajectoryBuffer};
