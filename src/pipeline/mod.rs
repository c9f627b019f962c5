//! Frame pipeline.
//!
//! One `Pipeline` value owns a session: the detector, the trajectory buffer, the session
//! aggregator, the frame clock and the run state. The same pipeline serves stored video and
//! live capture; the two differ only in the `FrameSource` handed to `run` and the
//! `TimestampPolicy` in the config.
//!
//! Per frame (while Running):
//! 1. acquire a frame (end of stream or read error stops the session)
//! 2. stamp it with the frame clock
//! 3. skip detection unless `index % frame_skip == 0`
//! 4. detect, select, push the position and estimate motion
//! 5. record the outcome in the aggregator
//! 6. hand a `FrameOutput` to the output sink

mod control;
mod state;

use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::Serialize;

use crate::detect::{DetectionSelector, DetectorBackend, FrameDetections, DEFAULT_MIN_CONFIDENCE};
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::output::OutputSink;
use crate::stats::{SessionAggregator, SessionSummary};
use crate::track::{
    motion, BallObservation, FrameClock, Point, TimestampPolicy, TrajectoryBuffer,
    LIVE_TRAJECTORY_CAPACITY, VIDEO_TRAJECTORY_CAPACITY,
};

pub use control::{command_channel, Controller};
pub use state::{Command, PipelineState};
use state::Transition;

/// How long a paused pipeline blocks on the command channel before re-checking.
const PAUSE_POLL: Duration = Duration::from_millis(50);

/// Tunables for one session.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub trajectory_capacity: usize,
    pub min_confidence: f32,
    /// Run detection on every Nth frame (1 = every frame).
    pub frame_skip: u64,
    pub timestamps: TimestampPolicy,
    /// Stop cleanly after this many frames have been read.
    pub max_frames: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::for_video(30.0)
    }
}

impl PipelineConfig {
    /// Stored-video defaults: fixed-FPS timestamps, 50-point trajectory.
    pub fn for_video(fps: f64) -> Self {
        Self {
            trajectory_capacity: VIDEO_TRAJECTORY_CAPACITY,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            frame_skip: 1,
            timestamps: TimestampPolicy::FixedFps(fps),
            max_frames: None,
        }
    }

    /// Live-camera defaults: wall-clock timestamps, 30-point trajectory.
    pub fn for_camera() -> Self {
        Self {
            trajectory_capacity: LIVE_TRAJECTORY_CAPACITY,
            timestamps: TimestampPolicy::WallClock,
            ..Self::for_video(30.0)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.trajectory_capacity == 0 {
            return Err(anyhow!("trajectory capacity must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(anyhow!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            ));
        }
        if self.frame_skip == 0 {
            return Err(anyhow!("frame_skip must be at least 1"));
        }
        self.timestamps.validate()
    }
}

/// Everything produced for one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameOutput {
    pub frame_index: u64,
    pub timestamp: f64,
    /// Whether detection ran on this frame (false for skipped frames).
    pub processed: bool,
    pub observation: Option<BallObservation>,
    /// Trajectory after this frame, oldest first.
    pub trajectory: Vec<Point>,
}

/// Why a session ended.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Source exhausted, or a frame read failed.
    EndOfStream,
    /// A stop command arrived.
    Requested,
    /// `max_frames` reached.
    FrameLimit,
    /// An output sink failed; carries the error text.
    OutputFailed(String),
}

/// Returned by every completed run, whatever the stop reason.
#[derive(Clone, Debug, Serialize)]
pub struct SessionReport {
    pub summary: SessionSummary,
    pub stop_reason: StopReason,
    #[serde(with = "secs_f64")]
    pub elapsed: Duration,
    /// Frames read per wall-clock second.
    pub processing_fps: f64,
}

mod secs_f64 {
    use std::time::Duration;

    pub fn serialize<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

/// A tracking session.
pub struct Pipeline<D: DetectorBackend> {
    config: PipelineConfig,
    detector: D,
    selector: DetectionSelector,
    trajectory: TrajectoryBuffer,
    stats: SessionAggregator,
    clock: FrameClock,
    state: PipelineState,
    frames_read: u64,
}

impl<D: DetectorBackend> Pipeline<D> {
    pub fn new(config: PipelineConfig, detector: D) -> Result<Self> {
        config.validate().context("invalid pipeline configuration")?;
        Ok(Self {
            selector: DetectionSelector::new(config.min_confidence),
            trajectory: TrajectoryBuffer::new(config.trajectory_capacity),
            stats: SessionAggregator::new(),
            clock: FrameClock::new(config.timestamps),
            state: PipelineState::Running,
            frames_read: 0,
            detector,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn into_detector(self) -> D {
        self.detector
    }

    pub fn trajectory(&self) -> &TrajectoryBuffer {
        &self.trajectory
    }

    pub fn summary(&self) -> SessionSummary {
        self.stats.summary()
    }

    /// Apply a control command. Commands that do not fit the current state are no-ops.
    ///
    /// Returns whether the command took effect.
    pub fn apply(&mut self, command: Command) -> bool {
        match self.state.on(command) {
            Transition::Moved(next) => {
                log::info!("pipeline {:?} -> {:?}", self.state, next);
                self.state = next;
                true
            }
            Transition::Reset => {
                self.trajectory.clear();
                self.stats.reset();
                log::info!("pipeline reset: trajectory and statistics cleared");
                true
            }
            Transition::Ignored => {
                log::debug!("ignoring {:?} while {:?}", command, self.state);
                false
            }
        }
    }

    /// Run steps 2–5 on one frame and return its output.
    ///
    /// Does not consult the run state; `run` only calls this while Running.
    pub fn process_frame(&mut self, frame: &Frame) -> FrameOutput {
        let time = self.clock.stamp(frame);

        if frame.index % self.config.frame_skip != 0 {
            self.stats.record_skipped();
            return FrameOutput {
                frame_index: frame.index,
                timestamp: time.timestamp,
                processed: false,
                observation: None,
                trajectory: self.trajectory.snapshot(),
            };
        }

        let candidates = match self.detector.detect(frame) {
            Ok(candidates) => candidates,
            Err(err) => {
                log::warn!(
                    "detector {} failed on frame {}: {:#}",
                    self.detector.name(),
                    frame.index,
                    err
                );
                Vec::new()
            }
        };
        let detections = FrameDetections {
            frame_index: frame.index,
            timestamp: time.timestamp,
            candidates,
        };

        let observation = self
            .selector
            .select(&detections.candidates)
            .copied()
            .map(|best| {
                let position = Point::new(best.x, best.y);
                self.trajectory.push(position);
                let motion = motion::estimate(&self.trajectory, time.dt);
                BallObservation {
                    frame_index: detections.frame_index,
                    timestamp: detections.timestamp,
                    position,
                    confidence: best.confidence,
                    velocity: motion.map(|m| m.velocity),
                    speed: motion.and_then(|m| m.speed),
                }
            });

        log::debug!(
            "frame {}: {} candidates, ball={}",
            frame.index,
            detections.candidates.len(),
            observation.is_some()
        );

        self.stats.record(
            observation.is_some(),
            observation.as_ref().map(|o| o.confidence),
            observation.as_ref().and_then(|o| o.speed),
        );

        FrameOutput {
            frame_index: frame.index,
            timestamp: time.timestamp,
            processed: true,
            observation,
            trajectory: self.trajectory.snapshot(),
        }
    }

    /// Drive the session until the source ends, a stop command arrives, the frame limit is
    /// hit, or the sink fails.
    ///
    /// Errors are returned only for startup failures (source connect, detector warm-up) or a
    /// pipeline that was already stopped. Everything after that ends in a `SessionReport`.
    pub fn run<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        commands: &Receiver<Command>,
    ) -> Result<SessionReport>
    where
        S: FrameSource + ?Sized,
        K: OutputSink + ?Sized,
    {
        if self.state == PipelineState::Stopped {
            return Err(anyhow!("pipeline already stopped"));
        }
        source
            .connect()
            .with_context(|| format!("failed to open {}", source.describe()))?;
        self.detector
            .warm_up()
            .with_context(|| format!("detector {} failed to warm up", self.detector.name()))?;

        log::info!(
            "tracking session started: source={} detector={} skip={} capacity={}",
            source.describe(),
            self.detector.name(),
            self.config.frame_skip,
            self.config.trajectory_capacity
        );

        let started = Instant::now();
        let mut stop_reason = loop {
            for command in commands.try_iter() {
                self.dispatch(command, sink);
            }
            if self.state == PipelineState::Stopped {
                break StopReason::Requested;
            }

            if self.state == PipelineState::Paused {
                match commands.recv_timeout(PAUSE_POLL) {
                    Ok(command) => self.dispatch(command, sink),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        log::warn!("command channel closed while paused, stopping");
                        self.state = PipelineState::Stopped;
                    }
                }
                continue;
            }

            if self
                .config
                .max_frames
                .is_some_and(|limit| self.frames_read >= limit)
            {
                break StopReason::FrameLimit;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break StopReason::EndOfStream,
                Err(err) => {
                    log::warn!("frame read failed, ending session: {:#}", err);
                    break StopReason::EndOfStream;
                }
            };
            self.frames_read += 1;

            let output = self.process_frame(&frame);
            if let Err(err) = sink.consume(&frame, &output) {
                log::error!("output failed on frame {}: {:#}", frame.index, err);
                break StopReason::OutputFailed(format!("{:#}", err));
            }
        };
        self.state = PipelineState::Stopped;

        if let Err(err) = sink.finish() {
            log::error!("failed to flush outputs: {:#}", err);
            if !matches!(stop_reason, StopReason::OutputFailed(_)) {
                stop_reason = StopReason::OutputFailed(format!("{:#}", err));
            }
        }

        let elapsed = started.elapsed();
        let secs = elapsed.as_secs_f64();
        let processing_fps = if secs > 0.0 {
            self.frames_read as f64 / secs
        } else {
            0.0
        };
        let summary = self.stats.summary();
        log::info!(
            "tracking session stopped ({:?}): {} frames, {} detections, {:.1} fps",
            stop_reason,
            summary.total_frames,
            summary.detections,
            processing_fps
        );

        Ok(SessionReport {
            summary,
            stop_reason,
            elapsed,
            processing_fps,
        })
    }

    fn dispatch<K: OutputSink + ?Sized>(&mut self, command: Command, sink: &mut K) {
        if self.apply(command) && command == Command::Reset {
            sink.on_reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{Detection, ScriptedBackend};

    fn blank(index: u64) -> Frame {
        Frame::filled(index, 4, 4, [0, 0, 0]).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        for config in [
            PipelineConfig {
                frame_skip: 0,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                trajectory_capacity: 0,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                min_confidence: 1.5,
                ..PipelineConfig::default()
            },
            PipelineConfig::for_video(0.0),
        ] {
            assert!(Pipeline::new(config, ScriptedBackend::new()).is_err());
        }
    }

    #[test]
    fn first_detection_has_no_motion() {
        let backend = ScriptedBackend::new().with_frame(0, vec![Detection::at(4.0, 4.0, 0.8)]);
        let mut pipeline = Pipeline::new(PipelineConfig::default(), backend).unwrap();
        let output = pipeline.process_frame(&blank(0));
        let observation = output.observation.unwrap();
        assert!(observation.velocity.is_none());
        assert!(observation.speed.is_none());
        assert_eq!(output.trajectory, vec![Point::new(4.0, 4.0)]);
    }

    #[test]
    fn fixed_fps_speed_uses_constant_step() {
        let backend = ScriptedBackend::new()
            .with_frame(0, vec![Detection::at(0.0, 0.0, 0.9)])
            .with_frame(1, vec![Detection::at(3.0, 4.0, 0.9)]);
        let mut pipeline = Pipeline::new(PipelineConfig::for_video(10.0), backend).unwrap();
        pipeline.process_frame(&blank(0));
        let observation = pipeline.process_frame(&blank(1)).observation.unwrap();
        assert_eq!(observation.timestamp, 0.1);
        assert_eq!(observation.speed, Some(50.0));
    }

    #[test]
    fn reset_keeps_run_state() {
        let backend = ScriptedBackend::new().with_frame(0, vec![Detection::at(1.0, 1.0, 0.9)]);
        let mut pipeline = Pipeline::new(PipelineConfig::default(), backend).unwrap();
        pipeline.process_frame(&blank(0));
        assert!(pipeline.apply(Command::Pause));

        assert!(pipeline.apply(Command::Reset));
        assert!(pipeline.apply(Command::Reset));
        assert_eq!(pipeline.state(), PipelineState::Paused);
        assert!(pipeline.trajectory().is_empty());
        assert_eq!(pipeline.summary().total_frames, 0);
    }

    #[test]
    fn stopped_pipeline_ignores_commands_and_refuses_to_run() {
        let mut pipeline = Pipeline::new(PipelineConfig::default(), ScriptedBackend::new()).unwrap();
        assert!(pipeline.apply(Command::Stop));
        assert!(!pipeline.apply(Command::Reset));
        assert!(!pipeline.apply(Command::Resume));
        assert_eq!(pipeline.state(), PipelineState::Stopped);

        let (_controller, rx) = command_channel();
        let mut source = crate::ingest::MemorySource::new(vec![blank(0)]);
        let mut sink: Vec<FrameOutput> = Vec::new();
        assert!(pipeline.run(&mut source, &mut sink, &rx).is_err());
    }
}
