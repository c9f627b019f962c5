use std::time::Instant;

use anyhow::Result;
use indicatif::ProgressBar;

use super::OutputSink;
use crate::frame::Frame;
use crate::pipeline::FrameOutput;

/// Progress display for a running session.
///
/// Either drives an indicatif bar, or (plain mode) prints a status line to stderr every
/// `every` frames.
pub struct ProgressSink {
    bar: Option<ProgressBar>,
    total: Option<u64>,
    every: u64,
    started: Instant,
    frames: u64,
    detections: u64,
}

impl ProgressSink {
    pub fn with_bar(bar: ProgressBar) -> Self {
        Self {
            total: bar.length(),
            bar: Some(bar),
            every: 1,
            started: Instant::now(),
            frames: 0,
            detections: 0,
        }
    }

    pub fn plain(total: Option<u64>, every: u64) -> Self {
        Self {
            bar: None,
            total,
            every: every.max(1),
            started: Instant::now(),
            frames: 0,
            detections: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn detections(&self) -> u64 {
        self.detections
    }

    /// Status line, e.g. "Progress: 40.0% | Frame: 60/150 | FPS: 28.3 | Detections: 51".
    pub fn status_line(&self) -> String {
        let secs = self.started.elapsed().as_secs_f64();
        let fps = if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        };
        let frame = match self.total {
            Some(total) if total > 0 => format!(
                "Progress: {:.1}% | Frame: {}/{}",
                self.frames as f64 / total as f64 * 100.0,
                self.frames,
                total
            ),
            _ => format!("Frame: {}", self.frames),
        };
        format!("{} | FPS: {:.1} | Detections: {}", frame, fps, self.detections)
    }
}

impl OutputSink for ProgressSink {
    fn consume(&mut self, _frame: &Frame, output: &FrameOutput) -> Result<()> {
        self.frames += 1;
        if output.observation.is_some() {
            self.detections += 1;
        }
        match &self.bar {
            Some(bar) => {
                bar.inc(1);
                bar.set_message(format!("{} detections", self.detections));
            }
            None => {
                if self.frames % self.every == 0 {
                    eprintln!("{}", self.status_line());
                }
            }
        }
        Ok(())
    }

    fn on_reset(&mut self) {
        self.detections = 0;
        if let Some(bar) = &self.bar {
            bar.println("tracking reset");
        } else {
            eprintln!("tracking reset");
        }
    }

    fn finish(&mut self) -> Result<()> {
        let line = self.status_line();
        match &self.bar {
            Some(bar) => bar.finish_with_message(format!("{} detections", self.detections)),
            None => eprintln!("{}", line),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{BallObservation, Point};

    fn output(index: u64, hit: bool) -> FrameOutput {
        FrameOutput {
            frame_index: index,
            timestamp: 0.0,
            processed: true,
            observation: hit.then(|| BallObservation {
                frame_index: index,
                timestamp: 0.0,
                position: Point::new(1.0, 1.0),
                confidence: 0.5,
                velocity: None,
                speed: None,
            }),
            trajectory: Vec::new(),
        }
    }

    #[test]
    fn counts_frames_and_detections() -> Result<()> {
        let frame = Frame::filled(0, 1, 1, [0, 0, 0])?;
        let mut sink = ProgressSink::with_bar(ProgressBar::hidden());
        for i in 0..4 {
            sink.consume(&frame, &output(i, i % 2 == 0))?;
        }
        assert_eq!((sink.frames(), sink.detections()), (4, 2));
        sink.on_reset();
        assert_eq!(sink.detections(), 0);
        sink.finish()
    }

    #[test]
    fn status_line_shows_percentage_when_total_known() -> Result<()> {
        let frame = Frame::filled(0, 1, 1, [0, 0, 0])?;
        let mut sink = ProgressSink::plain(Some(10), 100);
        for i in 0..4 {
            sink.consume(&frame, &output(i, true))?;
        }
        let line = sink.status_line();
        assert!(line.starts_with("Progress: 40.0% | Frame: 4/10"), "{line}");
        assert!(line.ends_with("Detections: 4"), "{line}");
        Ok(())
    }
}
