//! Output sinks.
//!
//! The pipeline hands every `FrameOutput` (with its source frame) to one `OutputSink`.
//! Sinks here collect outputs, write annotated frames, keep the observation log for the
//! JSON report, drive progress display, or forward to a consumer thread. `FanoutSink`
//! combines several.
//!
//! A sink error stops the session (`StopReason::OutputFailed`); the summary is still
//! returned.

mod frames;
mod observations;
mod progress;
mod threaded;

use anyhow::Result;

use crate::frame::Frame;
use crate::pipeline::FrameOutput;

pub use self::frames::{FrameDirWriter, FrameFormat};
pub use self::observations::ObservationLog;
pub use self::progress::ProgressSink;
pub use self::threaded::ThreadedSink;

/// Receives per-frame pipeline output.
pub trait OutputSink {
    fn consume(&mut self, frame: &Frame, output: &FrameOutput) -> Result<()>;

    /// Called when the session's trajectory and statistics were cleared.
    fn on_reset(&mut self) {}

    /// Flush and release resources. Called once, after the last frame.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn consume(&mut self, frame: &Frame, output: &FrameOutput) -> Result<()> {
        (**self).consume(frame, output)
    }

    fn on_reset(&mut self) {
        (**self).on_reset()
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Collects outputs in memory.
impl OutputSink for Vec<FrameOutput> {
    fn consume(&mut self, _frame: &Frame, output: &FrameOutput) -> Result<()> {
        self.push(output.clone());
        Ok(())
    }
}

/// Forwards to several borrowed sinks, in order.
///
/// `consume` stops at the first failing sink. `finish` runs on every sink and reports the
/// first error.
#[derive(Default)]
pub struct FanoutSink<'a> {
    sinks: Vec<&'a mut dyn OutputSink>,
}

impl<'a> FanoutSink<'a> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with(mut self, sink: &'a mut dyn OutputSink) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn push(&mut self, sink: &'a mut dyn OutputSink) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl OutputSink for FanoutSink<'_> {
    fn consume(&mut self, frame: &Frame, output: &FrameOutput) -> Result<()> {
        for sink in self.sinks.iter_mut() {
            sink.consume(frame, output)?;
        }
        Ok(())
    }

    fn on_reset(&mut self) {
        for sink in self.sinks.iter_mut() {
            sink.on_reset();
        }
    }

    fn finish(&mut self) -> Result<()> {
        let mut first_err = None;
        for sink in self.sinks.iter_mut() {
            if let Err(err) = sink.finish() {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct Failing;

    impl OutputSink for Failing {
        fn consume(&mut self, _frame: &Frame, _output: &FrameOutput) -> Result<()> {
            Err(anyhow!("disk full"))
        }

        fn finish(&mut self) -> Result<()> {
            Err(anyhow!("flush failed"))
        }
    }

    fn output(index: u64) -> FrameOutput {
        FrameOutput {
            frame_index: index,
            timestamp: 0.0,
            processed: true,
            observation: None,
            trajectory: Vec::new(),
        }
    }

    #[test]
    fn fanout_feeds_every_sink() -> Result<()> {
        let frame = Frame::filled(0, 2, 2, [0, 0, 0])?;
        let mut a: Vec<FrameOutput> = Vec::new();
        let mut b: Vec<FrameOutput> = Vec::new();
        {
            let mut fanout = FanoutSink::new().with(&mut a).with(&mut b);
            assert_eq!(fanout.len(), 2);
            fanout.consume(&frame, &output(0))?;
            fanout.consume(&frame, &output(1))?;
            fanout.finish()?;
        }
        assert_eq!(a.len(), 2);
        assert_eq!(b, a);
        Ok(())
    }

    #[test]
    fn fanout_finishes_all_sinks_even_after_failure() -> Result<()> {
        let frame = Frame::filled(0, 2, 2, [0, 0, 0])?;
        let mut failing = Failing;
        let mut collected: Vec<FrameOutput> = Vec::new();
        let mut fanout = FanoutSink::new().with(&mut failing).with(&mut collected);
        assert!(fanout.consume(&frame, &output(0)).is_err());
        let err = fanout.finish().unwrap_err();
        assert_eq!(err.to_string(), "flush failed");
        Ok(())
    }
}
