use anyhow::Result;

use super::OutputSink;
use crate::frame::Frame;
use crate::pipeline::FrameOutput;
use crate::track::BallObservation;

/// Every observation of a session, in frame order.
///
/// Append-only: a pipeline reset clears the live trajectory and statistics but not the
/// log, so the exported report still covers the whole run.
#[derive(Clone, Debug, Default)]
pub struct ObservationLog {
    observations: Vec<BallObservation>,
    resets: u32,
}

impl ObservationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observations(&self) -> &[BallObservation] {
        &self.observations
    }

    pub fn into_observations(self) -> Vec<BallObservation> {
        self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Resets seen during the session.
    pub fn resets(&self) -> u32 {
        self.resets
    }
}

impl OutputSink for ObservationLog {
    fn consume(&mut self, _frame: &Frame, output: &FrameOutput) -> Result<()> {
        if let Some(observation) = &output.observation {
            self.observations.push(observation.clone());
        }
        Ok(())
    }

    fn on_reset(&mut self) {
        self.resets += 1;
    }
}
