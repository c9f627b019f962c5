use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Scripted backend for tests and replays.
///
/// Returns the candidates scripted for a frame index, an error for indices marked as
/// failing, and nothing otherwise. Every call is counted.
#[derive(Default)]
pub struct ScriptedBackend {
    script: HashMap<u64, Vec<Detection>>,
    failures: HashSet<u64>,
    calls: Vec<u64>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the candidates returned for `frame_index`.
    pub fn with_frame(mut self, frame_index: u64, candidates: Vec<Detection>) -> Self {
        self.script.insert(frame_index, candidates);
        self
    }

    /// Make `detect` fail for `frame_index`.
    pub fn failing_on(mut self, frame_index: u64) -> Self {
        self.failures.insert(frame_index);
        self
    }

    /// Frame indices `detect` was called with, in call order.
    pub fn calls(&self) -> &[u64] {
        &self.calls
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        self.calls.push(frame.index);
        if self.failures.contains(&frame.index) {
            return Err(anyhow!("scripted failure on frame {}", frame.index));
        }
        Ok(self.script.get(&frame.index).cloned().unwrap_or_default())
    }
}
