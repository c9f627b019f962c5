//! JSON tracking report.
//!
//! Written to `<dir>/<stem>_ball_data.json` at the end of a session:
//!
//! ```json
//! {
//!   "metadata": { "source": "...", "detector": "color", "tracking_target": "sports_ball",
//!                 "total_detections": 3, "processed_at": 1760000000 },
//!   "session": { "stop_reason": "end_of_stream", "elapsed_secs": 1.2, ... },
//!   "summary": { "total_frames": 5, ..., "confidence": { "mean": .., "min": .., "max": .. } },
//!   "trajectory": [ { "frame_index": 0, "timestamp": 0.0, "position": { "x": .., "y": .. }, ... } ]
//! }
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::pipeline::{SessionReport, StopReason};
use crate::stats::SessionSummary;
use crate::track::BallObservation;

pub const TRACKING_TARGET: &str = "sports_ball";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub source: String,
    pub detector: String,
    pub tracking_target: String,
    pub total_detections: usize,
    /// Unix seconds.
    pub processed_at: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub stop_reason: String,
    pub elapsed_secs: f64,
    pub processing_fps: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal_fps: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackingReport {
    pub metadata: ReportMetadata,
    pub session: SessionInfo,
    pub summary: SessionSummary,
    pub trajectory: Vec<BallObservation>,
}

impl TrackingReport {
    pub fn new(
        source: &str,
        detector: &str,
        nominal_fps: Option<f64>,
        report: &SessionReport,
        observations: Vec<BallObservation>,
    ) -> Self {
        Self {
            metadata: ReportMetadata {
                source: source.to_string(),
                detector: detector.to_string(),
                tracking_target: TRACKING_TARGET.to_string(),
                total_detections: observations.len(),
                processed_at: unix_now(),
            },
            session: SessionInfo {
                stop_reason: stop_reason_label(&report.stop_reason),
                elapsed_secs: report.elapsed.as_secs_f64(),
                processing_fps: report.processing_fps,
                nominal_fps,
            },
            summary: report.summary.clone(),
            trajectory: observations,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize tracking report")
    }

    /// Write to `dir/<stem>_ball_data.json`, creating `dir` if needed.
    pub fn write_to_dir<P: AsRef<Path>>(&self, dir: P, stem: &str) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        let path = dir.join(format!("{}_ball_data.json", stem));
        let file = File::create(&path)
            .with_context(|| format!("failed to create report {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("failed to flush report {}", path.display()))?;
        Ok(path)
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse report {}", path.display()))
    }
}

/// File stem for a source URI: `clips/rally.mp4` -> `rally`, `stub://court` -> `court`,
/// `/dev/video0` -> `video0`.
pub fn report_stem(uri: &str) -> String {
    let trimmed = uri.strip_prefix("stub://").unwrap_or(uri);
    let stem = Path::new(trimmed)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("session");
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn stop_reason_label(reason: &StopReason) -> String {
    match reason {
        StopReason::EndOfStream => "end_of_stream".to_string(),
        StopReason::Requested => "requested".to_string(),
        StopReason::FrameLimit => "frame_limit".to_string(),
        StopReason::OutputFailed(err) => format!("output_failed: {}", err),
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_from_uris() {
        assert_eq!(report_stem("clips/rally.mp4"), "rally");
        assert_eq!(report_stem("stub://court"), "court");
        assert_eq!(report_stem("/dev/video0"), "video0");
        assert_eq!(report_stem("stub://"), "session");
        assert_eq!(report_stem("my clip.mov"), "my_clip");
    }

    #[test]
    fn stop_reasons_have_stable_labels() {
        assert_eq!(stop_reason_label(&StopReason::EndOfStream), "end_of_stream");
        assert_eq!(
            stop_reason_label(&StopReason::OutputFailed("disk full".into())),
            "output_failed: disk full"
        );
    }
}
