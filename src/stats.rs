//! Session statistics.
//!
//! `SessionAggregator` is updated once per frame by the pipeline and finalized into a
//! `SessionSummary` on demand. Blocks that have no data (confidence with zero detections,
//! speed with no speed readings) are `None` rather than zero.

use serde::{Deserialize, Serialize};

/// Running sum and extrema for one metric.
#[derive(Clone, Copy, Debug, Default)]
struct Accumulator {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    fn finish(&self) -> Option<RangeStats> {
        if self.count == 0 {
            return None;
        }
        Some(RangeStats {
            mean: self.sum / self.count as f64,
            min: self.min,
            max: self.max,
        })
    }
}

/// Mean, minimum, and maximum of a metric.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Finalized session statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_frames: u64,
    pub processed_frames: u64,
    pub detections: u64,
    /// Percent of processed frames with a detection, in [0, 100].
    pub detection_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<RangeStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<RangeStats>,
}

/// Per-session counters.
#[derive(Clone, Debug, Default)]
pub struct SessionAggregator {
    total_frames: u64,
    processed_frames: u64,
    detections: u64,
    confidence: Accumulator,
    speed: Accumulator,
}

impl SessionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame that went through detection.
    ///
    /// `confidence` and `speed` are only counted when `had_detection` is true; a `None`
    /// speed is left out of the speed statistics.
    pub fn record(&mut self, had_detection: bool, confidence: Option<f32>, speed: Option<f32>) {
        self.total_frames += 1;
        self.processed_frames += 1;
        if !had_detection {
            return;
        }
        self.detections += 1;
        if let Some(confidence) = confidence {
            self.confidence.add(confidence as f64);
        }
        if let Some(speed) = speed {
            self.speed.add(speed as f64);
        }
    }

    /// Record a frame passed through without detection (frame skip).
    pub fn record_skipped(&mut self) {
        self.total_frames += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn processed_frames(&self) -> u64 {
        self.processed_frames
    }

    pub fn detections(&self) -> u64 {
        self.detections
    }

    pub fn summary(&self) -> SessionSummary {
        let detection_rate = if self.processed_frames == 0 {
            0.0
        } else {
            self.detections as f64 / self.processed_frames as f64 * 100.0
        };
        SessionSummary {
            total_frames: self.total_frames,
            processed_frames: self.processed_frames,
            detections: self.detections,
            detection_rate,
            confidence: self.confidence.finish(),
            speed: self.speed.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_session_summarizes_without_blocks() {
        let summary = SessionAggregator::new().summary();
        assert_eq!(summary.total_frames, 0);
        assert_eq!(summary.detection_rate, 0.0);
        assert!(summary.confidence.is_none());
        assert!(summary.speed.is_none());
    }

    #[test]
    fn speed_block_requires_a_speed_reading() {
        let mut agg = SessionAggregator::new();
        agg.record(true, Some(0.9), None);
        agg.record(false, None, None);

        let summary = agg.summary();
        assert_eq!(summary.detection_rate, 50.0);
        let confidence = summary.confidence.unwrap();
        assert!((confidence.mean - 0.9).abs() < 1e-6);
        assert!(summary.speed.is_none());
    }

    #[test]
    fn absent_speeds_are_excluded_not_zeroed() {
        let mut agg = SessionAggregator::new();
        agg.record(true, Some(0.5), None);
        agg.record(true, Some(0.7), Some(10.0));
        agg.record(true, Some(0.9), Some(30.0));

        let speed = agg.summary().speed.unwrap();
        assert_eq!(speed.mean, 20.0);
        assert_eq!(speed.min, 10.0);
        assert_eq!(speed.max, 30.0);
    }

    #[test]
    fn detection_rate_stays_in_bounds() {
        let mut agg = SessionAggregator::new();
        for i in 0..50 {
            if i % 3 == 0 {
                agg.record_skipped();
            } else {
                agg.record(i % 2 == 0, Some(0.8), Some(1.0));
            }
            let rate = agg.summary().detection_rate;
            assert!((0.0..=100.0).contains(&rate));
            assert_eq!(rate == 0.0, agg.processed_frames() == 0 || agg.detections() == 0);
        }
    }

    #[test]
    fn skipped_frames_count_toward_total_only() {
        let mut agg = SessionAggregator::new();
        agg.record_skipped();
        agg.record_skipped();
        let summary = agg.summary();
        assert_eq!(summary.total_frames, 2);
        assert_eq!(summary.processed_frames, 0);
        assert_eq!(summary.detection_rate, 0.0);
    }

    #[test]
    fn reset_zeroes_everything() {
        let mut agg = SessionAggregator::new();
        agg.record(true, Some(0.9), Some(3.0));
        agg.reset();
        assert_eq!(agg.summary(), SessionAggregator::new().summary());
    }

    #[test]
    fn summary_omits_absent_blocks_in_json() {
        let json = serde_json::to_value(SessionAggregator::new().summary()).unwrap();
        assert!(json.get("confidence").is_none());
        assert!(json.get("speed").is_none());
        assert_eq!(json["detection_rate"], 0.0);
    }
}
