//! Overlay plan: what to draw for one frame, independent of the drawing surface.

use crate::detect::BALL_RGB;
use crate::track::{BallObservation, Point};

pub const TRAJECTORY_RGB: [u8; 3] = [0, 150, 255];
pub const LABEL_RGB: [u8; 3] = [255, 255, 255];
pub const SPEED_RGB: [u8; 3] = [255, 255, 0];
pub const DETECTED_RGB: [u8; 3] = [0, 255, 0];
pub const MISSING_RGB: [u8; 3] = [255, 0, 0];

pub const MARKER_OUTER_RADIUS: i32 = 15;
pub const MARKER_INNER_RADIUS: i32 = 8;
/// Speeds at or below this (px/s) get no label.
pub const MIN_LABELLED_SPEED: f32 = 5.0;
/// Height of the darkened info panel at the top of the frame.
pub const PANEL_HEIGHT: u32 = 120;

const TEXT_SCALE: u32 = 2;

/// One trajectory segment. Older segments are fainter and thinner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
    /// Opacity in (0, 1].
    pub alpha: f32,
    pub thickness: u32,
}

/// Ring plus filled dot at the current ball position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Marker {
    pub center: Point,
    pub outer_radius: i32,
    pub inner_radius: i32,
    pub color: [u8; 3],
}

/// Text anchored at its top-left corner.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub scale: u32,
    pub color: [u8; 3],
}

/// Session counters shown in the info panel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PanelStats {
    pub frame_index: u64,
    pub total_frames: Option<u64>,
    pub detections: u64,
    pub processed: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InfoPanel {
    pub height: u32,
    pub lines: Vec<Label>,
}

impl InfoPanel {
    pub fn build(stats: &PanelStats, observation: Option<&BallObservation>) -> Self {
        let frame = match stats.total_frames {
            Some(total) => format!("Frame: {}/{}", stats.frame_index, total),
            None => format!("Frame: {}", stats.frame_index),
        };
        let (status, status_color) = match observation {
            Some(_) => ("Status: DETECTED", DETECTED_RGB),
            None => ("Status: NO BALL", MISSING_RGB),
        };

        let mut lines = vec![
            panel_line(frame, 0, LABEL_RGB),
            panel_line(status.to_string(), 1, status_color),
            panel_line(
                format!("Detections: {}/{}", stats.detections, stats.processed),
                2,
                LABEL_RGB,
            ),
        ];
        if let Some(obs) = observation {
            let mut text = format!(
                "Pos: ({:.0}, {:.0}) | Conf: {:.2}",
                obs.position.x, obs.position.y, obs.confidence
            );
            if let Some(speed) = obs.speed {
                text.push_str(&format!(" | Speed: {:.0} px/s", speed));
            }
            lines.push(panel_line(text, 3, SPEED_RGB));
        }

        Self {
            height: PANEL_HEIGHT,
            lines,
        }
    }
}

fn panel_line(text: String, row: i32, color: [u8; 3]) -> Label {
    Label {
        text,
        x: 10,
        y: 10 + row * 30,
        scale: TEXT_SCALE,
        color,
    }
}

/// Everything drawn on top of one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayPlan {
    pub segments: Vec<Segment>,
    pub marker: Option<Marker>,
    pub labels: Vec<Label>,
    pub panel: Option<InfoPanel>,
}

impl OverlayPlan {
    /// Plan the trajectory and current-ball overlay.
    ///
    /// With `n` trajectory points, segment `i` (from point `i` to `i + 1`) has
    /// `alpha = (i + 1) / n` and `thickness = 2 + 3 * alpha`, truncated.
    pub fn build(trajectory: &[Point], observation: Option<&BallObservation>) -> Self {
        let n = trajectory.len() as f32;
        let segments = trajectory
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let alpha = (i as f32 + 1.0) / n;
                Segment {
                    from: pair[0],
                    to: pair[1],
                    alpha,
                    thickness: (2.0 + alpha * 3.0) as u32,
                }
            })
            .collect();

        let mut plan = Self {
            segments,
            ..Self::default()
        };
        let Some(obs) = observation else {
            return plan;
        };

        let center = obs.position;
        plan.marker = Some(Marker {
            center,
            outer_radius: MARKER_OUTER_RADIUS,
            inner_radius: MARKER_INNER_RADIUS,
            color: BALL_RGB,
        });
        let anchor_x = center.x as i32 + 20;
        plan.labels.push(Label {
            text: format!("{:.2}", obs.confidence),
            x: anchor_x,
            y: center.y as i32 - 24,
            scale: TEXT_SCALE,
            color: LABEL_RGB,
        });
        if let Some(speed) = obs.speed.filter(|s| *s > MIN_LABELLED_SPEED) {
            plan.labels.push(Label {
                text: format!("{:.0} px/s", speed),
                x: anchor_x,
                y: center.y as i32 - 4,
                scale: TEXT_SCALE,
                color: SPEED_RGB,
            });
        }
        plan
    }

    pub fn with_panel(mut self, panel: InfoPanel) -> Self {
        self.panel = Some(panel);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(speed: Option<f32>) -> BallObservation {
        BallObservation {
            frame_index: 7,
            timestamp: 0.25,
            position: Point::new(100.0, 80.0),
            confidence: 0.9,
            velocity: None,
            speed,
        }
    }

    #[test]
    fn segments_fade_with_age() {
        let points: Vec<Point> = (0..4).map(|i| Point::new(i as f32, 0.0)).collect();
        let plan = OverlayPlan::build(&points, None);
        let alphas: Vec<f32> = plan.segments.iter().map(|s| s.alpha).collect();
        let thickness: Vec<u32> = plan.segments.iter().map(|s| s.thickness).collect();
        assert_eq!(alphas, vec![0.25, 0.5, 0.75]);
        assert_eq!(thickness, vec![2, 3, 4]);
        assert!(plan.marker.is_none());
        assert!(plan.labels.is_empty());
    }

    #[test]
    fn single_point_has_no_segments() {
        let plan = OverlayPlan::build(&[Point::new(1.0, 1.0)], None);
        assert!(plan.segments.is_empty());
    }

    #[test]
    fn slow_ball_gets_no_speed_label() {
        let plan = OverlayPlan::build(&[], Some(&observation(Some(5.0))));
        let texts: Vec<&str> = plan.labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["0.90"]);
        assert_eq!(plan.marker.map(|m| m.outer_radius), Some(15));
    }

    #[test]
    fn fast_ball_gets_speed_label() {
        let plan = OverlayPlan::build(&[], Some(&observation(Some(123.4))));
        assert_eq!(plan.labels[1].text, "123 px/s");
    }

    #[test]
    fn panel_reports_status_and_ball_line() {
        let stats = PanelStats {
            frame_index: 12,
            total_frames: Some(300),
            detections: 4,
            processed: 6,
        };
        let obs = observation(Some(42.0));
        let panel = InfoPanel::build(&stats, Some(&obs));
        let texts: Vec<&str> = panel.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Frame: 12/300",
                "Status: DETECTED",
                "Detections: 4/6",
                "Pos: (100, 80) | Conf: 0.90 | Speed: 42 px/s",
            ]
        );

        let empty = InfoPanel::build(&PanelStats::default(), None);
        assert_eq!(empty.lines.len(), 3);
        assert_eq!(empty.lines[0].text, "Frame: 0");
        assert_eq!(empty.lines[1].color, MISSING_RGB);
    }
}
