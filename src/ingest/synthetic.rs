use std::f32::consts::PI;
use std::time::{Duration, Instant};

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detect::BALL_RGB;
use crate::frame::{rgb_len, Frame, RGB_CHANNELS};

const TABLE_RGB: [u8; 3] = [18, 84, 62];
const LINE_RGB: [u8; 3] = [235, 235, 235];
const BALL_RADIUS: f32 = 6.0;
/// Frames for one crossing of the table.
const CROSSING_FRAMES: f32 = 45.0;

/// Synthetic rally: an orange ball crossing a green table in arcs.
///
/// Used behind `stub://` URIs. The ball is occasionally hidden (occlusion) so sessions
/// exercise missed detections. Output is deterministic for a given seed.
pub(crate) struct SyntheticRally {
    width: u32,
    height: u32,
    limit: Option<u64>,
    occlusion_rate: f64,
    frame_count: u64,
    rng: StdRng,
    pace: Option<Duration>,
    next_due: Option<Instant>,
}

impl SyntheticRally {
    pub(crate) fn new(width: u32, height: u32, limit: Option<u64>, seed: u64) -> Self {
        Self {
            width,
            height,
            limit,
            occlusion_rate: 0.05,
            frame_count: 0,
            rng: StdRng::seed_from_u64(seed),
            pace: None,
            next_due: None,
        }
    }

    /// Sleep between frames so output arrives at roughly `fps`.
    pub(crate) fn paced(mut self, fps: f64) -> Self {
        if fps.is_finite() && fps > 0.0 {
            self.pace = Some(Duration::from_secs_f64(1.0 / fps));
        }
        self
    }

    pub(crate) fn frames_generated(&self) -> u64 {
        self.frame_count
    }

    /// Ball center for a frame index.
    pub(crate) fn ball_center(&self, index: u64) -> (f32, f32) {
        let margin = self.width as f32 * 0.1;
        let span = self.width as f32 - 2.0 * margin;
        let phase = (index as f32 / CROSSING_FRAMES) % 2.0;
        let along = if phase <= 1.0 { phase } else { 2.0 - phase };
        let x = margin + span * along;

        let floor = self.height as f32 * 0.75;
        let arc = self.height as f32 * 0.45;
        let y = floor - arc * (PI * (phase % 1.0)).sin();
        (x, y)
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.limit.is_some_and(|limit| self.frame_count >= limit) {
            return Ok(None);
        }
        self.wait_for_slot();

        let index = self.frame_count;
        self.frame_count += 1;

        let mut pixels = self.background()?;
        let occluded = self.rng.gen_bool(self.occlusion_rate);
        if !occluded {
            let (cx, cy) = self.ball_center(index);
            self.draw_ball(&mut pixels, cx, cy);
        }
        Frame::new(index, self.width, self.height, pixels).map(Some)
    }

    fn wait_for_slot(&mut self) {
        let Some(pace) = self.pace else {
            return;
        };
        let now = Instant::now();
        if let Some(due) = self.next_due {
            if due > now {
                std::thread::sleep(due - now);
            }
        }
        self.next_due = Some(self.next_due.unwrap_or(now).max(now) + pace);
    }

    fn background(&self) -> Result<Vec<u8>> {
        let len = rgb_len(self.width, self.height)?;
        let mut pixels = Vec::with_capacity(len);
        let net_x = self.width / 2;
        for _y in 0..self.height {
            for x in 0..self.width {
                if x == net_x || x + 1 == net_x {
                    pixels.extend_from_slice(&LINE_RGB);
                } else {
                    pixels.extend_from_slice(&TABLE_RGB);
                }
            }
        }
        Ok(pixels)
    }

    fn draw_ball(&self, pixels: &mut [u8], cx: f32, cy: f32) {
        let r = BALL_RADIUS;
        let x0 = (cx - r).floor().max(0.0) as u32;
        let y0 = (cy - r).floor().max(0.0) as u32;
        let x1 = ((cx + r).ceil() as u32).min(self.width.saturating_sub(1));
        let y1 = ((cy + r).ceil() as u32).min(self.height.saturating_sub(1));
        for y in y0..=y1 {
            for x in x0..=x1 {
                let (dx, dy) = (x as f32 + 0.5 - cx, y as f32 + 0.5 - cy);
                if dx * dx + dy * dy <= r * r {
                    let idx = (y as usize * self.width as usize + x as usize) * RGB_CHANNELS;
                    pixels[idx..idx + RGB_CHANNELS].copy_from_slice(&BALL_RGB);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{ColorBlobBackend, DetectorBackend};

    #[test]
    fn finite_rally_ends() -> Result<()> {
        let mut rally = SyntheticRally::new(64, 48, Some(3), 7);
        for expected in 0..3 {
            let frame = rally.next_frame()?.expect("frame");
            assert_eq!(frame.index, expected);
        }
        assert!(rally.next_frame()?.is_none());
        assert_eq!(rally.frames_generated(), 3);
        Ok(())
    }

    #[test]
    fn colour_backend_finds_the_synthetic_ball() -> Result<()> {
        let mut rally = SyntheticRally::new(320, 240, Some(40), 1);
        rally.occlusion_rate = 0.0;
        let mut backend = ColorBlobBackend::default();
        while let Some(frame) = rally.next_frame()? {
            let (cx, cy) = rally.ball_center(frame.index);
            let found = backend.detect(&frame)?;
            assert_eq!(found.len(), 1, "frame {}", frame.index);
            assert!((found[0].x - cx).abs() <= 3.0);
            assert!((found[0].y - cy).abs() <= 3.0);
        }
        Ok(())
    }
}
