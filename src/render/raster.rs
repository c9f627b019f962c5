use std::collections::HashSet;

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, BresenhamLineIter};

use super::font::{glyph, ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use super::overlay::{InfoPanel, Label, Marker, OverlayPlan, Segment, TRAJECTORY_RGB};
use super::Renderer;
use crate::frame::Frame;

/// Draws overlay plans onto RGB images.
#[derive(Clone, Debug)]
pub struct RasterRenderer {
    /// How much the info panel darkens the frame beneath it (0 = none, 1 = black).
    panel_shade: f32,
}

impl Default for RasterRenderer {
    fn default() -> Self {
        Self { panel_shade: 0.6 }
    }
}

impl RasterRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_panel_shade(mut self, shade: f32) -> Self {
        self.panel_shade = shade.clamp(0.0, 1.0);
        self
    }

    fn draw_panel(&self, image: &mut RgbImage, panel: &InfoPanel) {
        let keep = 1.0 - self.panel_shade;
        let rows = panel.height.min(image.height());
        for y in 0..rows {
            for x in 0..image.width() {
                let px = image.get_pixel_mut(x, y);
                for c in px.0.iter_mut() {
                    *c = (*c as f32 * keep).round() as u8;
                }
            }
        }
        for line in &panel.lines {
            draw_label(image, line);
        }
    }
}

impl Renderer for RasterRenderer {
    fn render(&self, frame: &Frame, plan: &OverlayPlan) -> Result<RgbImage> {
        let mut image = RgbImage::from_raw(frame.width, frame.height, frame.pixels().to_vec())
            .context("frame buffer does not match its dimensions")?;

        for segment in &plan.segments {
            draw_segment(&mut image, segment);
        }
        if let Some(marker) = &plan.marker {
            draw_marker(&mut image, marker);
        }
        for label in &plan.labels {
            draw_label(&mut image, label);
        }
        if let Some(panel) = &plan.panel {
            self.draw_panel(&mut image, panel);
        }
        Ok(image)
    }
}

fn draw_segment(image: &mut RgbImage, segment: &Segment) {
    let radius = (segment.thickness / 2) as i32;
    let line = BresenhamLineIter::new(
        (segment.from.x, segment.from.y),
        (segment.to.x, segment.to.y),
    );
    // Each covered pixel is blended once, however many brush stamps touch it.
    let mut covered = HashSet::new();
    for (cx, cy) in line {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    covered.insert((cx + dx, cy + dy));
                }
            }
        }
    }
    for (x, y) in covered {
        blend(image, x, y, TRAJECTORY_RGB, segment.alpha);
    }
}

fn draw_marker(image: &mut RgbImage, marker: &Marker) {
    let center = (marker.center.x as i32, marker.center.y as i32);
    let color = Rgb(marker.color);
    // Two-pixel ring.
    draw_hollow_circle_mut(image, center, marker.outer_radius, color);
    draw_hollow_circle_mut(image, center, marker.outer_radius - 1, color);
    draw_filled_circle_mut(image, center, marker.inner_radius, color);
}

fn draw_label(image: &mut RgbImage, label: &Label) {
    let scale = label.scale.max(1) as i32;
    let mut pen_x = label.x;
    for ch in label.text.chars() {
        if let Some(rows) = glyph(ch) {
            for (row, bits) in rows.iter().enumerate().take(GLYPH_HEIGHT as usize) {
                for col in 0..GLYPH_WIDTH {
                    if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                        continue;
                    }
                    let x0 = pen_x + col as i32 * scale;
                    let y0 = label.y + row as i32 * scale;
                    for sy in 0..scale {
                        for sx in 0..scale {
                            put(image, x0 + sx, y0 + sy, label.color);
                        }
                    }
                }
            }
        }
        pen_x += ADVANCE as i32 * scale;
    }
}

fn put(image: &mut RgbImage, x: i32, y: i32, color: [u8; 3]) {
    if x < 0 || y < 0 || x >= image.width() as i32 || y >= image.height() as i32 {
        return;
    }
    image.put_pixel(x as u32, y as u32, Rgb(color));
}

fn blend(image: &mut RgbImage, x: i32, y: i32, color: [u8; 3], alpha: f32) {
    if x < 0 || y < 0 || x >= image.width() as i32 || y >= image.height() as i32 {
        return;
    }
    let px = image.get_pixel_mut(x as u32, y as u32);
    for (dst, src) in px.0.iter_mut().zip(color) {
        *dst = (*dst as f32 * (1.0 - alpha) + src as f32 * alpha).round() as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BALL_RGB;
    use crate::render::overlay::PanelStats;
    use crate::track::{BallObservation, Point};

    fn grey(width: u32, height: u32) -> Frame {
        Frame::filled(0, width, height, [100, 100, 100]).unwrap()
    }

    fn observation_at(x: f32, y: f32) -> BallObservation {
        BallObservation {
            frame_index: 0,
            timestamp: 0.0,
            position: Point::new(x, y),
            confidence: 0.8,
            velocity: None,
            speed: Some(250.0),
        }
    }

    #[test]
    fn marker_fills_ball_position() -> Result<()> {
        let obs = observation_at(60.0, 60.0);
        let plan = OverlayPlan::build(&[obs.position], Some(&obs));
        let image = RasterRenderer::new().render(&grey(160, 120), &plan)?;
        assert_eq!(image.get_pixel(60, 60).0, BALL_RGB);
        assert_eq!(image.get_pixel(60 + 15, 60).0, BALL_RGB);
        assert_eq!(image.get_pixel(60 + 11, 60).0, [100, 100, 100]);
        Ok(())
    }

    #[test]
    fn segment_blends_by_alpha() -> Result<()> {
        let points = [Point::new(10.0, 50.0), Point::new(90.0, 50.0)];
        let plan = OverlayPlan::build(&points, None);
        let image = RasterRenderer::new().render(&grey(100, 100), &plan)?;
        // Two points: the only segment has alpha 0.5.
        let mid = image.get_pixel(50, 50).0;
        assert_eq!(mid[0], ((100.0 * 0.5) + TRAJECTORY_RGB[0] as f32 * 0.5).round() as u8);
        assert_eq!(mid[2], ((100.0 * 0.5) + TRAJECTORY_RGB[2] as f32 * 0.5).round() as u8);
        Ok(())
    }

    #[test]
    fn panel_darkens_top_rows_only() -> Result<()> {
        let panel = InfoPanel::build(&PanelStats::default(), None);
        let plan = OverlayPlan::default().with_panel(panel);
        let image = RasterRenderer::new().render(&grey(400, 200), &plan)?;
        assert_eq!(image.get_pixel(399, 119).0, [40, 40, 40]);
        assert_eq!(image.get_pixel(399, 120).0, [100, 100, 100]);
        Ok(())
    }

    #[test]
    fn off_frame_overlay_is_clipped() -> Result<()> {
        let obs = observation_at(-40.0, 500.0);
        let points = [Point::new(-100.0, -100.0), obs.position];
        let plan = OverlayPlan::build(&points, Some(&obs));
        let image = RasterRenderer::new().render(&grey(32, 32), &plan)?;
        assert_eq!(image.dimensions(), (32, 32));
        Ok(())
    }
}
