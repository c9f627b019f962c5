//! Overlay rendering.
//!
//! Rendering is split in two: `OverlayPlan` decides what to draw from a trajectory
//! snapshot and the current observation, and a `Renderer` draws a plan onto a frame.

mod font;
pub mod overlay;
mod raster;

use anyhow::Result;
use image::RgbImage;

use crate::frame::Frame;

pub use overlay::{InfoPanel, Label, Marker, OverlayPlan, PanelStats, Segment};
pub use raster::RasterRenderer;

/// Produces an annotated image for one frame.
pub trait Renderer: Send {
    fn render(&self, frame: &Frame, plan: &OverlayPlan) -> Result<RgbImage>;
}
