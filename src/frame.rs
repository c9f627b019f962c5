//! Frame container shared by sources, detectors, and renderers.
//!
//! - `Frame`: RGB24 pixels plus capture metadata. Produced by an ingest source, borrowed by
//!   the detector and renderer, never mutated by the pipeline.
//!
//! Frame indices are assigned by the source in capture order and start at zero.

use anyhow::{anyhow, Result};
use std::time::Instant;

/// Bytes per pixel for packed RGB24 frames.
pub const RGB_CHANNELS: usize = 3;

/// A captured video frame in packed RGB24.
#[derive(Clone)]
pub struct Frame {
    /// Position of this frame in the source stream (0-based).
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pixels: Vec<u8>,
    /// Monotonic capture instant (wall-clock timestamp policy reads this).
    captured_at: Instant,
}

impl Frame {
    /// Wrap RGB24 pixels. Fails when the buffer length does not match the dimensions.
    pub fn new(index: u64, width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        Self::captured(index, width, height, pixels, Instant::now())
    }

    /// Wrap RGB24 pixels with an explicit capture instant.
    pub fn captured(
        index: u64,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        captured_at: Instant,
    ) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        Ok(Self {
            index,
            width,
            height,
            pixels,
            captured_at,
        })
    }

    /// Solid-colour frame. Mostly useful for tests and synthetic sources.
    pub fn filled(index: u64, width: u32, height: u32, rgb: [u8; 3]) -> Result<Self> {
        let len = rgb_len(width, height)?;
        let mut pixels = Vec::with_capacity(len);
        for _ in 0..len / RGB_CHANNELS {
            pixels.extend_from_slice(&rgb);
        }
        Self::new(index, width, height, pixels)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// RGB value at (x, y), or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * RGB_CHANNELS;
        Some([self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2]])
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("index", &self.index)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

pub(crate) fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(RGB_CHANNELS))
        .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))
}
