use std::collections::VecDeque;
use std::f32::consts::FRAC_PI_4;

use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Orange table-tennis ball (#fa8b32).
pub const BALL_RGB: [u8; 3] = [0xfa, 0x8b, 0x32];

/// CPU backend that finds ball-coloured blobs.
///
/// Pixels within `tolerance` of the target colour (per channel) are sampled on a grid of
/// `stride` pixels and grouped into 4-connected blobs. Each blob large enough becomes a
/// candidate whose confidence is its fill ratio relative to a disc inscribed in its box.
pub struct ColorBlobBackend {
    target: [u8; 3],
    tolerance: u8,
    stride: u32,
    min_samples: usize,
}

impl Default for ColorBlobBackend {
    fn default() -> Self {
        Self {
            target: BALL_RGB,
            tolerance: 60,
            stride: 2,
            min_samples: 4,
        }
    }
}

impl ColorBlobBackend {
    pub fn new(target: [u8; 3]) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn with_tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sampling stride in pixels (clamped to at least 1).
    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride.max(1);
        self
    }

    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples.max(1);
        self
    }

    fn matches(&self, rgb: [u8; 3]) -> bool {
        rgb.iter()
            .zip(self.target.iter())
            .all(|(&p, &t)| p.abs_diff(t) <= self.tolerance)
    }

    fn mask(&self, frame: &Frame) -> (Vec<bool>, usize, usize) {
        let cols = frame.width.div_ceil(self.stride) as usize;
        let rows = frame.height.div_ceil(self.stride) as usize;
        let mut mask = vec![false; cols * rows];
        for row in 0..rows {
            for col in 0..cols {
                let x = col as u32 * self.stride;
                let y = row as u32 * self.stride;
                if let Some(rgb) = frame.pixel(x, y) {
                    mask[row * cols + col] = self.matches(rgb);
                }
            }
        }
        (mask, cols, rows)
    }
}

struct Blob {
    samples: usize,
    min_col: usize,
    max_col: usize,
    min_row: usize,
    max_row: usize,
}

fn collect_blobs(mask: &mut [bool], cols: usize, rows: usize) -> Vec<Blob> {
    let mut blobs = Vec::new();
    let mut queue = VecDeque::new();
    for start in 0..mask.len() {
        if !mask[start] {
            continue;
        }
        mask[start] = false;
        queue.push_back(start);
        let mut blob = Blob {
            samples: 0,
            min_col: usize::MAX,
            max_col: 0,
            min_row: usize::MAX,
            max_row: 0,
        };
        while let Some(idx) = queue.pop_front() {
            let (row, col) = (idx / cols, idx % cols);
            blob.samples += 1;
            blob.min_col = blob.min_col.min(col);
            blob.max_col = blob.max_col.max(col);
            blob.min_row = blob.min_row.min(row);
            blob.max_row = blob.max_row.max(row);

            let mut visit = |n: usize| {
                if mask[n] {
                    mask[n] = false;
                    queue.push_back(n);
                }
            };
            if col > 0 {
                visit(idx - 1);
            }
            if col + 1 < cols {
                visit(idx + 1);
            }
            if row > 0 {
                visit(idx - cols);
            }
            if row + 1 < rows {
                visit(idx + cols);
            }
        }
        blobs.push(blob);
    }
    blobs
}

impl DetectorBackend for ColorBlobBackend {
    fn name(&self) -> &'static str {
        "color"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let (mut mask, cols, rows) = self.mask(frame);
        let stride = self.stride as f32;

        let candidates = collect_blobs(&mut mask, cols, rows)
            .into_iter()
            .filter(|blob| blob.samples >= self.min_samples)
            .map(|blob| {
                let box_cells = (blob.max_col - blob.min_col + 1) * (blob.max_row - blob.min_row + 1);
                let fill = blob.samples as f32 / box_cells as f32;
                let confidence = (fill / FRAC_PI_4).clamp(0.0, 1.0);
                Detection::from_corners(
                    blob.min_col as f32 * stride,
                    blob.min_row as f32 * stride,
                    (blob.max_col + 1) as f32 * stride,
                    (blob.max_row + 1) as f32 * stride,
                    confidence,
                )
            })
            .collect::<Vec<_>>();

        log::trace!(
            "color backend: frame {} -> {} candidates",
            frame.index,
            candidates.len()
        );
        Ok(candidates)
    }
}
