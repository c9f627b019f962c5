#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::{imageops::FilterType, RgbImage};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// COCO class index for "sports ball".
pub const SPORTS_BALL_CLASS: usize = 32;

/// Tract-based backend for YOLO-style ONNX models.
///
/// Expects a single output shaped `[1, 4 + classes, anchors]` with `cx, cy, w, h` rows
/// followed by per-class scores, in model input pixels. Only the configured class is kept.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    class_index: usize,
    score_floor: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for square `input_size` inputs.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size,
            class_index: SPORTS_BALL_CLASS,
            score_floor: 0.05,
        })
    }

    /// Keep a different class than COCO "sports ball" (e.g. a single-class ball model).
    pub fn with_class(mut self, class_index: usize) -> Self {
        self.class_index = class_index;
        self
    }

    /// Drop candidates below this score before they reach the selector.
    pub fn with_score_floor(mut self, score_floor: f32) -> Self {
        self.score_floor = score_floor;
        self
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let image = RgbImage::from_raw(frame.width, frame.height, frame.pixels().to_vec())
            .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;
        let resized =
            image::imageops::resize(&image, self.input_size, self.input_size, FilterType::Triangle);
        let side = self.input_size as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }

    fn decode(&self, output: &Tensor, frame: &Frame) -> Result<Vec<Detection>> {
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape();
        if shape.len() != 3 || shape[1] <= 4 + self.class_index {
            return Err(anyhow!("unexpected model output shape {:?}", shape));
        }
        let anchors = shape[2];
        let scale_x = frame.width as f32 / self.input_size as f32;
        let scale_y = frame.height as f32 / self.input_size as f32;

        let mut candidates = Vec::new();
        for a in 0..anchors {
            let score = view[[0, 4 + self.class_index, a]];
            if !score.is_finite() || score < self.score_floor {
                continue;
            }
            candidates.push(Detection::new(
                view[[0, 0, a]] * scale_x,
                view[[0, 1, a]] * scale_y,
                view[[0, 2, a]] * scale_x,
                view[[0, 3, a]] * scale_y,
                score.min(1.0),
            ));
        }
        Ok(candidates)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        self.decode(output, frame)
    }
}
