use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use super::OutputSink;
use crate::frame::Frame;
use crate::pipeline::FrameOutput;
use crate::render::{InfoPanel, OverlayPlan, PanelStats, RasterRenderer, Renderer};

/// Image format for written frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    #[default]
    Png,
    Jpg,
}

impl FrameFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FrameFormat::Png => "png",
            FrameFormat::Jpg => "jpg",
        }
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FrameFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(FrameFormat::Png),
            "jpg" | "jpeg" => Ok(FrameFormat::Jpg),
            other => Err(anyhow!("unsupported frame format '{}' (png|jpg)", other)),
        }
    }
}

/// Writes annotated frames as numbered images (`frame_000042.png`).
///
/// Keeps its own detection/processed counters for the info panel; they follow pipeline
/// resets.
pub struct FrameDirWriter {
    dir: PathBuf,
    format: FrameFormat,
    renderer: Box<dyn Renderer>,
    total_frames: Option<u64>,
    detections: u64,
    processed: u64,
    written: u64,
}

impl FrameDirWriter {
    pub fn new<P: AsRef<Path>>(dir: P, format: FrameFormat) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create frame directory {}", dir.display()))?;
        Ok(Self {
            dir,
            format,
            renderer: Box::new(RasterRenderer::new()),
            total_frames: None,
            detections: 0,
            processed: 0,
            written: 0,
        })
    }

    pub fn with_renderer<R: Renderer + 'static>(mut self, renderer: R) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Frame count shown as "Frame: n/total" in the panel.
    pub fn with_total_frames(mut self, total: Option<u64>) -> Self {
        self.total_frames = total;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn path_for(&self, frame_index: u64) -> PathBuf {
        self.dir
            .join(format!("frame_{:06}.{}", frame_index, self.format.extension()))
    }
}

impl OutputSink for FrameDirWriter {
    fn consume(&mut self, frame: &Frame, output: &FrameOutput) -> Result<()> {
        if output.processed {
            self.processed += 1;
        }
        if output.observation.is_some() {
            self.detections += 1;
        }
        let stats = PanelStats {
            frame_index: output.frame_index,
            total_frames: self.total_frames,
            detections: self.detections,
            processed: self.processed,
        };
        let observation = output.observation.as_ref();
        let plan = OverlayPlan::build(&output.trajectory, observation)
            .with_panel(InfoPanel::build(&stats, observation));
        let image = self.renderer.render(frame, &plan)?;

        let path = self.path_for(output.frame_index);
        image
            .save(&path)
            .with_context(|| format!("failed to write frame {}", path.display()))?;
        self.written += 1;
        Ok(())
    }

    fn on_reset(&mut self) {
        self.detections = 0;
        self.processed = 0;
    }

    fn finish(&mut self) -> Result<()> {
        log::info!(
            "wrote {} annotated frames to {}",
            self.written,
            self.dir.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{BallObservation, Point};

    #[test]
    fn parses_formats() {
        assert_eq!("PNG".parse::<FrameFormat>().unwrap(), FrameFormat::Png);
        assert_eq!("jpeg".parse::<FrameFormat>().unwrap(), FrameFormat::Jpg);
        assert!("gif".parse::<FrameFormat>().is_err());
    }

    #[test]
    fn writes_numbered_frames() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut writer = FrameDirWriter::new(dir.path().join("frames"), FrameFormat::Png)?;
        let frame = Frame::filled(3, 64, 48, [10, 10, 10])?;
        let output = FrameOutput {
            frame_index: 3,
            timestamp: 0.1,
            processed: true,
            observation: Some(BallObservation {
                frame_index: 3,
                timestamp: 0.1,
                position: Point::new(30.0, 30.0),
                confidence: 0.7,
                velocity: None,
                speed: None,
            }),
            trajectory: vec![Point::new(30.0, 30.0)],
        };
        writer.consume(&frame, &output)?;
        writer.finish()?;

        let path = writer.path_for(3);
        assert!(path.ends_with("frame_000003.png"));
        let written = image::open(&path)?.to_rgb8();
        assert_eq!(written.dimensions(), (64, 48));
        assert_eq!(writer.written(), 1);
        Ok(())
    }
}
