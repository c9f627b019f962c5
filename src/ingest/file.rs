//! Local video file source (stored-video sessions).
//!
//! `FileSource` reads frames from a local file:
//! - `stub://<name>` paths produce a finite synthetic rally
//! - other local paths decode through FFmpeg (feature: ingest-file-ffmpeg)
//!
//! Remote URLs are rejected; ingestion is local-only.

use anyhow::{anyhow, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::synthetic::SyntheticRally;
use super::FrameSource;
use crate::frame::Frame;

/// Frames in a synthetic `stub://` clip.
pub const SYNTHETIC_CLIP_FRAMES: u64 = 150;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path (e.g., "rally.mp4") or "stub://name".
    pub path: String,
    /// Frame rate override. When `None`, the container's rate is used.
    pub fps: Option<f64>,
    /// Width for synthetic clips.
    pub width: u32,
    /// Height for synthetic clips.
    pub height: u32,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            fps: None,
            width: 640,
            height: 480,
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    path: String,
    fps_override: Option<f64>,
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticRally),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

/// Default rate for synthetic clips.
const SYNTHETIC_FPS: f64 = 30.0;

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes): '{}'",
                config.path
            ));
        }
        let backend = if config.path.starts_with("stub://") {
            FileBackend::Synthetic(SyntheticRally::new(
                config.width,
                config.height,
                Some(SYNTHETIC_CLIP_FRAMES),
                seed_for(&config.path),
            ))
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                FileBackend::Ffmpeg(FfmpegFileSource::new(&config.path)?)
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                return Err(anyhow!(
                    "video file ingestion requires the ingest-file-ffmpeg feature"
                ));
            }
        };
        Ok(Self {
            path: config.path,
            fps_override: config.fps,
            backend,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl FrameSource for FileSource {
    fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Synthetic(_) => {
                log::info!("FileSource: opened {} (synthetic)", self.path);
                Ok(())
            }
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.connect(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    fn nominal_fps(&self) -> Option<f64> {
        if self.fps_override.is_some() {
            return self.fps_override;
        }
        match &self.backend {
            FileBackend::Synthetic(_) => Some(SYNTHETIC_FPS),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.fps(),
        }
    }

    fn frame_count(&self) -> Option<u64> {
        match &self.backend {
            FileBackend::Synthetic(_) => Some(SYNTHETIC_CLIP_FRAMES),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.frame_count(),
        }
    }

    fn describe(&self) -> String {
        format!("file {}", self.path)
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

/// Stable per-path seed so a given stub clip always replays identically.
fn seed_for(path: &str) -> u64 {
    path.bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
            (h ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> FileConfig {
        FileConfig {
            path: "stub://rally".to_string(),
            fps: None,
            width: 160,
            height: 120,
        }
    }

    #[test]
    fn rejects_remote_urls() {
        for path in ["", "   ", "http://example.com/clip.mp4", "rtsp://cam/stream"] {
            let config = FileConfig {
                path: path.to_string(),
                ..FileConfig::default()
            };
            assert!(FileSource::new(config).is_err(), "{path:?} should be rejected");
        }
    }

    #[test]
    fn stub_clip_is_finite_and_reports_fps() -> Result<()> {
        let mut source = FileSource::new(stub_config())?;
        source.connect()?;
        assert_eq!(source.nominal_fps(), Some(SYNTHETIC_FPS));
        assert_eq!(source.frame_count(), Some(SYNTHETIC_CLIP_FRAMES));

        let mut count = 0;
        while let Some(frame) = source.next_frame()? {
            assert_eq!(frame.width, 160);
            count += 1;
        }
        assert_eq!(count, SYNTHETIC_CLIP_FRAMES);
        Ok(())
    }

    #[test]
    fn fps_override_wins() -> Result<()> {
        let source = FileSource::new(FileConfig {
            fps: Some(60.0),
            ..stub_config()
        })?;
        assert_eq!(source.nominal_fps(), Some(60.0));
        Ok(())
    }

    #[test]
    fn stub_clips_replay_identically() -> Result<()> {
        let mut a = FileSource::new(stub_config())?;
        let mut b = FileSource::new(stub_config())?;
        for _ in 0..20 {
            let fa = a.next_frame()?.expect("frame");
            let fb = b.next_frame()?.expect("frame");
            assert_eq!(fa.pixels(), fb.pixels());
        }
        Ok(())
    }
}
