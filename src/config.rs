use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::detect::{
    BackendRegistry, ColorBlobBackend, DeadlineBackend, DetectorBackend, DEFAULT_MIN_CONFIDENCE,
};
use crate::ingest::{CameraConfig, CameraSource, FileConfig, FileSource, FrameSource};
use crate::output::FrameFormat;
use crate::pipeline::PipelineConfig;
use crate::track::{TimestampPolicy, LIVE_TRAJECTORY_CAPACITY, VIDEO_TRAJECTORY_CAPACITY};

const DEFAULT_VIDEO_URI: &str = "stub://rally";
const DEFAULT_CAMERA_URI: &str = "stub://camera";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_CAMERA_FPS: f64 = 30.0;
const DEFAULT_BACKEND: &str = "color";
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_OUTPUT_DIR: &str = "output";

pub const CONFIG_ENV: &str = "BALL_TRACKER_CONFIG";

#[derive(Debug, Deserialize, Default)]
struct TrackerConfigFile {
    source: Option<SourceConfigFile>,
    tracking: Option<TrackingConfigFile>,
    detector: Option<DetectorConfigFile>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    mode: Option<SourceMode>,
    uri: Option<String>,
    fps: Option<f64>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct TrackingConfigFile {
    trajectory_capacity: Option<usize>,
    min_confidence: Option<f32>,
    frame_skip: Option<u64>,
    max_frames: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    dir: Option<PathBuf>,
    save_frames: Option<bool>,
    frame_format: Option<FrameFormat>,
    write_report: Option<bool>,
}

/// Stored video or live camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    Video,
    Camera,
}

impl FromStr for SourceMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" | "file" => Ok(SourceMode::Video),
            "camera" | "live" => Ok(SourceMode::Camera),
            other => Err(anyhow!("unknown source mode '{}' (video|camera)", other)),
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Video => f.write_str("video"),
            SourceMode::Camera => f.write_str("camera"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub source: SourceSettings,
    pub tracking: TrackingSettings,
    pub detector: DetectorSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub mode: SourceMode,
    pub uri: String,
    /// Video: overrides the container rate. Camera: requested capture rate.
    pub fps: Option<f64>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct TrackingSettings {
    pub trajectory_capacity: usize,
    pub min_confidence: f32,
    pub frame_skip: u64,
    pub max_frames: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub input_size: u32,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub save_frames: bool,
    pub frame_format: FrameFormat,
    pub write_report: bool,
}

impl TrackerConfig {
    /// Load from `BALL_TRACKER_CONFIG` (if set), apply `BALL_TRACKER_*` overrides, validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Like `load`, with an explicit config file instead of `BALL_TRACKER_CONFIG`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: TrackerConfigFile) -> Self {
        let source = file.source.unwrap_or_default();
        let tracking = file.tracking.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let output = file.output.unwrap_or_default();

        let mode = source.mode.unwrap_or(SourceMode::Video);
        let default_uri = match mode {
            SourceMode::Video => DEFAULT_VIDEO_URI,
            SourceMode::Camera => DEFAULT_CAMERA_URI,
        };
        let default_capacity = match mode {
            SourceMode::Video => VIDEO_TRAJECTORY_CAPACITY,
            SourceMode::Camera => LIVE_TRAJECTORY_CAPACITY,
        };

        Self {
            source: SourceSettings {
                mode,
                uri: source.uri.unwrap_or_else(|| default_uri.to_string()),
                fps: source.fps,
                width: source.width.unwrap_or(DEFAULT_WIDTH),
                height: source.height.unwrap_or(DEFAULT_HEIGHT),
            },
            tracking: TrackingSettings {
                trajectory_capacity: tracking.trajectory_capacity.unwrap_or(default_capacity),
                min_confidence: tracking.min_confidence.unwrap_or(DEFAULT_MIN_CONFIDENCE),
                frame_skip: tracking.frame_skip.unwrap_or(1),
                max_frames: tracking.max_frames,
            },
            detector: DetectorSettings {
                backend: detector
                    .backend
                    .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
                model_path: detector.model_path,
                input_size: detector.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
                timeout: detector.timeout_ms.map(Duration::from_millis),
            },
            output: OutputSettings {
                dir: output
                    .dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
                save_frames: output.save_frames.unwrap_or(false),
                frame_format: output.frame_format.unwrap_or_default(),
                write_report: output.write_report.unwrap_or(true),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(mode) = env_nonempty("BALL_TRACKER_MODE") {
            let mode: SourceMode = mode.parse()?;
            if mode != self.source.mode {
                self.switch_mode(mode);
            }
        }
        if let Some(uri) = env_nonempty("BALL_TRACKER_SOURCE") {
            self.source.uri = uri;
        }
        if let Some(backend) = env_nonempty("BALL_TRACKER_BACKEND") {
            self.detector.backend = backend;
        }
        if let Some(model) = env_nonempty("BALL_TRACKER_MODEL") {
            self.detector.model_path = Some(PathBuf::from(model));
        }
        if let Some(value) = env_nonempty("BALL_TRACKER_MIN_CONFIDENCE") {
            self.tracking.min_confidence = value
                .parse()
                .map_err(|_| anyhow!("BALL_TRACKER_MIN_CONFIDENCE must be a number"))?;
        }
        if let Some(value) = env_nonempty("BALL_TRACKER_FRAME_SKIP") {
            self.tracking.frame_skip = value
                .parse()
                .map_err(|_| anyhow!("BALL_TRACKER_FRAME_SKIP must be a positive integer"))?;
        }
        if let Some(dir) = env_nonempty("BALL_TRACKER_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Change mode, moving mode-dependent defaults along when they were not customized.
    pub fn switch_mode(&mut self, mode: SourceMode) {
        let (old_uri, old_capacity, new_uri, new_capacity) = match mode {
            SourceMode::Video => (
                DEFAULT_CAMERA_URI,
                LIVE_TRAJECTORY_CAPACITY,
                DEFAULT_VIDEO_URI,
                VIDEO_TRAJECTORY_CAPACITY,
            ),
            SourceMode::Camera => (
                DEFAULT_VIDEO_URI,
                VIDEO_TRAJECTORY_CAPACITY,
                DEFAULT_CAMERA_URI,
                LIVE_TRAJECTORY_CAPACITY,
            ),
        };
        if self.source.uri == old_uri {
            self.source.uri = new_uri.to_string();
        }
        if self.tracking.trajectory_capacity == old_capacity {
            self.tracking.trajectory_capacity = new_capacity;
        }
        self.source.mode = mode;
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.uri.trim().is_empty() {
            return Err(anyhow!("source uri must not be empty"));
        }
        if let Some(fps) = self.source.fps {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(anyhow!("source fps must be positive, got {}", fps));
            }
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source width and height must be non-zero"));
        }
        if self.tracking.trajectory_capacity == 0 {
            return Err(anyhow!("trajectory_capacity must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.tracking.min_confidence) {
            return Err(anyhow!(
                "min_confidence must be within [0, 1], got {}",
                self.tracking.min_confidence
            ));
        }
        if self.tracking.frame_skip == 0 {
            return Err(anyhow!("frame_skip must be at least 1"));
        }
        if self.detector.backend == "tract" && self.detector.model_path.is_none() {
            return Err(anyhow!("detector backend 'tract' requires model_path"));
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("detector input_size must be non-zero"));
        }
        if self.detector.timeout.is_some_and(|t| t.is_zero()) {
            return Err(anyhow!("detector timeout_ms must be greater than zero"));
        }
        Ok(())
    }

    /// Open the configured frame source (not yet connected).
    pub fn open_source(&self) -> Result<Box<dyn FrameSource>> {
        match self.source.mode {
            SourceMode::Video => {
                let source = FileSource::new(FileConfig {
                    path: self.source.uri.clone(),
                    fps: self.source.fps,
                    width: self.source.width,
                    height: self.source.height,
                })?;
                Ok(Box::new(source))
            }
            SourceMode::Camera => {
                let fps = self.source.fps.unwrap_or(DEFAULT_CAMERA_FPS);
                let source = CameraSource::new(CameraConfig {
                    device: self.source.uri.clone(),
                    target_fps: fps.round().max(1.0) as u32,
                    width: self.source.width,
                    height: self.source.height,
                })?;
                Ok(Box::new(source))
            }
        }
    }

    /// Registry of every backend this build can construct from the config.
    pub fn backend_registry(&self) -> Result<BackendRegistry> {
        let mut registry = BackendRegistry::new();
        registry.register(ColorBlobBackend::default());

        #[cfg(feature = "backend-tract")]
        if let Some(model_path) = &self.detector.model_path {
            let backend = crate::detect::TractBackend::new(model_path, self.detector.input_size)?;
            registry.register(backend);
        }
        Ok(registry)
    }

    /// Resolve the configured backend, wrapped in a deadline when `timeout_ms` is set.
    pub fn build_detector(&self) -> Result<Box<dyn DetectorBackend>> {
        let registry = self.backend_registry()?;
        let backend = registry
            .resolve(Some(&self.detector.backend))
            .context("failed to select detector backend")?;
        match self.detector.timeout {
            Some(deadline) => Ok(Box::new(DeadlineBackend::spawn(backend, deadline)?)),
            None => Ok(Box::new(backend)),
        }
    }

    /// Pipeline settings; `nominal_fps` is the opened source's rate, used for video timing.
    pub fn pipeline_config(&self, nominal_fps: Option<f64>) -> PipelineConfig {
        let timestamps = match self.source.mode {
            SourceMode::Video => TimestampPolicy::FixedFps(
                self.source
                    .fps
                    .or(nominal_fps)
                    .unwrap_or(DEFAULT_CAMERA_FPS),
            ),
            SourceMode::Camera => TimestampPolicy::WallClock,
        };
        PipelineConfig {
            trajectory_capacity: self.tracking.trajectory_capacity,
            min_confidence: self.tracking.min_confidence,
            frame_skip: self.tracking.frame_skip,
            timestamps,
            max_frames: self.tracking.max_frames,
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<TrackerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> TrackerConfig {
        TrackerConfig::from_file(TrackerConfigFile::default())
    }

    #[test]
    fn defaults_are_valid_video_session() {
        let cfg = defaults();
        cfg.validate().unwrap();
        assert_eq!(cfg.source.mode, SourceMode::Video);
        assert_eq!(cfg.source.uri, DEFAULT_VIDEO_URI);
        assert_eq!(cfg.tracking.trajectory_capacity, VIDEO_TRAJECTORY_CAPACITY);
        assert_eq!(cfg.tracking.min_confidence, 0.3);
        assert_eq!(cfg.detector.backend, "color");
        assert!(cfg.output.write_report);
    }

    #[test]
    fn switching_mode_moves_untouched_defaults() {
        let mut cfg = defaults();
        cfg.switch_mode(SourceMode::Camera);
        assert_eq!(cfg.source.uri, DEFAULT_CAMERA_URI);
        assert_eq!(cfg.tracking.trajectory_capacity, LIVE_TRAJECTORY_CAPACITY);

        let mut custom = defaults();
        custom.source.uri = "clip.mp4".to_string();
        custom.tracking.trajectory_capacity = 12;
        custom.switch_mode(SourceMode::Camera);
        assert_eq!(custom.source.uri, "clip.mp4");
        assert_eq!(custom.tracking.trajectory_capacity, 12);
    }

    #[test]
    fn camera_uses_wall_clock() {
        let mut cfg = defaults();
        cfg.switch_mode(SourceMode::Camera);
        assert_eq!(
            cfg.pipeline_config(Some(25.0)).timestamps,
            TimestampPolicy::WallClock
        );
    }

    #[test]
    fn video_fps_prefers_config_over_container() {
        let mut cfg = defaults();
        assert_eq!(
            cfg.pipeline_config(Some(25.0)).timestamps,
            TimestampPolicy::FixedFps(25.0)
        );
        cfg.source.fps = Some(60.0);
        assert_eq!(
            cfg.pipeline_config(Some(25.0)).timestamps,
            TimestampPolicy::FixedFps(60.0)
        );
    }

    #[test]
    fn tract_without_model_is_rejected() {
        let mut cfg = defaults();
        cfg.detector.backend = "tract".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_backend_fails_to_build() {
        let mut cfg = defaults();
        cfg.detector.backend = "yolo9000".to_string();
        let err = cfg.build_detector().err().expect("unknown backend");
        assert!(format!("{:#}", err).contains("yolo9000"));
    }

    #[test]
    fn builds_default_source_and_detector() -> Result<()> {
        let cfg = defaults();
        let source = cfg.open_source()?;
        assert_eq!(source.nominal_fps(), Some(30.0));
        let detector = cfg.build_detector()?;
        assert_eq!(detector.name(), "color");
        Ok(())
    }
}
