//! Camera frame source (live sessions).
//!
//! `CameraSource` captures frames from a local camera:
//! - `stub://<name>` devices produce an endless synthetic rally paced to `target_fps`
//! - device nodes ("/dev/video0", or a bare index like "0") use V4L2 (feature: ingest-v4l2)
//!
//! Live sessions pair with `TimestampPolicy::WallClock`; `captured_at` on each frame is the
//! instant the frame left the device.

use anyhow::{anyhow, Result};

use super::synthetic::SyntheticRally;
use super::FrameSource;
use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0"), camera index ("0"), or "stub://name".
    pub device: String,
    /// Requested frame rate.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
        }
    }
}

/// Camera frame source.
pub struct CameraSource {
    config: CameraConfig,
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticRally),
    #[cfg(feature = "ingest-v4l2")]
    Device(v4l2::DeviceCamera),
}

impl CameraSource {
    pub fn new(mut config: CameraConfig) -> Result<Self> {
        if config.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be at least 1"));
        }
        if config.device.trim().parse::<u32>().is_ok() {
            config.device = format!("/dev/video{}", config.device.trim());
        }
        let backend = if config.device.starts_with("stub://") {
            CameraBackend::Synthetic(
                SyntheticRally::new(config.width, config.height, None, 0x5eed)
                    .paced(config.target_fps as f64),
            )
        } else {
            #[cfg(feature = "ingest-v4l2")]
            {
                CameraBackend::Device(v4l2::DeviceCamera::new(config.clone()))
            }
            #[cfg(not(feature = "ingest-v4l2"))]
            {
                return Err(anyhow!(
                    "camera capture from {} requires the ingest-v4l2 feature",
                    config.device
                ));
            }
        };
        Ok(Self { config, backend })
    }

    pub fn device(&self) -> &str {
        &self.config.device
    }
}

impl FrameSource for CameraSource {
    fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(_) => {
                log::info!("CameraSource: connected to {} (synthetic)", self.config.device);
                Ok(())
            }
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.connect(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.next_frame().map(Some),
        }
    }

    fn nominal_fps(&self) -> Option<f64> {
        Some(self.config.target_fps as f64)
    }

    fn describe(&self) -> String {
        format!("camera {}", self.config.device)
    }
}

#[cfg(feature = "ingest-v4l2")]
mod v4l2 {
    use anyhow::{Context, Result};
    use ouroboros::self_referencing;

    use super::CameraConfig;
    use crate::frame::Frame;

    pub(super) struct DeviceCamera {
        config: CameraConfig,
        state: Option<DeviceState>,
        frame_count: u64,
        active_width: u32,
        active_height: u32,
    }

    #[self_referencing]
    struct DeviceState {
        device: v4l::Device,
        #[borrows(mut device)]
        #[covariant]
        stream: v4l::prelude::MmapStream<'this, v4l::Device>,
    }

    impl DeviceCamera {
        pub(super) fn new(config: CameraConfig) -> Self {
            Self {
                active_width: config.width,
                active_height: config.height,
                config,
                state: None,
                frame_count: 0,
            }
        }

        pub(super) fn connect(&mut self) -> Result<()> {
            use v4l::buffer::Type;
            use v4l::video::Capture;

            let device = v4l::Device::with_path(&self.config.device)
                .with_context(|| format!("open v4l2 device {}", self.config.device))?;
            let mut format = device.format().context("read v4l2 format")?;
            format.width = self.config.width;
            format.height = self.config.height;
            format.fourcc = v4l::FourCC::new(b"RGB3");

            let format = match device.set_format(&format) {
                Ok(format) => format,
                Err(err) => {
                    log::warn!(
                        "CameraSource: failed to set format on {}: {}",
                        self.config.device,
                        err
                    );
                    device
                        .format()
                        .context("read v4l2 format after set failure")?
                }
            };

            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "CameraSource: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }

            self.active_width = format.width;
            self.active_height = format.height;

            let state = DeviceStateTryBuilder {
                device,
                stream_builder: |device| {
                    v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                        .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
                },
            }
            .try_build()?;
            self.state = Some(state);

            log::info!(
                "CameraSource: connected to {} ({}x{})",
                self.config.device,
                self.active_width,
                self.active_height
            );
            Ok(())
        }

        pub(super) fn next_frame(&mut self) -> Result<Frame> {
            use v4l::io::traits::CaptureStream;

            let state = self.state.as_mut().context("v4l2 device not connected")?;
            let pixels = state
                .with_mut(|fields| fields.stream.next().map(|(buf, _meta)| buf.to_vec()))
                .context("capture v4l2 frame")?;

            let index = self.frame_count;
            self.frame_count += 1;
            Frame::new(index, self.active_width, self.active_height, pixels)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CameraConfig {
        CameraConfig {
            device: "stub://court".to_string(),
            target_fps: 200,
            width: 80,
            height: 60,
        }
    }

    #[test]
    fn stub_camera_produces_frames() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        source.connect()?;

        for expected in 0..3 {
            let frame = source.next_frame()?.expect("live feed does not end");
            assert_eq!(frame.index, expected);
            assert_eq!((frame.width, frame.height), (80, 60));
        }
        assert_eq!(source.nominal_fps(), Some(200.0));
        Ok(())
    }

    #[test]
    fn zero_fps_is_a_configuration_error() {
        let config = CameraConfig {
            target_fps: 0,
            ..stub_config()
        };
        assert!(CameraSource::new(config).is_err());
    }

    #[cfg(not(feature = "ingest-v4l2"))]
    #[test]
    fn numeric_device_maps_to_video_node() {
        let config = CameraConfig {
            device: "0".to_string(),
            ..stub_config()
        };
        let err = CameraSource::new(config).err().expect("needs v4l2 feature");
        assert!(err.to_string().contains("/dev/video0"));
    }
}
