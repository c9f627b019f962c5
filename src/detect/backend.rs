use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Detector backend trait.
///
/// Backends are frame-local: `detect` sees one frame and returns its candidates. The
/// pipeline holds a backend for the duration of a session and never inspects its state.
///
/// An `Err` from `detect` is a transient failure for that frame only; the pipeline scores
/// the frame as having no detection and moves on.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, called once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<B: DetectorBackend + ?Sized> DetectorBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        (**self).detect(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
