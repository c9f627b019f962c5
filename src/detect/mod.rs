mod backend;
mod backends;
mod registry;
mod result;
mod selector;

pub use backend::DetectorBackend;
pub use backends::color::BALL_RGB;
pub use backends::{ColorBlobBackend, DeadlineBackend, ScriptedBackend};
#[cfg(feature = "backend-tract")]
pub use backends::{tract::SPORTS_BALL_CLASS, TractBackend};
pub use registry::{BackendRegistry, SharedBackend};
pub use result::{Detection, FrameDetections};
pub use selector::{select_best, DetectionSelector, DEFAULT_MIN_CONFIDENCE};
