pub mod color;
pub mod deadline;
pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use color::ColorBlobBackend;
pub use deadline::DeadlineBackend;
pub use stub::ScriptedBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
