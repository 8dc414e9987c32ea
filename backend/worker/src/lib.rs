pub mod capturer;
pub mod run;

pub use capturer::{Capturer, CapturerSettings};
pub use run::CaptureRun;
