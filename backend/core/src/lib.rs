pub mod channel;
pub mod error;
pub mod event;
pub mod message;
pub mod traits;
pub mod types;

pub use channel::{Envelope, Handling, MiruBus, PendingReply, ReplyChannel, Subscription};
pub use error::{BusError, CaptureError, CompareError, HostError};
pub use event::CaptureStage;
pub use message::{
    Acknowledgement, BusMessage, CaptureOutcome, CaptureRequest, OutcomePayload, RequestId,
};
pub use traits::{BrowserHost, CaptureHost, ComparisonEngine, Component, TabHost};
pub use types::{
    CaptureOptions, ComparisonReport, FrameReference, ImageFormat, StaleOutcomePolicy, Tab, TabId, WindowId,
    WindowTarget,
};
