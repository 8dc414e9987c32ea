//! Telemetry and structured logging components for Miru.
//!
//! Handles image payload redaction, JSON output generation, file rotation, and protocol event logging.

pub mod logger;
pub mod protocol_events;
pub mod redact;

pub use logger::init_logger;
pub use protocol_events::{ProtocolEvent, ProtocolEventEntry, ProtocolEventLogger};
pub use redact::redact_image_payloads;
