//! Protocol Event Logger
//!
//! Structured capture lifecycle events (request received, outcome emitted,
//! acknowledgement dropped) written through `tracing` under the
//! `protocol_events` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use miru_core::{CaptureStage, RequestId};

use crate::redact::redact_image_payloads;

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ProtocolEvent {
    RequestReceived,
    StageEntered {
        stage: CaptureStage,
    },
    OutcomeEmitted {
        success: bool,
        detail: String,
    },
    AcknowledgementDropped {
        reason: String,
    },
}

#[derive(Debug, Serialize)]
pub struct ProtocolEventEntry {
    pub component: String,
    pub request_id: Option<RequestId>,
    pub timestamp: DateTime<Utc>,
    pub event: ProtocolEvent,
}

pub struct ProtocolEventLogger;

impl ProtocolEventLogger {
    /// Record a protocol event. Image payloads in string fields are shortened first.
    pub fn log_event(component: &str, request_id: Option<RequestId>, mut event: ProtocolEvent) -> ProtocolEventEntry {
        match &mut event {
            ProtocolEvent::OutcomeEmitted { detail, .. } => {
                *detail = redact_image_payloads(detail);
            }
            ProtocolEvent::AcknowledgementDropped { reason } => {
                *reason = redact_image_payloads(reason);
            }
            ProtocolEvent::RequestReceived | ProtocolEvent::StageEntered { .. } => {}
        }

        let entry = ProtocolEventEntry {
            component: component.into(),
            request_id,
            timestamp: Utc::now(),
            event,
        };

        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "protocol_events", event = %json, "Protocol event");
        entry
    }
}
