use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// Monotonic identifier a Requester attaches to each capture request.
pub type RequestId = u64;

/// Status string carried by a successful acknowledgement.
pub const CAPTURE_INITIATED_STATUS: &str = "Screenshot capture initiated";

/// Messages carried on the MiruBus.
///
/// Encoded as `{"type": "<TAG>", ...}`. Tags the protocol does not know
/// decode to [`BusMessage::Unknown`] so every listener can ignore them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BusMessage {
    /// Requester → Capturer: take one screenshot of the active tab
    #[serde(rename = "CAPTURE_SCREENSHOT")]
    CaptureScreenshot(CaptureRequest),
    /// Capturer → everyone: terminal outcome of one capture request
    #[serde(rename = "SCREENSHOT_TAKEN")]
    ScreenshotTaken(CaptureOutcome),
    /// Any message whose tag this protocol does not handle
    #[serde(other)]
    Unknown,
}

/// A request to capture the visible area of the active tab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
}

/// Terminal outcome of a capture request.
///
/// Peers on the bus are not trusted to be well formed, so both payload
/// fields stay optional on the wire. Outcomes built inside this workspace
/// go through [`CaptureOutcome::success`] or [`CaptureOutcome::failure`],
/// which always set exactly one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
}

/// How a received outcome should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomePayload<'a> {
    Failure(&'a str),
    Image(&'a str),
    Malformed,
}

impl CaptureOutcome {
    pub fn success(data_url: impl Into<String>, request_id: Option<RequestId>) -> Self {
        Self {
            data_url: Some(data_url.into()),
            error: None,
            request_id,
        }
    }

    pub fn failure(error: &CaptureError, request_id: Option<RequestId>) -> Self {
        Self {
            data_url: None,
            error: Some(error.to_string()),
            request_id,
        }
    }

    /// Classify the payload. `error` wins over `dataUrl` when a foreign
    /// peer sets both. Empty strings count as absent.
    pub fn payload(&self) -> OutcomePayload<'_> {
        let error = self.error.as_deref().filter(|e| !e.is_empty());
        let data_url = self.data_url.as_deref().filter(|d| !d.is_empty());
        match (error, data_url) {
            (Some(error), _) => OutcomePayload::Failure(error),
            (None, Some(data_url)) => OutcomePayload::Image(data_url),
            (None, None) => OutcomePayload::Malformed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.payload(), OutcomePayload::Image(_))
    }
}

impl BusMessage {
    pub fn capture_request(request_id: Option<RequestId>) -> Self {
        BusMessage::CaptureScreenshot(CaptureRequest { request_id })
    }

    /// Wire tag of this message.
    pub fn tag(&self) -> &'static str {
        match self {
            BusMessage::CaptureScreenshot(_) => "CAPTURE_SCREENSHOT",
            BusMessage::ScreenshotTaken(_) => "SCREENSHOT_TAKEN",
            BusMessage::Unknown => "UNKNOWN",
        }
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            BusMessage::CaptureScreenshot(r) => r.request_id,
            BusMessage::ScreenshotTaken(o) => o.request_id,
            BusMessage::Unknown => None,
        }
    }
}

/// Best-effort direct reply the Capturer sends on the request's reply
/// channel. Diagnostic only; the broadcast outcome is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Acknowledgement {
    Initiated {
        status: String,
        #[serde(rename = "dataUrlPreview")]
        data_url_preview: String,
    },
    Failed {
        error: String,
    },
}

impl Acknowledgement {
    /// Acknowledge a capture, echoing the first `preview_len` characters of
    /// the data URL.
    pub fn initiated(data_url: &str, preview_len: usize) -> Self {
        let mut preview: String = data_url.chars().take(preview_len).collect();
        preview.push_str("...");
        Acknowledgement::Initiated {
            status: CAPTURE_INITIATED_STATUS.to_string(),
            data_url_preview: preview,
        }
    }

    pub fn failed(error: &CaptureError) -> Self {
        Acknowledgement::Failed {
            error: error.to_string(),
        }
    }

    pub fn for_outcome(outcome: &CaptureOutcome, preview_len: usize) -> Self {
        match outcome.payload() {
            OutcomePayload::Image(data_url) => Self::initiated(data_url, preview_len),
            OutcomePayload::Failure(error) => Acknowledgement::Failed {
                error: error.to_string(),
            },
            OutcomePayload::Malformed => Self::failed(&CaptureError::MalformedOutcome),
        }
    }
}
