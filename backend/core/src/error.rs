use thiserror::Error;

/// Terminal failures of a single capture request.
///
/// The `Display` text is what ends up in the outcome's `error` field and is
/// rendered verbatim by the popup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Error querying tabs: {0}")]
    BusQuery(String),

    #[error("Could not get active tab for screenshot capture (no active tab found or tab ID missing).")]
    NoActiveTab,

    #[error("Error capturing visible tab: {0}")]
    CaptureInvocation(String),

    #[error("captureVisibleTab returned undefined dataUrl")]
    EmptyCaptureResult,

    #[error("Unexpected response from background worker.")]
    MalformedOutcome,
}

impl CaptureError {
    /// True for failures raised before any capture call was made.
    pub fn is_tab_resolution(&self) -> bool {
        matches!(self, CaptureError::BusQuery(_) | CaptureError::NoActiveTab)
    }
}

/// Failures of the bus itself, surfaced only through [`crate::PendingReply`]
/// and [`crate::ReplyChannel`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("Could not establish connection. Receiving end does not exist.")]
    NoReceivers,

    #[error("The message port closed before a response was received.")]
    PortClosed,

    #[error("a response was already sent on this reply channel")]
    AlreadyResponded,

    #[error("malformed reply: {0}")]
    MalformedReply(String),
}

/// An error reported by the host platform (the equivalent of a runtime
/// `lastError`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompareError {
    #[error("comparison is not implemented yet")]
    NotImplemented,

    #[error("no screenshot available to compare")]
    NoImage,

    #[error("invalid frame reference '{0}': expected fileKey/node-id")]
    InvalidFrameReference(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_wire_text() {
        assert_eq!(
            CaptureError::BusQuery("No window".into()).to_string(),
            "Error querying tabs: No window"
        );
        assert!(CaptureError::NoActiveTab
            .to_string()
            .starts_with("Could not get active tab"));
        assert_eq!(
            CaptureError::CaptureInvocation("denied".into()).to_string(),
            "Error capturing visible tab: denied"
        );
    }

    #[test]
    fn test_tab_resolution_classification() {
        assert!(CaptureError::NoActiveTab.is_tab_resolution());
        assert!(CaptureError::BusQuery("x".into()).is_tab_resolution());
        assert!(!CaptureError::EmptyCaptureResult.is_tab_resolution());
    }
}
