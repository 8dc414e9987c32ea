use tracing::{debug, warn};

use miru_core::{CaptureStage, RequestId};
use miru_logging::{ProtocolEvent, ProtocolEventLogger};

/// Tracks one capture request through [`CaptureStage`]s.
#[derive(Debug)]
pub struct CaptureRun {
    request_id: Option<RequestId>,
    stage: CaptureStage,
    history: Vec<CaptureStage>,
}

impl CaptureRun {
    pub fn new(request_id: Option<RequestId>) -> Self {
        ProtocolEventLogger::log_event("capturer", request_id, ProtocolEvent::RequestReceived);
        Self {
            request_id,
            stage: CaptureStage::ReceivedRequest,
            history: vec![CaptureStage::ReceivedRequest],
        }
    }

    pub fn request_id(&self) -> Option<RequestId> {
        self.request_id
    }

    pub fn stage(&self) -> CaptureStage {
        self.stage
    }

    /// Every stage entered so far, starting with `ReceivedRequest`.
    pub fn history(&self) -> &[CaptureStage] {
        &self.history
    }

    /// Move to `next`. Illegal transitions are logged and still applied so
    /// the request always reaches an outcome.
    pub fn advance(&mut self, next: CaptureStage) {
        if !self.stage.can_transition_to(next) {
            warn!(
                request_id = ?self.request_id,
                from = %self.stage,
                to = %next,
                "Unexpected capture stage transition"
            );
        }
        debug!(request_id = ?self.request_id, from = %self.stage, to = %next, "Capture stage");
        self.stage = next;
        self.history.push(next);
        ProtocolEventLogger::log_event(
            "capturer",
            self.request_id,
            ProtocolEvent::StageEntered { stage: next },
        );
    }
}
