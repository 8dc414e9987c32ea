use serde::{Deserialize, Serialize};

/// Stages a single capture request moves through inside the Capturer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStage {
    /// A capture request arrived on the bus
    ReceivedRequest,
    /// Querying the host for the active tab of the focused window
    ResolvingTab,
    /// Tab query failed or found nothing usable
    TabFailed,
    /// A tab with an identifier was found
    TabResolved,
    /// The host capture call is in flight
    Capturing,
    /// Capture call failed or produced no data
    CaptureFailed,
    /// Capture call produced image data
    CaptureSucceeded,
    /// The single outcome for this request was broadcast
    OutcomeEmitted,
}

impl CaptureStage {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: CaptureStage) -> bool {
        use CaptureStage::*;
        matches!(
            (self, next),
            (ReceivedRequest, ResolvingTab)
                | (ResolvingTab, TabFailed)
                | (ResolvingTab, TabResolved)
                | (TabResolved, Capturing)
                | (Capturing, CaptureFailed)
                | (Capturing, CaptureSucceeded)
                | (TabFailed, OutcomeEmitted)
                | (CaptureFailed, OutcomeEmitted)
                | (CaptureSucceeded, OutcomeEmitted)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == CaptureStage::OutcomeEmitted
    }
}

impl std::fmt::Display for CaptureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}
