use std::sync::Arc;

use tracing::{debug, info, warn};

use miru_core::{
    BusMessage, CaptureError, CompareError, ComparisonEngine, ComparisonReport, FrameReference,
    MiruBus, OutcomePayload, PendingReply, RequestId, StaleOutcomePolicy, Subscription,
};

use crate::compare::UnimplementedComparison;
use crate::state::{UiState, View};

#[derive(Debug, Clone, Default)]
pub struct RequesterSettings {
    pub stale_outcomes: StaleOutcomePolicy,
    /// Initial value of the frame identifier field.
    pub default_frame: String,
}

/// The popup half of the protocol.
///
/// Sends capture requests, listens passively for outcomes, and keeps the
/// [`UiState`] the popup renders. The bus listener lives exactly as long as
/// the Requester is mounted.
pub struct Requester {
    bus: MiruBus,
    subscription: Option<Subscription>,
    state: UiState,
    next_request_id: RequestId,
    latest_request: Option<RequestId>,
    settings: RequesterSettings,
    comparison: Arc<dyn ComparisonEngine>,
}

impl Requester {
    /// Register the bus listener and create empty UI state.
    pub fn mount(bus: MiruBus, settings: RequesterSettings) -> Self {
        let subscription = bus.subscribe();
        info!(subscriber = subscription.id(), "Popup mounted");
        Self {
            bus,
            subscription: Some(subscription),
            state: UiState::with_frame_identifier(settings.default_frame.clone()),
            next_request_id: 1,
            latest_request: None,
            settings,
            comparison: Arc::new(UnimplementedComparison),
        }
    }

    pub fn with_comparison_engine(mut self, engine: Arc<dyn ComparisonEngine>) -> Self {
        self.comparison = engine;
        self
    }

    /// Remove the bus listener and hand back the final state.
    pub fn unmount(mut self) -> UiState {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        info!("Popup unmounted");
        std::mem::take(&mut self.state)
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn view(&self) -> View<'_> {
        self.state.view()
    }

    pub fn latest_request(&self) -> Option<RequestId> {
        self.latest_request
    }

    /// Clear the shown outcome and broadcast a capture request.
    ///
    /// Never waits for the reply; the outcome arrives through
    /// [`Requester::on_bus_message`].
    pub fn submit_capture_request(&mut self) -> RequestId {
        let (request_id, _pending) = self.submit_with_reply();
        request_id
    }

    /// Like [`Requester::submit_capture_request`], but hands back the
    /// direct reply future for callers that want the acknowledgement.
    pub fn submit_with_reply(&mut self) -> (RequestId, PendingReply) {
        self.state.clear_outcome();

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.latest_request = Some(request_id);

        // Sent from our own listener so the request is not echoed back to us.
        let message = BusMessage::capture_request(Some(request_id));
        let pending = match &self.subscription {
            Some(subscription) => subscription.send_message(message),
            None => self.bus.send_message(message),
        };
        if let Some(e) = pending.error() {
            warn!(request_id, error = %e, "Capture request was not delivered");
        } else {
            debug!(request_id, "Capture request sent");
        }
        (request_id, pending)
    }

    /// Listener for every bus message. Returns whether the UI state changed.
    pub fn on_bus_message(&mut self, message: &BusMessage) -> bool {
        let BusMessage::ScreenshotTaken(outcome) = message else {
            return false;
        };

        if self.is_stale(outcome.request_id) {
            debug!(
                request_id = ?outcome.request_id,
                latest = ?self.latest_request,
                "Discarding outcome for a superseded request"
            );
            return false;
        }

        match outcome.payload() {
            OutcomePayload::Failure(error) => {
                warn!(error = %error, "Screenshot capture failed");
                self.state.show_error(error);
            }
            OutcomePayload::Image(data_url) => {
                debug!(len = data_url.len(), "Screenshot received");
                self.state.show_image(data_url);
            }
            OutcomePayload::Malformed => {
                warn!("Outcome carried neither dataUrl nor error");
                self.state.show_error(&CaptureError::MalformedOutcome.to_string());
            }
        }
        true
    }

    fn is_stale(&self, request_id: Option<RequestId>) -> bool {
        if self.settings.stale_outcomes != StaleOutcomePolicy::Discard {
            return false;
        }
        match (request_id, self.latest_request) {
            (Some(id), Some(latest)) => id != latest,
            _ => false,
        }
    }

    /// Wait for the next bus message and apply it. `None` once unmounted or
    /// the bus has closed.
    pub async fn next_message(&mut self) -> Option<bool> {
        let envelope = self.subscription.as_mut()?.recv().await?;
        Some(self.on_bus_message(&envelope.message))
    }

    /// Wait until a message changes the UI state.
    pub async fn wait_for_outcome(&mut self) -> Option<View<'_>> {
        loop {
            if self.next_message().await? {
                return Some(self.state.view());
            }
        }
    }

    /// Apply every message already buffered, without waiting.
    /// Returns how many of them changed the UI state.
    pub fn drain_pending(&mut self) -> usize {
        let mut changed = 0;
        while let Some(envelope) = self.subscription.as_mut().and_then(|s| s.try_recv()) {
            if self.on_bus_message(&envelope.message) {
                changed += 1;
            }
        }
        changed
    }

    /// Input handler for the frame identifier field.
    pub fn set_frame_identifier(&mut self, value: impl Into<String>) {
        self.state.frame_identifier = value.into();
    }

    /// Compare the shown screenshot against the entered design frame.
    pub async fn compare(&self) -> Result<ComparisonReport, CompareError> {
        info!(
            frame = %self.state.frame_identifier,
            engine = self.comparison.name(),
            "Compare button clicked"
        );
        let image = self.state.pending_image().ok_or(CompareError::NoImage)?;
        let frame: FrameReference = self.state.frame_identifier.parse()?;
        self.comparison.compare(image, &frame).await
    }
}
