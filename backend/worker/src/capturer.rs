use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use miru_core::{
    Acknowledgement, BrowserHost, BusMessage, CaptureError, CaptureOptions, CaptureOutcome,
    CaptureStage, Component, Envelope, Handling, MiruBus, ReplyChannel, RequestId, Subscription,
    Tab, WindowTarget,
};
use miru_logging::{ProtocolEvent, ProtocolEventLogger, redact_image_payloads};

use crate::run::CaptureRun;

/// Default number of data URL characters echoed in the acknowledgement.
const DEFAULT_PREVIEW_LENGTH: usize = 50;

#[derive(Debug, Clone)]
pub struct CapturerSettings {
    pub options: CaptureOptions,
    /// Capture the resolved tab's window rather than the host's current one.
    pub scope_to_tab_window: bool,
    pub preview_length: usize,
}

impl Default for CapturerSettings {
    fn default() -> Self {
        Self {
            options: CaptureOptions::default(),
            scope_to_tab_window: false,
            preview_length: DEFAULT_PREVIEW_LENGTH,
        }
    }
}

/// The background half of the protocol. Receives capture requests from the
/// bus, resolves the active tab, captures it, and broadcasts exactly one
/// outcome per request.
#[derive(Clone)]
pub struct Capturer {
    host: Arc<dyn BrowserHost>,
    bus: MiruBus,
    settings: CapturerSettings,
    /// Our own listener id once spawned; outcomes are not delivered back to it.
    listener: Option<u64>,
}

impl Capturer {
    pub fn new(host: Arc<dyn BrowserHost>, bus: MiruBus, settings: CapturerSettings) -> Self {
        Self {
            host,
            bus,
            settings,
            listener: None,
        }
    }

    /// Subscribe to the bus and run the event loop on a new task.
    ///
    /// The subscription is registered before this returns, so requests sent
    /// afterwards are never missed.
    pub fn spawn(mut self) -> JoinHandle<Result<()>> {
        let subscription = self.bus.subscribe();
        self.listener = Some(subscription.id());
        tokio::spawn(async move { self.start(subscription).await })
    }

    /// Listener entry point, called for every message on the bus.
    ///
    /// Returns immediately. Capture requests are processed on their own task.
    pub fn on_bus_message(&self, envelope: Envelope) -> Handling {
        let Envelope { message, reply } = envelope;
        match message {
            BusMessage::CaptureScreenshot(request) => {
                info!(request_id = ?request.request_id, "Capturer received CAPTURE_SCREENSHOT request");
                let this = self.clone();
                tokio::spawn(async move {
                    this.handle_request(request.request_id, reply).await;
                });
                Handling::WillReplyAsync
            }
            other => {
                debug!(tag = other.tag(), "Capturer ignoring message");
                Handling::NotHandled
            }
        }
    }

    /// Run one request to completion and return the outcome that was
    /// broadcast for it.
    pub async fn handle_request(
        &self,
        request_id: Option<RequestId>,
        reply: ReplyChannel,
    ) -> CaptureOutcome {
        let mut run = CaptureRun::new(request_id);

        let outcome = match self.process(&mut run).await {
            Ok(data_url) => {
                info!(request_id = ?request_id, "Screenshot taken, broadcasting data URL");
                CaptureOutcome::success(data_url, request_id)
            }
            Err(e) => {
                error!(request_id = ?request_id, error = %e, "Screenshot capture failed");
                CaptureOutcome::failure(&e, request_id)
            }
        };

        self.emit(&mut run, &outcome, reply);
        outcome
    }

    async fn process(&self, run: &mut CaptureRun) -> Result<String, CaptureError> {
        run.advance(CaptureStage::ResolvingTab);
        let tab = match self.resolve_target_tab().await {
            Ok(tab) => {
                run.advance(CaptureStage::TabResolved);
                tab
            }
            Err(e) => {
                run.advance(CaptureStage::TabFailed);
                return Err(e);
            }
        };

        run.advance(CaptureStage::Capturing);
        match self.capture(&tab).await {
            Ok(data_url) => {
                run.advance(CaptureStage::CaptureSucceeded);
                Ok(data_url)
            }
            Err(e) => {
                run.advance(CaptureStage::CaptureFailed);
                Err(e)
            }
        }
    }

    /// The active tab of the focused window. Only the first reported tab is
    /// considered, and it must carry an identifier.
    pub async fn resolve_target_tab(&self) -> Result<Tab, CaptureError> {
        let tabs = self
            .host
            .query_active_tab()
            .await
            .map_err(|e| CaptureError::BusQuery(e.message))?;

        let tab = tabs
            .into_iter()
            .next()
            .filter(|tab| tab.id.is_some())
            .ok_or(CaptureError::NoActiveTab)?;

        debug!(tab_id = ?tab.id, window_id = ?tab.window_id, "Resolved target tab");
        Ok(tab)
    }

    async fn capture(&self, tab: &Tab) -> Result<String, CaptureError> {
        let target = self.window_target(tab);
        info!(tab_id = ?tab.id, target = %target, format = %self.settings.options.format, "Capturing visible tab");

        match self
            .host
            .capture_visible_tab(target, self.settings.options)
            .await
        {
            Err(e) => Err(CaptureError::CaptureInvocation(e.message)),
            Ok(Some(data_url)) if !data_url.is_empty() => Ok(data_url),
            Ok(_) => Err(CaptureError::EmptyCaptureResult),
        }
    }

    fn window_target(&self, tab: &Tab) -> WindowTarget {
        if !self.settings.scope_to_tab_window {
            return WindowTarget::CurrentWindow;
        }
        match tab.window_id {
            Some(window_id) if self.host.supports_window_targeting() => {
                WindowTarget::Window(window_id)
            }
            Some(_) => {
                warn!("Host cannot target a specific window; capturing the current window");
                WindowTarget::CurrentWindow
            }
            None => WindowTarget::CurrentWindow,
        }
    }

    /// Broadcast the outcome, then try the direct acknowledgement.
    fn emit(&self, run: &mut CaptureRun, outcome: &CaptureOutcome, reply: ReplyChannel) {
        let detail = outcome
            .error
            .clone()
            .or_else(|| outcome.data_url.clone())
            .unwrap_or_default();

        // Nobody waits on the broadcast's own reply future.
        let message = BusMessage::ScreenshotTaken(outcome.clone());
        let _ = match self.listener {
            Some(id) => self.bus.send_message_from(id, message),
            None => self.bus.send_message(message),
        };
        run.advance(CaptureStage::OutcomeEmitted);
        ProtocolEventLogger::log_event(
            "capturer",
            run.request_id(),
            ProtocolEvent::OutcomeEmitted {
                success: outcome.is_success(),
                detail,
            },
        );

        let ack = Acknowledgement::for_outcome(outcome, self.settings.preview_length);
        if let Err(e) = reply.respond(&ack) {
            debug!(
                request_id = ?run.request_id(),
                error = %e,
                ack = %redact_image_payloads(&format!("{:?}", ack)),
                "Acknowledgement not delivered"
            );
            ProtocolEventLogger::log_event(
                "capturer",
                run.request_id(),
                ProtocolEvent::AcknowledgementDropped {
                    reason: e.to_string(),
                },
            );
        }
    }
}

#[async_trait]
impl Component for Capturer {
    fn name(&self) -> &str {
        "capturer"
    }

    async fn start(&self, mut subscription: Subscription) -> Result<()> {
        info!(subscriber = subscription.id(), "Capturer started");

        while let Some(envelope) = subscription.recv().await {
            self.on_bus_message(envelope);
        }

        info!("Capturer bus closed, shutting down");
        Ok(())
    }
}
