//! Simulated Browser Host
//!
//! An in-memory stand-in for the extension host: windows holding tabs, a
//! focused window, and scriptable failures for the tab query and capture
//! calls. Implements [`TabHost`] and [`CaptureHost`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use miru_core::{CaptureHost, CaptureOptions, HostError, Tab, TabHost, TabId, WindowId, WindowTarget};

use crate::screenshot::{encode_data_url, placeholder_image};

#[derive(Debug, Clone)]
struct Window {
    id: WindowId,
    tabs: Vec<Tab>,
}

#[derive(Debug, Default)]
struct BrowserState {
    windows: Vec<Window>,
    focused: Option<WindowId>,
    query_failure: Option<String>,
    capture_failure: Option<String>,
    empty_capture: bool,
    fixed_capture: Option<String>,
    window_targeting: bool,
    capture_delays: VecDeque<Duration>,
    capture_targets: Vec<WindowTarget>,
}

impl BrowserState {
    fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == id)
    }

    fn capture(&self, target: WindowTarget, options: CaptureOptions) -> Result<Option<String>, HostError> {
        if let Some(message) = &self.capture_failure {
            return Err(HostError::new(message.clone()));
        }
        if self.empty_capture {
            return Ok(None);
        }
        if let Some(data_url) = &self.fixed_capture {
            return Ok(Some(data_url.clone()));
        }

        let window_id = match target {
            WindowTarget::Window(id) if self.window_targeting => id,
            _ => self.focused.ok_or_else(|| HostError::new("No current window"))?,
        };
        let window = self
            .window(window_id)
            .ok_or_else(|| HostError::new(format!("No window with id: {}.", window_id)))?;
        let tab = window
            .tabs
            .iter()
            .find(|t| t.active)
            .ok_or_else(|| HostError::new("No active tab in window"))?;

        info!(window_id, format = %options.format, "Captured visible tab");
        let bytes = placeholder_image(options.format, tab);
        Ok(Some(encode_data_url(options.format, &bytes)))
    }
}

pub struct SimulatedBrowser {
    state: Mutex<BrowserState>,
    queries: AtomicUsize,
    captures: AtomicUsize,
}

impl SimulatedBrowser {
    /// A browser with no windows at all.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BrowserState {
                window_targeting: true,
                ..Default::default()
            }),
            queries: AtomicUsize::new(0),
            captures: AtomicUsize::new(0),
        }
    }

    /// A single focused window with one active tab.
    pub fn with_active_tab(window_id: WindowId, tab_id: TabId, url: &str) -> Self {
        let browser = Self::new();
        browser.open_window(window_id);
        browser.open_tab(window_id, Some(tab_id), url);
        browser.focus(window_id);
        browser
    }

    fn state(&self) -> std::sync::MutexGuard<'_, BrowserState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn open_window(&self, window_id: WindowId) {
        let mut state = self.state();
        if state.window(window_id).is_none() {
            state.windows.push(Window {
                id: window_id,
                tabs: Vec::new(),
            });
        }
    }

    /// Open a tab in `window_id` and make it that window's active tab.
    /// `tab_id = None` models a tab the host cannot address.
    pub fn open_tab(&self, window_id: WindowId, tab_id: Option<TabId>, url: &str) {
        let mut state = self.state();
        if let Some(window) = state.windows.iter_mut().find(|w| w.id == window_id) {
            for tab in &mut window.tabs {
                tab.active = false;
            }
            window.tabs.push(Tab {
                id: tab_id,
                window_id: Some(window_id),
                active: true,
                url: Some(url.to_string()),
                title: None,
            });
        }
    }

    pub fn focus(&self, window_id: WindowId) {
        self.state().focused = Some(window_id);
    }

    /// Leave no window focused, so the active-tab query comes back empty.
    pub fn blur_all(&self) {
        self.state().focused = None;
    }

    pub fn fail_tab_query(&self, message: &str) {
        self.state().query_failure = Some(message.to_string());
    }

    pub fn fail_capture(&self, message: &str) {
        self.state().capture_failure = Some(message.to_string());
    }

    /// Make capture calls succeed without producing any data.
    pub fn return_empty_capture(&self) {
        self.state().empty_capture = true;
    }

    /// Answer every capture with exactly `data_url`.
    pub fn serve_fixed_capture(&self, data_url: &str) {
        self.state().fixed_capture = Some(data_url.to_string());
    }

    /// Undo every scripted failure and fixed capture.
    pub fn reset_failures(&self) {
        let mut state = self.state();
        state.query_failure = None;
        state.capture_failure = None;
        state.empty_capture = false;
        state.fixed_capture = None;
    }

    pub fn set_window_targeting(&self, supported: bool) {
        self.state().window_targeting = supported;
    }

    /// Delay the next capture call by `delay`. Delays queue up, one per call.
    pub fn push_capture_delay(&self, delay: Duration) {
        self.state().capture_delays.push_back(delay);
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    /// Window targets of every capture call so far, in call order.
    pub fn capture_targets(&self) -> Vec<WindowTarget> {
        self.state().capture_targets.clone()
    }
}

impl Default for SimulatedBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TabHost for SimulatedBrowser {
    async fn query_active_tab(&self) -> Result<Vec<Tab>, HostError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        if let Some(message) = &state.query_failure {
            return Err(HostError::new(message.clone()));
        }
        let tabs: Vec<Tab> = state
            .focused
            .and_then(|id| state.window(id))
            .map(|w| w.tabs.iter().filter(|t| t.active).cloned().collect())
            .unwrap_or_default();
        debug!(count = tabs.len(), "Active tab query answered");
        Ok(tabs)
    }
}

#[async_trait]
impl CaptureHost for SimulatedBrowser {
    async fn capture_visible_tab(
        &self,
        target: WindowTarget,
        options: CaptureOptions,
    ) -> Result<Option<String>, HostError> {
        self.captures.fetch_add(1, Ordering::SeqCst);

        // The page is snapshotted when the call is made; any delay only
        // holds back the answer.
        let (result, delay) = {
            let mut state = self.state();
            state.capture_targets.push(target);
            let delay = state.capture_delays.pop_front();
            (state.capture(target, options), delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    fn supports_window_targeting(&self) -> bool {
        self.state().window_targeting
    }
}
