use anyhow::Result;
use async_trait::async_trait;

use crate::channel::Subscription;
use crate::error::{CompareError, HostError};
use crate::types::{CaptureOptions, ComparisonReport, FrameReference, Tab, WindowTarget};

/// Trait for long-lived protocol actors driven by a bus subscription.
///
/// Each component runs its loop in its own Tokio task.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Human-readable name of this component.
    fn name(&self) -> &str;

    /// Run the component's event loop until the bus closes.
    async fn start(&self, subscription: Subscription) -> Result<()>;
}

/// Tab enumeration provided by the host platform.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Tabs that are active in the currently focused window. Usually zero or
    /// one entry.
    async fn query_active_tab(&self) -> Result<Vec<Tab>, HostError>;
}

/// Visible-area capture provided by the host platform.
#[async_trait]
pub trait CaptureHost: Send + Sync {
    /// Capture the visible area of the active tab in `target`.
    ///
    /// `Ok(None)` means the host reported success without producing data.
    async fn capture_visible_tab(
        &self,
        target: WindowTarget,
        options: CaptureOptions,
    ) -> Result<Option<String>, HostError>;

    /// Whether the host honours [`WindowTarget::Window`].
    fn supports_window_targeting(&self) -> bool {
        true
    }
}

/// Everything the background capturer needs from its host.
pub trait BrowserHost: TabHost + CaptureHost {}

impl<T: TabHost + CaptureHost> BrowserHost for T {}

/// Compares a captured screenshot against a design reference.
#[async_trait]
pub trait ComparisonEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn compare(
        &self,
        image_data_url: &str,
        frame: &FrameReference,
    ) -> Result<ComparisonReport, CompareError>;
}
