//! Config defaults: fills in values the user did not set.

use miru_core::{ImageFormat, StaleOutcomePolicy};

use crate::schema::{BusConfig, CaptureConfig, LoggingConfig, MiruConfig, PopupConfig};

/// Default acknowledgement preview length (characters of the data URL).
pub const DEFAULT_PREVIEW_LENGTH: usize = 50;

/// Default per-subscriber bus buffer.
pub const DEFAULT_BUS_BUFFER: usize = 256;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: MiruConfig) -> MiruConfig {
    let config = apply_capture_defaults(config);
    let config = apply_popup_defaults(config);
    let config = apply_bus_defaults(config);
    apply_logging_defaults(config)
}

fn apply_capture_defaults(mut config: MiruConfig) -> MiruConfig {
    let capture = config.capture.get_or_insert_with(CaptureConfig::default);
    capture.format.get_or_insert(ImageFormat::Png);
    capture.scope_to_tab_window.get_or_insert(false);
    capture.preview_length.get_or_insert(DEFAULT_PREVIEW_LENGTH);
    config
}

fn apply_popup_defaults(mut config: MiruConfig) -> MiruConfig {
    let popup = config.popup.get_or_insert_with(PopupConfig::default);
    popup.stale_outcomes.get_or_insert(StaleOutcomePolicy::Accept);
    config
}

fn apply_bus_defaults(mut config: MiruConfig) -> MiruConfig {
    let bus = config.bus.get_or_insert_with(BusConfig::default);
    bus.buffer_size.get_or_insert(DEFAULT_BUS_BUFFER);
    config
}

fn apply_logging_defaults(mut config: MiruConfig) -> MiruConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}
