//! Maps the loaded config onto the component settings.

use miru_config::MiruConfig;
use miru_config::defaults::{DEFAULT_BUS_BUFFER, DEFAULT_LOG_LEVEL, DEFAULT_PREVIEW_LENGTH};
use miru_core::CaptureOptions;
use miru_popup::RequesterSettings;
use miru_worker::CapturerSettings;

pub fn capturer_settings(config: &MiruConfig) -> CapturerSettings {
    let capture = config.capture.clone().unwrap_or_default();
    CapturerSettings {
        options: CaptureOptions {
            format: capture.format.unwrap_or_default(),
            quality: capture.quality,
        },
        scope_to_tab_window: capture.scope_to_tab_window.unwrap_or(false),
        preview_length: capture.preview_length.unwrap_or(DEFAULT_PREVIEW_LENGTH),
    }
}

pub fn requester_settings(config: &MiruConfig) -> RequesterSettings {
    let popup = config.popup.clone().unwrap_or_default();
    RequesterSettings {
        stale_outcomes: popup.stale_outcomes.unwrap_or_default(),
        default_frame: popup.default_frame.unwrap_or_default(),
    }
}

pub fn bus_buffer(config: &MiruConfig) -> usize {
    config
        .bus
        .as_ref()
        .and_then(|b| b.buffer_size)
        .unwrap_or(DEFAULT_BUS_BUFFER)
}

pub fn log_level(config: &MiruConfig) -> String {
    config
        .logging
        .as_ref()
        .and_then(|l| l.level.clone())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use miru_config::{apply_all_defaults, CaptureConfig, PopupConfig};
    use miru_core::{ImageFormat, StaleOutcomePolicy};

    #[test]
    fn defaults_map_to_component_defaults() {
        let cfg = apply_all_defaults(MiruConfig::default());
        let capturer = capturer_settings(&cfg);
        assert_eq!(capturer.options.format, ImageFormat::Png);
        assert!(!capturer.scope_to_tab_window);
        assert_eq!(capturer.preview_length, 50);
        assert_eq!(
            requester_settings(&cfg).stale_outcomes,
            StaleOutcomePolicy::Accept
        );
        assert_eq!(bus_buffer(&cfg), 256);
        assert_eq!(log_level(&cfg), "info");
    }

    #[test]
    fn user_values_flow_through() {
        let cfg = MiruConfig {
            capture: Some(CaptureConfig {
                format: Some(ImageFormat::Jpeg),
                quality: Some(70),
                scope_to_tab_window: Some(true),
                preview_length: Some(8),
            }),
            popup: Some(PopupConfig {
                stale_outcomes: Some(StaleOutcomePolicy::Discard),
                default_frame: Some("abc/1:2".into()),
            }),
            ..Default::default()
        };
        let capturer = capturer_settings(&cfg);
        assert_eq!(capturer.options.quality, Some(70));
        assert!(capturer.scope_to_tab_window);
        let requester = requester_settings(&cfg);
        assert_eq!(requester.stale_outcomes, StaleOutcomePolicy::Discard);
        assert_eq!(requester.default_frame, "abc/1:2");
    }
}
