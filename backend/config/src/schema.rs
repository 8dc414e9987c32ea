//! Miru configuration schema.
//!
//! Every section is optional in the file; [`crate::apply_all_defaults`]
//! fills in whatever the user left out.

use serde::{Deserialize, Serialize};

use miru_core::{ImageFormat, StaleOutcomePolicy};

/// Root configuration for Miru.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiruConfig {
    /// Background capturer settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture: Option<CaptureConfig>,

    /// Popup requester settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup: Option<PopupConfig>,

    /// Message bus settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bus: Option<BusConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConfig {
    /// Image encoding for captures ("png" or "jpeg")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,

    /// JPEG quality (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,

    /// Address the capture to the resolved tab's window instead of the
    /// host's current window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_to_tab_window: Option<bool>,

    /// Characters of the data URL echoed in the acknowledgement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_length: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupConfig {
    /// "accept" or "discard"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_outcomes: Option<StaleOutcomePolicy>,

    /// Initial frame identifier shown in the input field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_frame: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusConfig {
    /// Per-subscriber message buffer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. "info" or "miru_worker=debug"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for rolling NDJSON logs; console only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r#"
capture:
  format: jpeg
  quality: 80
  scopeToTabWindow: true
popup:
  staleOutcomes: discard
"#;
        let cfg: MiruConfig = serde_yaml::from_str(yaml).unwrap();
        let capture = cfg.capture.unwrap();
        assert_eq!(capture.format, Some(ImageFormat::Jpeg));
        assert_eq!(capture.quality, Some(80));
        assert_eq!(capture.scope_to_tab_window, Some(true));
        assert_eq!(
            cfg.popup.unwrap().stale_outcomes,
            Some(StaleOutcomePolicy::Discard)
        );
    }

    #[test]
    fn empty_document_is_default() {
        let cfg: MiruConfig = serde_yaml::from_str("{}").unwrap();
        assert!(cfg.capture.is_none());
        assert!(cfg.logging.is_none());
    }
}
