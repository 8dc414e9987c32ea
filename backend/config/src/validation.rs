//! Config validation with user-friendly error messages.

use miru_core::ImageFormat;
use thiserror::Error;

use crate::schema::MiruConfig;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &MiruConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_capture(config, &mut report);
    validate_popup(config, &mut report);
    validate_bus(config, &mut report);
    report
}

fn validate_capture(config: &MiruConfig, report: &mut ValidationReport) {
    let Some(capture) = &config.capture else { return };

    if let Some(quality) = capture.quality {
        if quality > 100 {
            report.error("capture.quality", format!("Quality {quality} is outside 0-100"));
        }
        if capture.format != Some(ImageFormat::Jpeg) {
            report.warn("capture.quality", "Quality only applies to jpeg captures");
        }
    }
    if capture.preview_length == Some(0) {
        report.error("capture.previewLength", "Preview length must be at least 1");
    }
}

fn validate_popup(config: &MiruConfig, report: &mut ValidationReport) {
    let Some(popup) = &config.popup else { return };
    if let Some(frame) = &popup.default_frame {
        if !frame.is_empty() && frame.parse::<miru_core::FrameReference>().is_err() {
            report.warn(
                "popup.defaultFrame",
                "Expected a frame reference of the form fileKey/node-id",
            );
        }
    }
}

fn validate_bus(config: &MiruConfig, report: &mut ValidationReport) {
    let Some(bus) = &config.bus else { return };
    match bus.buffer_size {
        Some(0) => report.error("bus.bufferSize", "Buffer size must be at least 1"),
        Some(n) if n < 4 => report.warn(
            "bus.bufferSize",
            "Very small buffers drop messages when a listener falls behind",
        ),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::apply_all_defaults;
    use crate::schema::{BusConfig, CaptureConfig, PopupConfig};

    #[test]
    fn defaults_are_valid() {
        let report = validate(&apply_all_defaults(MiruConfig::default()));
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn rejects_out_of_range_quality() {
        let cfg = MiruConfig {
            capture: Some(CaptureConfig {
                format: Some(ImageFormat::Jpeg),
                quality: Some(150),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "capture.quality");
    }

    #[test]
    fn warns_on_quality_for_png() {
        let cfg = MiruConfig {
            capture: Some(CaptureConfig {
                format: Some(ImageFormat::Png),
                quality: Some(90),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn rejects_zero_preview_and_buffer() {
        let cfg = MiruConfig {
            capture: Some(CaptureConfig {
                preview_length: Some(0),
                ..Default::default()
            }),
            bus: Some(BusConfig {
                buffer_size: Some(0),
            }),
            ..Default::default()
        };
        assert_eq!(validate(&cfg).errors.len(), 2);
    }

    #[test]
    fn warns_on_malformed_default_frame() {
        let cfg = MiruConfig {
            popup: Some(PopupConfig {
                default_frame: Some("not-a-frame".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = validate(&cfg);
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].path, "popup.defaultFrame");
    }
}
