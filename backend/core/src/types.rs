use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CompareError;

pub type TabId = i64;
pub type WindowId = i64;

/// A tab descriptor as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    /// Missing for tabs the host cannot address (devtools, prerender).
    pub id: Option<TabId>,
    pub window_id: Option<WindowId>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Encoding for visible-area captures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormat::Png => write!(f, "png"),
            ImageFormat::Jpeg => write!(f, "jpeg"),
        }
    }
}

/// Parameters of a capture call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    pub format: ImageFormat,
    /// JPEG quality 0-100; ignored for PNG.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
}

/// Which window a capture call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowTarget {
    /// Whatever window the host considers current
    CurrentWindow,
    /// A specific window, normally the resolved tab's
    Window(WindowId),
}

impl fmt::Display for WindowTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowTarget::CurrentWindow => write!(f, "current"),
            WindowTarget::Window(id) => write!(f, "window({})", id),
        }
    }
}

/// What the popup does with an outcome whose `requestId` is not the one it
/// sent last.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaleOutcomePolicy {
    /// Apply every outcome, stale or not
    #[default]
    Accept,
    /// Ignore outcomes correlated to an older request
    Discard,
}

/// A design frame reference of the form `fileKey/node-id`,
/// e.g. `abc123xyz/123:456`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameReference {
    pub file_key: String,
    pub node_id: String,
}

impl FromStr for FrameReference {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (file_key, node_id) = trimmed
            .split_once('/')
            .ok_or_else(|| CompareError::InvalidFrameReference(s.to_string()))?;
        if file_key.is_empty() || node_id.is_empty() || node_id.contains('/') {
            return Err(CompareError::InvalidFrameReference(s.to_string()));
        }
        Ok(Self {
            file_key: file_key.to_string(),
            node_id: node_id.to_string(),
        })
    }
}

impl fmt::Display for FrameReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.file_key, self.node_id)
    }
}

/// Result of comparing a screenshot against a design frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub frame: FrameReference,
    /// Fraction of differing pixels, 0.0 to 1.0.
    pub mismatch_ratio: f64,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_deserializes_host_shape() {
        let tab: Tab = serde_json::from_value(serde_json::json!({
            "id": 42, "windowId": 1, "active": true, "url": "https://example.com"
        }))
        .unwrap();
        assert_eq!(tab.id, Some(42));
        assert_eq!(tab.window_id, Some(1));
        assert!(tab.title.is_none());
    }

    #[test]
    fn test_format_display_and_mime() {
        assert_eq!(ImageFormat::Png.to_string(), "png");
        assert_eq!(ImageFormat::Jpeg.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_frame_reference_parse() {
        let frame: FrameReference = "abc123xyz/123:456".parse().unwrap();
        assert_eq!(frame.file_key, "abc123xyz");
        assert_eq!(frame.node_id, "123:456");
        assert_eq!(frame.to_string(), "abc123xyz/123:456");
    }

    #[test]
    fn test_frame_reference_rejects_malformed() {
        assert!("".parse::<FrameReference>().is_err());
        assert!("abc".parse::<FrameReference>().is_err());
        assert!("/123:456".parse::<FrameReference>().is_err());
        assert!("abc/".parse::<FrameReference>().is_err());
        assert!("a/b/c".parse::<FrameReference>().is_err());
    }
}
