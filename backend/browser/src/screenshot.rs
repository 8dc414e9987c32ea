//! Viewport Screenshot Encoding
//!
//! Produces placeholder image bytes for a tab and wraps them in the
//! `data:<mime>;base64,` URLs the capture protocol carries.

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};

use miru_core::{ImageFormat, Tab};

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Magic bytes for `format` followed by the tab and window ids, so captures
/// of different tabs are distinguishable.
pub fn placeholder_image(format: ImageFormat, tab: &Tab) -> Vec<u8> {
    let mut bytes = match format {
        ImageFormat::Png => PNG_MAGIC.to_vec(),
        ImageFormat::Jpeg => JPEG_MAGIC.to_vec(),
    };
    bytes.extend_from_slice(&tab.window_id.unwrap_or(-1).to_be_bytes());
    bytes.extend_from_slice(&tab.id.unwrap_or(-1).to_be_bytes());
    bytes
}

pub fn encode_data_url(format: ImageFormat, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", format.mime_type(), STANDARD.encode(bytes))
}

/// Split a base64 data URL into its mime type and decoded bytes.
pub fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>)> {
    let Some(rest) = data_url.strip_prefix("data:") else {
        bail!("not a data URL");
    };
    let (header, payload) = rest
        .split_once(',')
        .context("data URL has no payload separator")?;
    let Some(mime) = header.strip_suffix(";base64") else {
        bail!("data URL is not base64 encoded");
    };
    let bytes = STANDARD
        .decode(payload)
        .context("data URL payload is not valid base64")?;
    Ok((mime.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_data_url_prefix() {
        let tab = Tab {
            id: Some(7),
            window_id: Some(1),
            active: true,
            ..Default::default()
        };
        let url = encode_data_url(ImageFormat::Png, &placeholder_image(ImageFormat::Png, &tab));
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_decode_recovers_bytes() {
        let (mime, bytes) = decode_data_url("data:image/png;base64,AAAA").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, vec![0, 0, 0]);
    }

    #[test]
    fn test_decode_rejects_non_data_urls() {
        assert!(decode_data_url("https://example.com/a.png").is_err());
        assert!(decode_data_url("data:image/png,raw").is_err());
        assert!(decode_data_url("data:image/png;base64").is_err());
    }
}
