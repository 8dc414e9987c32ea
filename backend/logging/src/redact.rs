//! Log Redaction Layer
//!
//! Shortens base64 image payloads inside data URLs before they reach logs.
//! A single screenshot is several hundred kilobytes of base64.

use regex::Regex;
use std::sync::LazyLock;

/// Payload characters kept in front of the elision marker.
const KEPT_PAYLOAD_CHARS: usize = 16;

static DATA_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"data:([a-zA-Z0-9.+-]+/[a-zA-Z0-9.+-]+);base64,([A-Za-z0-9+/]+=*)").unwrap()
});

/// Replace each data URL's payload with its first few characters and a
/// length marker, e.g. `data:image/png;base64,iVBORw0KGgoAAAAN…[2048 chars]`.
pub fn redact_image_payloads(input: &str) -> String {
    DATA_URL_RE
        .replace_all(input, |caps: &regex::Captures| {
            let mime = &caps[1];
            let payload = &caps[2];
            if payload.len() <= KEPT_PAYLOAD_CHARS {
                return caps[0].to_string();
            }
            format!(
                "data:{};base64,{}…[{} chars]",
                mime,
                &payload[..KEPT_PAYLOAD_CHARS],
                payload.len()
            )
        })
        .into_owned()
}
