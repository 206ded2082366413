#![forbid(unsafe_code)]

//! Helpers that keep the API key out of anything we print or log.

use anyhow::{Result, bail};

const REDACTED: &str = "<redacted>";

/// Rejects keys that are obviously not usable before a request goes out.
/// The tooling ships with a `YOUR-API-KEY` placeholder in sample configs.
pub fn ensure_api_key(key: &str) -> Result<()> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        bail!("YOUTUBE_API_KEY not set; pass --api-key or add it to .env");
    }
    if trimmed.eq_ignore_ascii_case("YOUR-API-KEY") {
        bail!("YOUTUBE_API_KEY still holds the placeholder value");
    }
    if trimmed.chars().any(|c| c.is_whitespace() || c == '&' || c == '#') {
        bail!("YOUTUBE_API_KEY contains characters that cannot appear in a key");
    }
    Ok(())
}

/// Replaces every occurrence of `key` in `text`, including the `key=` query
/// parameter that transport errors echo back with the request URL.
pub fn redact_api_key(text: &str, key: &str) -> String {
    if key.is_empty() {
        return text.to_string();
    }
    text.replace(key, REDACTED)
}
