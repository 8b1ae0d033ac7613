// src/utils/http.rs

//! HTTP client utilities.

use reqwest::header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER};

use crate::error::Result;
use crate::models::ClientConfig;

/// Create a configured asynchronous HTTP client.
///
/// The timeout bounds every request independently of retry sleeps.
pub fn create_async_client(config: &ClientConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .build()?;
    Ok(client)
}

/// Parse a `Retry-After` header given in seconds.
pub fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

/// File extension derived from a `Content-Type` header (`image/png` -> `png`).
pub fn extension_from_content_type(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let subtype = value.split('/').nth(1)?.split(';').next()?.trim();
    if subtype.is_empty() {
        return None;
    }
    let ext = match subtype {
        "jpeg" | "pjpeg" => "jpg",
        "svg+xml" => "svg",
        other => other,
    };
    Some(ext.to_ascii_lowercase())
}
