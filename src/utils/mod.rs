//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod retry;

use anyhow::{Context, Result};
use url::Url;

/// Host serving regular watch pages
pub const VIDEO_HOST: &str = "www.youtube.com";

/// Parse the advertised comment count, e.g. `"1,234 Comments"` -> `1234`
///
/// Takes the leading run of digits and thousands separators and ignores the
/// rest. Returns `None` when the text does not start with a number.
pub fn parse_comment_count(text: &str) -> Option<usize> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();

    if digits.is_empty() {
        return None;
    }

    digits.parse().ok()
}

/// Check that a URL points at a regular video page (not a short)
pub fn validate_video_url(raw: &str) -> Result<Url> {
    if raw.chars().any(char::is_whitespace) {
        anyhow::bail!("URL must not contain whitespace: {raw:?}");
    }

    let parsed = Url::parse(raw).with_context(|| format!("Invalid URL: {raw}"))?;

    if parsed.scheme() != "https" {
        anyhow::bail!("URL must use https: {raw}");
    }

    if parsed.host_str() != Some(VIDEO_HOST) {
        anyhow::bail!("URL host must be {VIDEO_HOST}: {raw}");
    }

    let path = parsed.path();
    if path == "/" || path.is_empty() {
        anyhow::bail!("URL does not point at a video: {raw}");
    }

    if path.starts_with("/shorts/") {
        anyhow::bail!("Shorts are not supported: {raw}");
    }

    Ok(parsed)
}

/// Truncate text to a maximum number of characters for log previews
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{truncated}...")
}
