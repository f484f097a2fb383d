//! Response Classification
//!
//! Maps non-success provider responses onto the attempt failure classes.

use crate::error::Failure;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;

/// Longest body excerpt kept in failure messages
const BODY_EXCERPT: usize = 500;

const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "too many requests",
    "quota exceeded",
    "insufficient_quota",
];

const CONTENT_MARKERS: &[&str] = &[
    "content filter",
    "content_filter",
    "content policy",
    "content_policy",
    "safety",
    "moderation",
    "nsfw",
    "inappropriate",
];

/// Classify a non-success HTTP response
pub fn classify_response(status: StatusCode, headers: &HeaderMap, body: &str) -> Failure {
    let excerpt = excerpt(body);

    if is_rate_limit_error(status.as_u16(), body) {
        return Failure::rate_limited(
            format!("Rate limited ({}): {}", status, excerpt),
            parse_retry_after(headers),
        );
    }

    if is_content_rejection(status.as_u16(), body) {
        return Failure::content_rejected(format!("Content rejected ({}): {}", status, excerpt));
    }

    if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        return Failure::transient(format!("Provider unavailable ({}): {}", status, excerpt));
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Failure::fatal(format!("Authentication failed ({}): {}", status, excerpt));
    }

    Failure::fatal(format!("Request failed with status {}: {}", status, excerpt))
}

/// Detect if a response indicates a rate limit error
pub fn is_rate_limit_error(status: u16, body: &str) -> bool {
    // HTTP 429 Too Many Requests
    if status == 429 {
        return true;
    }

    // Some providers return 400 or 403 with rate limit messages
    if !(400..500).contains(&status) {
        return false;
    }
    let lower_body = body.to_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|m| lower_body.contains(m))
}

/// Detect a policy refusal of the prompt
pub fn is_content_rejection(status: u16, body: &str) -> bool {
    if status == 451 {
        return true;
    }
    if !(400..500).contains(&status) {
        return false;
    }
    let lower_body = body.to_lowercase();
    CONTENT_MARKERS.iter().any(|m| lower_body.contains(m))
}

/// Parse the `retry-after` header (seconds or a `1m30s`-style string)
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    value
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
        .or_else(|| parse_duration_string(value))
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(BODY_EXCERPT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Parse `<number><unit>` runs such as "1m30s", "2h", "1.5s" or "250ms"
///
/// Negative, non-finite and out-of-range values are rejected.
fn parse_duration_string(s: &str) -> Option<Duration> {
    let is_numeric = |c: char| c.is_ascii_digit() || c == '.';

    let mut rest = s.trim();
    if rest.is_empty() {
        return None;
    }

    let mut total = Duration::ZERO;
    while !rest.is_empty() {
        let digits_end = rest.find(|c: char| !is_numeric(c)).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(digits_end);
        let unit_end = tail.find(is_numeric).unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_end);

        let value = number.parse::<f64>().ok()?;
        let secs = match unit {
            "ms" => value / 1000.0,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            _ => return None,
        };
        total = total.checked_add(Duration::try_from_secs_f64(secs).ok()?)?;
        rest = next;
    }

    Some(total)
}
