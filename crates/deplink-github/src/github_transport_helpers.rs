use std::time::Duration;

use thiserror::Error;

const MAX_RETRY_DELAY_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("github api {operation} failed with status {status}: {body}")]
/// Non-success HTTP response, kept typed inside `anyhow` chains so callers can
/// recognise specific statuses by downcasting.
pub struct GithubStatusError {
    pub operation: String,
    pub status: u16,
    pub body: String,
}

impl GithubStatusError {
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Returns true when `error` carries a GitHub 404 anywhere in its chain.
pub fn is_github_not_found(error: &anyhow::Error) -> bool {
    error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<GithubStatusError>())
        .any(GithubStatusError::is_not_found)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Bounded retry with exponential backoff for outbound GitHub calls.
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms: base_delay_ms.max(1),
        }
    }

    pub fn has_attempts_left(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }

    pub fn should_retry_status(&self, attempt: usize, status: u16, body: &str) -> bool {
        self.has_attempts_left(attempt) && is_retryable_github_status(status, body)
    }

    pub fn should_retry_transport(&self, attempt: usize, error: &reqwest::Error) -> bool {
        self.has_attempts_left(attempt) && is_retryable_transport_error(error)
    }

    /// `Retry-After` wins but never undercuts the base delay; otherwise the
    /// delay doubles per attempt. Both are capped at 30 seconds.
    pub fn delay(&self, attempt: usize, retry_after: Option<Duration>) -> Duration {
        let cap = Duration::from_millis(MAX_RETRY_DELAY_MS);
        if let Some(delay) = retry_after {
            return delay.max(Duration::from_millis(self.base_delay_ms)).min(cap);
        }
        let exponent = attempt.saturating_sub(1).min(10) as u32;
        let scaled = self
            .base_delay_ms
            .saturating_mul(2_u64.saturating_pow(exponent));
        Duration::from_millis(scaled).min(cap)
    }
}

pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let raw = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
    let seconds = raw.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}

pub fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

/// 429 and 5xx are transient; GitHub also reports secondary rate limits as 403.
pub fn is_retryable_github_status(status: u16, body: &str) -> bool {
    if status == 429 || status >= 500 {
        return true;
    }
    status == 403 && body.to_ascii_lowercase().contains("rate limit")
}

pub fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
