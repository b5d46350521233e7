//! External API clients
//!
//! Both upstream systems are reached through the same retry executor so the
//! failure taxonomy stays uniform: credential rejection is fatal, rate limits
//! and 5xx/transport errors retry with exponential backoff, anything else
//! surfaces immediately.

pub mod marketplace;
pub mod warehouse;

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};

use crate::error::{AppError, AppResult};

/// Backoff parameters for upstream requests.
///
/// Kept as a plain value so delay arithmetic is testable without sleeping:
/// the wait after failed attempt `n` is `base * factor^(n-1)` capped at
/// `max_delay`, and a rate-limit hint raises it to at least the hinted value.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            backoff_factor: 2,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff after failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Wait before the next attempt, honoring a rate-limit hint as a minimum.
    pub fn delay_before_retry(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let backoff = self.backoff(attempt);
        match hint {
            Some(hint) => backoff.max(hint),
            None => backoff,
        }
    }
}

/// Extract a `Retry-After` seconds hint from response headers.
pub fn retry_after_hint(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Execute a request with retry/backoff and typed failure classification.
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed by
/// sending. Returns the first successful response; auth rejection and
/// unexpected client errors are fatal immediately.
pub(crate) async fn execute_with_retry<F>(
    policy: &RetryPolicy,
    target: &str,
    build: F,
) -> AppResult<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt: u32 = 1;
    loop {
        let outcome = build().send().await;
        match outcome {
            Err(err) => {
                tracing::warn!(target, attempt, error = %err, "upstream request error");
                if attempt >= policy.max_attempts {
                    return Err(AppError::MarketplaceUnavailable(err.to_string()));
                }
                tokio::time::sleep(policy.delay_before_retry(attempt, None)).await;
            }
            Ok(response) => {
                let status = response.status();
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    tracing::warn!(target, attempt, %status, "credential rejected");
                    return Err(AppError::Unauthorized);
                }
                if status == StatusCode::TOO_MANY_REQUESTS {
                    let hint = retry_after_hint(response.headers());
                    tracing::warn!(
                        target,
                        attempt,
                        retry_after = ?hint,
                        "rate limited by upstream"
                    );
                    if attempt >= policy.max_attempts {
                        return Err(AppError::RateLimited {
                            retry_after: hint.map(|d| d.as_secs()),
                        });
                    }
                    tokio::time::sleep(policy.delay_before_retry(attempt, hint)).await;
                } else if status.is_server_error() {
                    tracing::warn!(target, attempt, %status, "upstream server error");
                    if attempt >= policy.max_attempts {
                        return Err(AppError::MarketplaceUnavailable(format!("status {status}")));
                    }
                    tokio::time::sleep(policy.delay_before_retry(attempt, None)).await;
                } else if !status.is_success() {
                    return Err(AppError::MalformedResponse(format!(
                        "unexpected status {status} from {target}"
                    )));
                } else {
                    tracing::debug!(target, attempt, %status, "upstream request ok");
                    return Ok(response);
                }
            }
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_secs(1));
        assert_eq!(policy.backoff(3), Duration::from_secs(2));
        assert_eq!(policy.backoff(4), Duration::from_secs(4));
        assert_eq!(policy.backoff(12), Duration::from_secs(60));
    }

    #[test]
    fn rate_limit_hint_is_a_floor_not_a_ceiling() {
        let policy = RetryPolicy::default();
        // A 429 with Retry-After: 12 on attempt 1 waits the full 12 seconds.
        assert_eq!(
            policy.delay_before_retry(1, Some(Duration::from_secs(12))),
            Duration::from_secs(12)
        );
        // A hint below the computed backoff does not shorten the wait.
        assert_eq!(
            policy.delay_before_retry(3, Some(Duration::from_secs(1))),
            Duration::from_secs(2)
        );
        assert_eq!(
            policy.delay_before_retry(2, None),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn retry_after_header_parses_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(retry_after_hint(&headers), Some(Duration::from_secs(12)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("1.5"));
        assert_eq!(retry_after_hint(&headers), Some(Duration::from_secs_f64(1.5)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(retry_after_hint(&headers), None);

        headers.remove(RETRY_AFTER);
        assert_eq!(retry_after_hint(&headers), None);
    }
}
