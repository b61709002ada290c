//! Rate-limit backoff derived from provider response headers

use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::header::HeaderMap;
use std::sync::OnceLock;
use std::time::Duration;

/// Wait used when a 429 carries no usable header
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(5);

/// Shortest wait derived from a reset timestamp
const MIN_TIMESTAMP_WAIT: Duration = Duration::from_secs(1);

/// How a reset header expresses the end of the current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetFormat {
    /// Unix epoch seconds, integral or fractional
    EpochSeconds,
    /// RFC 3339 instant
    Rfc3339,
    /// Relative duration such as `2h32m54s`, `1.5s` or `120ms`
    Duration,
}

/// Header names a provider uses to announce its rate-limit windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub format: ResetFormat,
    /// Reset of the request budget, or the provider's only reset header
    pub reset: &'static str,
    /// `(remaining, reset)` pair of the token budget. Its reset header is
    /// preferred when the remaining token count is exactly zero.
    pub tokens: Option<(&'static str, &'static str)>,
}

/// Backoff computation for HTTP 429 responses.
///
/// Precedence: the provider's reset header (timestamp or duration), then a
/// standard `Retry-After` in seconds, then [`DEFAULT_RATE_LIMIT_WAIT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitPolicy {
    Headers(RateLimitHeaders),
    Default,
}

impl RateLimitPolicy {
    /// `x-ratelimit-reset-{requests,tokens}` durations
    pub const OPENAI: RateLimitPolicy = RateLimitPolicy::Headers(RateLimitHeaders {
        format: ResetFormat::Duration,
        reset: "x-ratelimit-reset-requests",
        tokens: Some(("x-ratelimit-remaining-tokens", "x-ratelimit-reset-tokens")),
    });

    /// `anthropic-ratelimit-*-reset` RFC 3339 instants
    pub const ANTHROPIC: RateLimitPolicy = RateLimitPolicy::Headers(RateLimitHeaders {
        format: ResetFormat::Rfc3339,
        reset: "anthropic-ratelimit-requests-reset",
        tokens: Some((
            "anthropic-ratelimit-tokens-remaining",
            "anthropic-ratelimit-tokens-reset",
        )),
    });

    /// Single `x-ratelimit-reset` epoch timestamp
    pub const DEEPSEEK: RateLimitPolicy = RateLimitPolicy::Headers(RateLimitHeaders {
        format: ResetFormat::EpochSeconds,
        reset: "x-ratelimit-reset",
        tokens: None,
    });

    pub fn wait_duration(&self, headers: &HeaderMap) -> Duration {
        self.wait_duration_at(headers, Utc::now())
    }

    /// Same as [`wait_duration`](Self::wait_duration) with an explicit clock
    pub fn wait_duration_at(&self, headers: &HeaderMap, now: DateTime<Utc>) -> Duration {
        if let RateLimitPolicy::Headers(names) = self {
            if let Some(wait) = names.reset_wait(headers, now) {
                return wait;
            }
        }

        header_str(headers, "retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RATE_LIMIT_WAIT)
    }
}

impl RateLimitHeaders {
    fn reset_wait(&self, headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
        let value = self
            .selected_reset(headers)
            .and_then(|name| header_str(headers, name))
            .or_else(|| header_str(headers, self.reset))?;

        match self.format {
            ResetFormat::EpochSeconds => {
                let secs: f64 = value.trim().parse().ok()?;
                let reset = DateTime::from_timestamp_millis((secs * 1000.0) as i64)?;
                Some(until(reset, now))
            }
            ResetFormat::Rfc3339 => {
                let reset = DateTime::parse_from_rfc3339(value.trim()).ok()?;
                Some(until(reset.with_timezone(&Utc), now))
            }
            ResetFormat::Duration => parse_reset_duration(value),
        }
    }

    fn selected_reset(&self, headers: &HeaderMap) -> Option<&'static str> {
        let (remaining, reset) = self.tokens?;
        let exhausted = header_str(headers, remaining)
            .and_then(|v| v.trim().parse::<u64>().ok())
            == Some(0);
        if exhausted {
            Some(reset)
        } else {
            Some(self.reset)
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn until(reset: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (reset - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
        .max(MIN_TIMESTAMP_WAIT)
}

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d+(?:\.\d+)?)(ms|h|m|s)").expect("duration pattern is valid")
    })
}

/// Parse a relative duration like `2h32m54s`, `6m0s`, `1.5s` or `120ms`.
/// Returns `None` when no component is present.
pub fn parse_reset_duration(value: &str) -> Option<Duration> {
    let mut total = 0.0_f64;
    let mut matched = false;

    for caps in duration_pattern().captures_iter(value) {
        let amount: f64 = caps[1].parse().ok()?;
        let unit_secs = match &caps[2] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            _ => 0.001,
        };
        total += amount * unit_secs;
        matched = true;
    }

    if matched {
        Duration::try_from_secs_f64(total).ok()
    } else {
        None
    }
}
