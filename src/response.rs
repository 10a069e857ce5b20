//! Turning raw GitHub responses into decoded values or classified errors.

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::error::GithubError;

pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
pub const RATE_LIMIT_USED: &str = "x-ratelimit-used";

const UNKNOWN_ERROR: &str = "Unknown error";

/// Rate limit headers of a single response. Fields are `None` when GitHub
/// omitted the header or sent something unparseable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset: Option<i64>,
    pub used: Option<u64>,
}

impl RateLimit {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            limit: header_number(headers, RATE_LIMIT_LIMIT),
            remaining: header_number(headers, RATE_LIMIT_REMAINING),
            reset: header_number(headers, RATE_LIMIT_RESET),
            used: header_number(headers, RATE_LIMIT_USED),
        }
    }

    /// Wall-clock time the window resets, or the epoch when unknown.
    pub fn reset_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.reset.unwrap_or(0), 0).unwrap_or_default()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    header_str(headers, name).and_then(|v| v.trim().parse().ok())
}

/// The value returned for responses without a body.
pub fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<Value>,
}

/// Classify a response by status code.
///
/// 204 and 205 carry no body by definition and yield [`empty_object`]
/// whatever was sent. A 403 is a rate limit only when
/// `x-ratelimit-remaining` is exactly `"0"`; the message text is not
/// consulted.
pub fn classify(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Result<Value, GithubError> {
    if status.is_success() {
        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            return Ok(empty_object());
        }
        return Ok(serde_json::from_slice(body)?);
    }

    let error_body: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = error_body
        .message
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string());

    Err(match status {
        StatusCode::UNAUTHORIZED => GithubError::Unauthorized,
        StatusCode::FORBIDDEN if header_str(headers, RATE_LIMIT_REMAINING) == Some("0") => {
            GithubError::RateLimited {
                reset_at: RateLimit::from_headers(headers).reset_at(),
            }
        }
        StatusCode::FORBIDDEN => GithubError::Forbidden(message),
        StatusCode::NOT_FOUND => GithubError::NotFound(message),
        StatusCode::UNPROCESSABLE_ENTITY => GithubError::ValidationFailed {
            message,
            details: error_body.errors,
        },
        other => GithubError::Generic {
            status: other.as_u16(),
            message,
        },
    })
}
