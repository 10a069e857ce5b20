use chrono::{DateTime, Local, Utc};
use rmcp::model::ErrorData;
use serde_json::Value;

use crate::validation::ValidationErrors;

/// A failed GitHub API call.
///
/// The first six variants are classified from the HTTP response; the rest
/// are local failures before or after the round trip.
#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("Authentication failed. Please check your GitHub token.")]
    Unauthorized,

    #[error("GitHub API rate limit exceeded. Resets at {}", local_clock(.reset_at))]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Access forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {message}{}", details_suffix(.details))]
    ValidationFailed {
        message: String,
        details: Option<Value>,
    },

    #[error("GitHub API error ({status}): {message}")]
    Generic { status: u16, message: String },

    #[error("Request to GitHub failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode GitHub response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

impl GithubError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GithubError::NotFound(_))
    }

    /// HTTP status the error was classified from, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            GithubError::Unauthorized => Some(401),
            GithubError::RateLimited { .. } | GithubError::Forbidden(_) => Some(403),
            GithubError::NotFound(_) => Some(404),
            GithubError::ValidationFailed { .. } => Some(422),
            GithubError::Generic { status, .. } => Some(*status),
            GithubError::Transport(_) | GithubError::Decode(_) | GithubError::Url(_) => None,
        }
    }
}

fn local_clock(reset_at: &DateTime<Utc>) -> String {
    reset_at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

fn details_suffix(details: &Option<Value>) -> String {
    details
        .as_ref()
        .map(|d| format!(" {}", d))
        .unwrap_or_default()
}

/// Errors surfaced to the MCP host as protocol errors rather than tool results.
#[derive(Debug, thiserror::Error)]
pub enum McpNotificationsError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] ValidationErrors),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl McpNotificationsError {
    pub fn to_mcp_error(&self) -> ErrorData {
        match self {
            McpNotificationsError::InvalidParams(errors) => {
                let fields: Vec<Value> = errors
                    .errors()
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "field": e.field,
                            "message": e.violation.to_string(),
                        })
                    })
                    .collect();
                ErrorData::invalid_params(
                    self.to_string(),
                    Some(serde_json::json!({ "fields": fields })),
                )
            }
            McpNotificationsError::Config(_) => ErrorData::internal_error(self.to_string(), None),
        }
    }
}
