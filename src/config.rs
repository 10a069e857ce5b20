//! Process-wide configuration, resolved once at startup.

use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use url::Url;

use crate::error::McpNotificationsError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

pub const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
pub const GITHUB_API_VERSION: &str = "2022-11-28";
pub const API_VERSION_HEADER: &str = "x-github-api-version";
pub const CLIENT_USER_AGENT: &str =
    concat!("GitHub-Notifications-MCP-Server/", env!("CARGO_PKG_VERSION"));

/// Token and endpoint the GitHub client is built from.
///
/// The token is never re-read; rotating it means restarting the process.
#[derive(Clone)]
pub struct Config {
    token: Option<String>,
    api_url: Url,
}

impl Config {
    pub fn new(token: Option<String>, api_url: Url) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
            api_url,
        }
    }

    /// Resolve the token with precedence `--token` > `--token-env` >
    /// `GITHUB_TOKEN`. Empty environment values count as unset.
    pub fn resolve(
        token: Option<String>,
        token_env: Option<&str>,
        api_url: &str,
    ) -> Result<Self, McpNotificationsError> {
        let api_url = Url::parse(api_url).map_err(|e| {
            McpNotificationsError::Config(format!("invalid API URL '{}': {}", api_url, e))
        })?;

        let token = if let Some(t) = token {
            Some(t)
        } else {
            let env_name = token_env.unwrap_or(DEFAULT_TOKEN_ENV);
            match std::env::var(env_name) {
                Ok(t) if !t.is_empty() => {
                    tracing::info!(env = env_name, "Read GitHub token from environment variable");
                    Some(t)
                }
                _ => None,
            }
        };

        Ok(Self::new(token, api_url))
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// The headers attached to every request. Without a token the bearer is
    /// left empty and GitHub answers 401.
    pub fn default_headers(&self) -> Result<HeaderMap, McpNotificationsError> {
        let bearer = format!("Bearer {}", self.token.as_deref().unwrap_or("").trim());
        let mut authorization = HeaderValue::from_str(&bearer).map_err(|_| {
            McpNotificationsError::Config("GitHub token contains invalid characters".to_string())
        })?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(GITHUB_API_VERSION));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        Ok(headers)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url.as_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_url() -> Url {
        Url::parse(DEFAULT_API_URL).unwrap()
    }

    #[test]
    fn test_default_headers() {
        let config = Config::new(Some("test_token_123".into()), api_url());
        let headers = config.default_headers().unwrap();
        assert_eq!(headers[ACCEPT], "application/vnd.github+json");
        assert_eq!(headers[AUTHORIZATION], "Bearer test_token_123");
        assert_eq!(headers[API_VERSION_HEADER], "2022-11-28");
        assert!(headers[USER_AGENT]
            .to_str()
            .unwrap()
            .starts_with("GitHub-Notifications-MCP-Server/"));
        assert!(headers[AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn test_missing_token_sends_empty_bearer() {
        let config = Config::new(None, api_url());
        assert!(!config.is_authenticated());
        let headers = config.default_headers().unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer ");
    }

    #[test]
    fn test_blank_token_counts_as_missing() {
        let config = Config::new(Some("   ".into()), api_url());
        assert!(!config.is_authenticated());
    }

    #[test]
    fn test_token_with_newline_is_rejected() {
        let config = Config::new(Some("abc\ndef".into()), api_url());
        assert!(matches!(
            config.default_headers(),
            Err(McpNotificationsError::Config(_))
        ));
    }

    #[test]
    fn test_resolve_prefers_explicit_token() {
        let config = Config::resolve(
            Some("explicit".into()),
            Some("MCP_NOTIFICATIONS_TEST_UNSET_VAR"),
            DEFAULT_API_URL,
        )
        .unwrap();
        assert!(config.is_authenticated());
        assert_eq!(
            config.default_headers().unwrap()[AUTHORIZATION],
            "Bearer explicit"
        );
    }

    #[test]
    fn test_resolve_reads_named_env_var() {
        std::env::set_var("MCP_NOTIFICATIONS_TEST_TOKEN", "from_env");
        let config =
            Config::resolve(None, Some("MCP_NOTIFICATIONS_TEST_TOKEN"), DEFAULT_API_URL).unwrap();
        assert_eq!(
            config.default_headers().unwrap()[AUTHORIZATION],
            "Bearer from_env"
        );
    }

    #[test]
    fn test_resolve_empty_env_var_is_unauthenticated() {
        std::env::set_var("MCP_NOTIFICATIONS_TEST_EMPTY", "");
        let config =
            Config::resolve(None, Some("MCP_NOTIFICATIONS_TEST_EMPTY"), DEFAULT_API_URL).unwrap();
        assert!(!config.is_authenticated());
    }

    #[test]
    fn test_resolve_rejects_bad_url() {
        assert!(matches!(
            Config::resolve(Some("t".into()), None, "not a url"),
            Err(McpNotificationsError::Config(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = Config::new(Some("secret".into()), api_url());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
