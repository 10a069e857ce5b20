//! HTTP transport for the GitHub REST API.
//!
//! One call is one round trip: no retries, no caching, no shared mutable
//! state. The client can be shared behind an `Arc` by concurrent tool calls.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::error::{GithubError, McpNotificationsError};
use crate::request::{build_url, ApiRequest, QueryParams};
use crate::response::{classify, RateLimit};

pub struct GithubClient {
    http: reqwest::Client,
    api_url: Url,
    headers: HeaderMap,
}

impl GithubClient {
    pub fn new(config: &Config) -> Result<Self, McpNotificationsError> {
        let headers = config.default_headers()?;
        let http = reqwest::Client::builder().build().map_err(|e| {
            McpNotificationsError::Config(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            http,
            api_url: config.api_url().clone(),
            headers,
        })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: QueryParams,
    ) -> Result<T, GithubError> {
        self.send(ApiRequest::get(path).query(query)).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, GithubError> {
        self.send(ApiRequest::put(path).body(body)).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, GithubError> {
        self.send(ApiRequest::patch(path).body(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, GithubError> {
        self.send(ApiRequest::delete(path)).await
    }

    /// Issue `request` and decode the response as `T`.
    ///
    /// Bodyless responses decode from `{}`, so `T` should tolerate an empty
    /// object when the endpoint can answer 204.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, GithubError> {
        let value = self.execute(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn execute(&self, request: ApiRequest) -> Result<Value, GithubError> {
        let url = build_url(&self.api_url, &request.path, &request.query)?;
        let headers = self.request_headers(&request.headers, request.body.is_some());

        let mut builder = self
            .http
            .request(request.method.clone(), url.clone())
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        let rate_limit = RateLimit::from_headers(&headers);
        tracing::debug!(
            method = %request.method,
            url = %url,
            status = status.as_u16(),
            remaining = ?rate_limit.remaining,
            limit = ?rate_limit.limit,
            used = ?rate_limit.used,
            "GitHub API call"
        );

        let body = response.bytes().await?;
        classify(status, &headers, &body)
    }

    /// Fixed headers, then `Content-Type` when there is a body, then the
    /// caller's headers replacing any of the above by name.
    fn request_headers(&self, extra: &HeaderMap, has_body: bool) -> HeaderMap {
        let mut headers = self.headers.clone();
        if has_body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for (name, value) in extra {
            headers.insert(name.clone(), value.clone());
        }
        headers
    }
}
