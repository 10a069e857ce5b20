//! Request descriptors and URL construction for the GitHub REST API.

use std::fmt;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use url::Url;

/// A single query-string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Int(n) => write!(f, "{}", n),
            ParamValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

/// Ordered query parameters. Entries whose value is `None` are kept so the
/// call site reads like the endpoint's parameter list, but are never sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, Option<ParamValue>)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<V: Into<ParamValue>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert<V: Into<ParamValue>>(&mut self, key: impl Into<String>, value: Option<V>) {
        self.0.push((key.into(), value.map(Into::into)));
    }

    /// Entries that will actually be serialized, in insertion order.
    pub fn present(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key.as_str(), v)))
    }
}

/// Join `path` onto `base` and append the present query parameters using
/// form encoding (a space becomes `+`).
///
/// The base may carry a path prefix (GitHub Enterprise serves the API under
/// `/api/v3`), so `path` is appended to it rather than resolved against it.
pub fn build_url(base: &Url, path: &str, query: &QueryParams) -> Result<Url, url::ParseError> {
    let base = base.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let mut url = Url::parse(&format!("{}/{}", base, path))?;

    let mut present = query.present().peekable();
    if present.peek().is_some() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in present {
            pairs.append_pair(key, &value.to_string());
        }
    }

    Ok(url)
}

/// Everything needed to issue one API call. Built per call and consumed by
/// [`GithubClient::send`](crate::client::GithubClient::send).
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: QueryParams,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParams::new(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    /// Add a header that overrides the client's fixed header of the same name.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}
