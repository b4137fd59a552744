//! HTTP request types.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::fmt;
use url::Url;

use crate::errors::{RestError, RestResult};

/// HTTP verbs issued by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// PUT request
    Put,
    /// POST request
    Post,
    /// DELETE request
    Delete,
}

impl HttpMethod {
    /// Returns the method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Converts to the reqwest method.
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request headers shared by every call of a client.
///
/// Names are case-insensitive. [`merge`](Self::merge) appends to an existing
/// value as a comma-joined list, [`set`](Self::set) overwrites.
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders {
    headers: HeaderMap,
}

impl RequestHeaders {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` to header `name`.
    ///
    /// If the header already has a value that does not contain `value`, the
    /// result is `"<existing>,<value>"`. A value already present is not
    /// repeated.
    pub fn merge(&mut self, name: &str, value: &str) -> RestResult<()> {
        let header_name = parse_name(name)?;

        let merged = match self.headers.get(&header_name) {
            None => value.to_string(),
            Some(existing) => {
                let existing = existing.to_str().map_err(|e| {
                    RestError::invalid_header(name, format!("existing value is not text: {}", e))
                })?;
                if existing.contains(value) {
                    return Ok(());
                }
                format!("{},{}", existing, value)
            }
        };

        self.headers.insert(header_name, parse_value(name, &merged)?);
        Ok(())
    }

    /// Sets header `name` to `value`, replacing any previous value.
    pub fn set(&mut self, name: &str, value: &str) -> RestResult<()> {
        let header_name = parse_name(name)?;
        self.headers.insert(header_name, parse_value(name, value)?);
        Ok(())
    }

    /// Removes header `name`.
    pub fn remove(&mut self, name: &str) {
        self.headers.remove(name);
    }

    /// Returns the value of header `name` if it is valid text.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns true if no header is set.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns the underlying header map.
    pub fn as_header_map(&self) -> &HeaderMap {
        &self.headers
    }
}

fn parse_name(name: &str) -> RestResult<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| RestError::invalid_header(name, e.to_string()))
}

fn parse_value(name: &str, value: &str) -> RestResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| RestError::invalid_header(name, e.to_string()))
}

/// One HTTP operation, built fresh for every call.
#[derive(Debug, Clone)]
pub struct RestRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Target URL
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body (if any)
    pub body: Option<Vec<u8>>,
}

impl RestRequest {
    /// Creates a request without body.
    pub fn new(method: HttpMethod, url: Url, headers: &RequestHeaders) -> Self {
        Self {
            method,
            url,
            headers: headers.as_header_map().clone(),
            body: None,
        }
    }

    /// Attaches a body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Returns the body as lossy UTF-8 for diagnostics.
    pub fn body_text(&self) -> String {
        self.body
            .as_deref()
            .map(|body| String::from_utf8_lossy(body).into_owned())
            .unwrap_or_default()
    }
}
