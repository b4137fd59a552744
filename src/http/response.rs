//! Structured response returned by every verb.

use serde_json::Value;
use std::collections::HashMap;

use crate::errors::TransportErrorKind;

/// Parsed response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The server returned no payload. This is a valid body.
    Empty,
    /// The payload parsed as a JSON document.
    Json(Value),
}

impl ResponseBody {
    /// Returns the JSON document, if any.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Empty => None,
            ResponseBody::Json(value) => Some(value),
        }
    }

    /// Returns true for the empty marker.
    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseBody::Empty)
    }
}

/// Outcome of one REST call.
///
/// Failures are not returned as `Err`; callers inspect
/// [`is_error`](Self::is_error) and [`error_reason`](Self::error_reason).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    http_status_code: u16,
    transport_error: TransportErrorKind,
    is_error: bool,
    error_reason: String,
    headers: HashMap<String, String>,
    body: Option<ResponseBody>,
}

impl Response {
    /// Creates an empty response with status code 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the HTTP status code, 0 if none was received.
    pub fn http_status_code(&self) -> u16 {
        self.http_status_code
    }

    /// Returns the transport classification.
    pub fn transport_error(&self) -> TransportErrorKind {
        self.transport_error
    }

    /// Returns true if the call failed at any layer.
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Returns the human readable failure reason, empty on success.
    pub fn error_reason(&self) -> &str {
        &self.error_reason
    }

    /// Returns all response headers keyed by lowercase name.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Returns a header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Returns the body; `None` when the call failed.
    pub fn body(&self) -> Option<&ResponseBody> {
        self.body.as_ref()
    }

    /// Returns the JSON body, if the call succeeded with a non-empty payload.
    pub fn json(&self) -> Option<&Value> {
        self.body.as_ref().and_then(ResponseBody::as_json)
    }

    pub(crate) fn set_http_status_code(&mut self, status: u16) {
        self.http_status_code = status;
    }

    pub(crate) fn set_transport_error(&mut self, kind: TransportErrorKind) {
        self.transport_error = kind;
    }

    pub(crate) fn set_error(&mut self, reason: impl Into<String>) {
        self.is_error = true;
        self.error_reason = reason.into();
    }

    /// Replaces the headers; on duplicates the last value wins.
    pub(crate) fn set_headers<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.headers.clear();
        for (name, value) in pairs {
            self.headers.insert(name.to_lowercase(), value);
        }
    }

    pub(crate) fn set_body(&mut self, body: ResponseBody) {
        self.body = Some(body);
    }
}
