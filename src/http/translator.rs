//! Translation of raw transport outcomes into [`Response`] values.

use crate::errors::TransportErrorKind;
use crate::http::response::{Response, ResponseBody};

/// Reason reported when the timeout canceled the request.
pub const TIMEOUT_REASON: &str = "Network request timeout error";

/// Transport-level failure of an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    /// Classification.
    pub kind: TransportErrorKind,
    /// Transport layer's own description.
    pub message: String,
}

impl TransportFailure {
    /// Creates a failure.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Everything the transport observed for one exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawReply {
    /// HTTP status, 0 if none was received.
    pub status: u16,
    /// Reason phrase that accompanied the status.
    pub reason_phrase: String,
    /// Headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Payload bytes.
    pub body: Vec<u8>,
    /// Transport failure, `None` for a clean exchange.
    pub failure: Option<TransportFailure>,
}

impl RawReply {
    /// Creates a clean reply.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason_phrase: canonical_reason(status).to_string(),
            body: body.into(),
            ..Default::default()
        }
    }

    /// Creates a reply for an HTTP error status. The failure kind follows the
    /// status.
    pub fn http_error(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let kind = TransportErrorKind::from_status(status)
            .unwrap_or(TransportErrorKind::ProtocolInvalidOperation);
        let reason = canonical_reason(status);
        Self {
            failure: Some(TransportFailure::new(
                kind,
                format!("Server replied: {}", reason),
            )),
            ..Self::new(status, body)
        }
    }

    /// Creates a reply for a failure before any status was received.
    pub fn failed(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            failure: Some(TransportFailure::new(kind, message)),
            ..Default::default()
        }
    }

    /// Creates the reply for an operation canceled by the timeout.
    pub fn timed_out() -> Self {
        Self::failed(TransportErrorKind::RequestTimeout, "Operation canceled")
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Returns the standard reason phrase of `status`, empty if unknown.
pub fn canonical_reason(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("")
}

/// Builds [`Response`] values from transport outcomes.
pub struct ResponseTranslator;

impl ResponseTranslator {
    /// Translates one raw reply.
    pub fn translate(reply: RawReply) -> Response {
        let mut response = Response::new();
        response.set_http_status_code(reply.status);
        response.set_headers(reply.headers);

        match reply.failure {
            None => {
                if reply.body.is_empty() {
                    response.set_body(ResponseBody::Empty);
                } else {
                    match serde_json::from_slice(&reply.body) {
                        Ok(document) => response.set_body(ResponseBody::Json(document)),
                        Err(e) => response.set_error(e.to_string()),
                    }
                }
            }
            Some(failure) => {
                response.set_transport_error(failure.kind);

                let reason = if failure.kind.is_timeout() {
                    TIMEOUT_REASON.to_string()
                } else if reply.status > 0 {
                    let advice = advisory(reply.status, &reply.reason_phrase, &response);
                    format!("[{} {}] - {}", reply.status, reply.reason_phrase, advice)
                } else {
                    failure.message
                };
                response.set_error(reason);
            }
        }

        response
    }
}

/// Returns the hint attached to an HTTP error status.
///
/// 429 carries the server's `Retry-After` value when present and nothing
/// otherwise.
pub fn advisory(status: u16, reason_phrase: &str, response: &Response) -> String {
    match status {
        400 => "Check Request Body".to_string(),
        401 => "Check Authorization Token (API Key)".to_string(),
        403 => "No permission to access the given resource".to_string(),
        404 => "Check Resource given".to_string(),
        429 => match response.header("Retry-After") {
            Some(retry_after) if !retry_after.is_empty() => format!("Retry-After: {}", retry_after),
            _ => String::new(),
        },
        _ => reason_phrase.to_string(),
    }
}
