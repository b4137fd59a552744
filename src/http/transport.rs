//! Transport layer abstraction for HTTP communication.
//!
//! The default implementation uses reqwest over a rustls configuration that
//! carries the pinning verifier. Implementations never fail with `Err`: every
//! outcome, including connection and TLS errors, is reported as a [`RawReply`].

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use crate::errors::{RestError, RestResult, TransportErrorKind};
use crate::http::request::RestRequest;
use crate::http::translator::RawReply;
use crate::tls::TlsConfiguration;

/// Maximum number of redirects followed for one request.
pub const MAX_REDIRECTS: usize = 10;

/// Trait for HTTP transport implementations.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Performs one exchange and reports everything observed.
    async fn send(&self, request: RestRequest) -> RawReply;
}

/// Reqwest-based transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport using `tls` for every HTTPS connection.
    pub fn new(tls: &TlsConfiguration, timeout: Duration) -> RestResult<Self> {
        let client = Client::builder()
            .use_preconfigured_tls(tls.client_config()?)
            .timeout(timeout)
            .redirect(no_less_safe_redirects())
            .build()
            .map_err(|e| RestError::runtime(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn exchange(&self, request: RestRequest) -> Result<RawReply, reqwest::Error> {
        let mut builder = self
            .client
            .request(request.method.to_reqwest(), request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        let mut reply = match TransportErrorKind::from_status(status) {
            Some(_) => RawReply::http_error(status, body),
            None => RawReply::new(status, body),
        };
        reply.headers = headers;
        Ok(reply)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: RestRequest) -> RawReply {
        match self.exchange(request).await {
            Ok(reply) => reply,
            Err(error) => reply_from_error(&error),
        }
    }
}

/// Why a redirect was not followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedirectRefused {
    TooMany,
    Downgrade,
}

impl fmt::Display for RedirectRefused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooMany => write!(f, "more than {} redirects", MAX_REDIRECTS),
            Self::Downgrade => write!(f, "refusing redirect from https to http"),
        }
    }
}

impl StdError for RedirectRefused {}

impl From<RedirectRefused> for TransportErrorKind {
    fn from(refused: RedirectRefused) -> Self {
        match refused {
            RedirectRefused::TooMany => TransportErrorKind::TooManyRedirects,
            RedirectRefused::Downgrade => TransportErrorKind::InsecureRedirect,
        }
    }
}

/// Follows redirects but never from `https` down to `http`.
fn no_less_safe_redirects() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error(RedirectRefused::TooMany);
        }
        let downgrade = attempt.url().scheme() == "http"
            && attempt
                .previous()
                .last()
                .map(|previous| previous.scheme() == "https")
                .unwrap_or(false);
        if downgrade {
            attempt.error(RedirectRefused::Downgrade)
        } else {
            attempt.follow()
        }
    })
}

fn redirect_refusal(error: &reqwest::Error) -> Option<RedirectRefused> {
    let mut current = error.source();
    while let Some(err) = current {
        if let Some(refused) = err.downcast_ref::<RedirectRefused>() {
            return Some(*refused);
        }
        current = err.source();
    }
    None
}

/// Classifies a reqwest failure that happened before a complete reply.
fn reply_from_error(error: &reqwest::Error) -> RawReply {
    let message = error_chain(error);

    if error.is_timeout() {
        return RawReply::timed_out();
    }

    if let Some(status) = error.status() {
        return RawReply::http_error(status.as_u16(), Vec::new());
    }

    let kind = if let Some(refused) = redirect_refusal(error) {
        refused.into()
    } else if is_tls_failure(error) {
        TransportErrorKind::TlsHandshakeFailed
    } else if error.is_connect() {
        classify_connect(&message)
    } else if error.is_body() || error.is_decode() {
        TransportErrorKind::ConnectionClosed
    } else {
        TransportErrorKind::UnknownNetworkError
    };

    RawReply::failed(kind, message)
}

fn classify_connect(message: &str) -> TransportErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("refused") {
        TransportErrorKind::ConnectionRefused
    } else if lower.contains("dns") || lower.contains("lookup") || lower.contains("resolve") {
        TransportErrorKind::HostNotFound
    } else {
        TransportErrorKind::UnknownNetworkError
    }
}

// rustls errors arrive wrapped in io::Error, whose `source()` skips the
// wrapped value, so each io::Error is unwrapped by hand.
fn is_tls_failure(error: &reqwest::Error) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = current {
        if err.is::<rustls::Error>() {
            return true;
        }
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if io.get_ref().map(|inner| inner.is::<rustls::Error>()).unwrap_or(false) {
                return true;
            }
        }
        current = err.source();
    }
    false
}

/// Joins the error and its sources, most specific last.
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut current = error.source();
    while let Some(source) = current {
        let text = source.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        current = source.source();
    }
    message
}
