//! Error types for the device REST client.
//!
//! Two separate families live here:
//! - [`RestError`]: composition and configuration failures (bad URL, bad
//!   header, unreadable CA file). These are programmer/setup errors and are
//!   returned through [`RestResult`].
//! - [`TransportErrorKind`]: the classification carried inside every
//!   [`Response`](crate::http::Response). Runtime failures of a request are
//!   never returned as `Err`; they are folded into the response.

use std::fmt;
use thiserror::Error;

/// Result type for client setup and composition operations.
pub type RestResult<T> = Result<T, RestError>;

/// Errors raised while configuring the client or composing a request.
#[derive(Debug, Error)]
pub enum RestError {
    /// Configuration is invalid or incomplete.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// The endpoint could not be composed into a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header name or value is not valid HTTP.
    #[error("Invalid header {name}: {message}")]
    InvalidHeader {
        /// Header name as given by the caller.
        name: String,
        /// Why it was rejected.
        message: String,
    },

    /// A certificate could not be read or parsed.
    #[error("Certificate error: {message}")]
    Certificate {
        /// Description of the certificate problem.
        message: String,
    },

    /// File system access failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The rustls configuration could not be built.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The blocking runtime or HTTP client could not be created.
    #[error("Runtime error: {message}")]
    Runtime {
        /// Description of the failure.
        message: String,
    },
}

impl RestError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a certificate error.
    pub fn certificate(message: impl Into<String>) -> Self {
        Self::Certificate {
            message: message.into(),
        }
    }

    /// Creates a header error.
    pub fn invalid_header(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an I/O error bound to a path.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a runtime error.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }
}

/// Transport-level outcome classification carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportErrorKind {
    // Success
    /// The exchange completed without transport or HTTP error.
    #[default]
    None,

    // Connection errors
    /// The remote host refused the connection.
    ConnectionRefused,
    /// The host name could not be resolved.
    HostNotFound,
    /// The connection was closed or reset mid-exchange.
    ConnectionClosed,

    // Timeout
    /// The operation exceeded the configured timeout and was canceled.
    RequestTimeout,

    // TLS errors
    /// The TLS handshake failed, including rejected validation errors.
    TlsHandshakeFailed,

    // HTTP errors
    /// 401 from the server.
    AuthenticationRequired,
    /// 403 from the server.
    ContentAccessDenied,
    /// 404 from the server.
    ContentNotFound,
    /// 405 from the server.
    OperationNotPermitted,
    /// 409 from the server.
    ContentConflict,
    /// Any other 4xx status.
    ProtocolInvalidOperation,
    /// 5xx status.
    InternalServerError,

    // Generic
    /// Redirect from `https` to `http` refused.
    InsecureRedirect,
    /// Redirect chain longer than the follow limit.
    TooManyRedirects,
    /// Unclassified network failure.
    UnknownNetworkError,
}

impl TransportErrorKind {
    /// Maps an HTTP status code to the error kind a failed exchange carries.
    ///
    /// Returns `None` for statuses that do not indicate an error.
    pub fn from_status(status: u16) -> Option<Self> {
        let kind = match status {
            401 => Self::AuthenticationRequired,
            403 => Self::ContentAccessDenied,
            404 => Self::ContentNotFound,
            405 => Self::OperationNotPermitted,
            409 => Self::ContentConflict,
            400..=499 => Self::ProtocolInvalidOperation,
            500..=599 => Self::InternalServerError,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns true if this kind describes a failed exchange.
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns true if the operation was canceled by the timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout)
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "No error"),
            Self::ConnectionRefused => write!(f, "Connection refused"),
            Self::HostNotFound => write!(f, "Host not found"),
            Self::ConnectionClosed => write!(f, "Connection closed"),
            Self::RequestTimeout => write!(f, "Request timeout"),
            Self::TlsHandshakeFailed => write!(f, "TLS handshake failed"),
            Self::AuthenticationRequired => write!(f, "Authentication required"),
            Self::ContentAccessDenied => write!(f, "Content access denied"),
            Self::ContentNotFound => write!(f, "Content not found"),
            Self::OperationNotPermitted => write!(f, "Operation not permitted"),
            Self::ContentConflict => write!(f, "Content conflict"),
            Self::ProtocolInvalidOperation => write!(f, "Invalid operation"),
            Self::InternalServerError => write!(f, "Internal server error"),
            Self::InsecureRedirect => write!(f, "Insecure redirect"),
            Self::TooManyRedirects => write!(f, "Too many redirects"),
            Self::UnknownNetworkError => write!(f, "Unknown network error"),
        }
    }
}
