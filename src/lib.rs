//! # Device REST Integration Library
//!
//! A blocking REST client for devices on the local network with:
//! - Endpoint composition (scheme, host, port, base path, path, query, fragment)
//! - One call per operation with a client-wide timeout
//! - Uniform [`Response`] values carrying status, headers, JSON body and a
//!   human-readable error reason with status advisories
//! - TLS with an alternate server identity for certificates that do not name
//!   the host, and trust on first use for self-signed certificates
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use integrations_device_rest::{RestClient, RestConfig, TlsConfig};
//! use serde_json::json;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RestConfig::builder()
//!         .host("192.168.1.20")
//!         .port(443)
//!         .base_path("/clip/v2")
//!         .tls(
//!             TlsConfig::builder()
//!                 .alternate_server_identity("Hue Bridge")
//!                 .accept_self_signed(true)
//!                 .build(),
//!         )
//!         .build()?;
//!
//!     let mut client = RestClient::new(config)?;
//!     client.set_raw_header("hue-application-key", "app-key")?;
//!     client.set_path("resource/light");
//!
//!     let response = client.put_json(&json!({"on": {"on": true}}))?;
//!     if response.is_error() {
//!         eprintln!("{}", response.error_reason());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;

// Request composition
pub mod endpoint;

// HTTP layer
pub mod http;

// TLS trust
pub mod tls;

// Observability
pub mod observability;

// Client
pub mod client;

// Mocks for testing
pub mod mocks;

// Re-exports for convenience
pub use client::RestClient;
pub use config::{RestConfig, RestConfigBuilder, TlsConfig, TlsConfigBuilder};
pub use endpoint::{append_path, join_path, Endpoint};
pub use errors::{RestError, RestResult, TransportErrorKind};
pub use http::{HttpMethod, RawReply, RequestExecutor, Response, ResponseBody, Transport};
pub use observability::init_tracing;
pub use tls::{
    CertificateTrustStore, PeerCertificate, PinnedCertificate, TlsConfiguration,
    TlsPolicyEvaluator, TrustDecision, ValidationErrorKind,
};
