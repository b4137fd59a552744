//! Logging support.
//!
//! The crate only emits `tracing` events. Applications install their own
//! subscriber, or call [`init_tracing`] for a plain fmt subscriber.

use std::time::{Duration, Instant};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::http::{HttpMethod, RestRequest};
use crate::http::Response;

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info";

/// Installs a fmt subscriber filtered by `RUST_LOG`.
///
/// Returns false if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

/// Per-request debug record: method, URL and body when the request starts,
/// duration and outcome when it finishes.
#[derive(Debug)]
pub struct RequestLog {
    method: HttpMethod,
    url: String,
    body: String,
    started: Instant,
}

impl RequestLog {
    /// Captures `request` and starts the clock.
    pub fn start(request: &RestRequest) -> Self {
        Self {
            method: request.method,
            url: request.url.to_string(),
            body: request.body_text(),
            started: Instant::now(),
        }
    }

    /// Time since the request started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Emits the record for `response` and returns the request duration.
    pub fn finish(self, response: &Response) -> Duration {
        let elapsed = self.started.elapsed();
        let status = response.http_status_code();

        debug!(
            method = %self.method,
            elapsed_ms = elapsed.as_millis() as u64,
            status,
            url = %self.url,
            body = %self.body,
            "{} took {}ms, HTTP {}",
            self.method,
            elapsed.as_millis(),
            status
        );
        if response.is_error() {
            debug!(
                method = %self.method,
                url = %self.url,
                transport_error = %response.transport_error(),
                reason = %response.error_reason(),
                "Request failed"
            );
        }
        elapsed
    }
}
