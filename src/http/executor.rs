//! Blocking execution of one HTTP operation.
//!
//! The executor owns a private current-thread tokio runtime. Each call drives
//! the transport future on that runtime under `tokio::time::timeout` and
//! returns once it completes or the deadline passes. The calling thread is the
//! only thing that blocks.
//!
//! `execute` must not be called from within an async context; tokio refuses
//! to start a runtime inside another one.

use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

use crate::errors::{RestError, RestResult};
use crate::http::request::RestRequest;
use crate::http::response::Response;
use crate::http::transport::Transport;
use crate::http::translator::{RawReply, ResponseTranslator};
use crate::observability::RequestLog;

/// Default timeout applied to a whole operation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Issues HTTP operations and waits for their outcome.
#[derive(Debug)]
pub struct RequestExecutor {
    runtime: Runtime,
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl RequestExecutor {
    /// Creates an executor over `transport`.
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> RestResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RestError::runtime(format!("Failed to start runtime: {}", e)))?;

        Ok(Self {
            runtime,
            transport,
            timeout,
        })
    }

    /// Returns the operation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sets the operation timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Replaces the transport, e.g. after the TLS configuration changed.
    pub fn set_transport(&mut self, transport: Arc<dyn Transport>) {
        self.transport = transport;
    }

    /// Executes `request` and blocks until it completes or times out.
    pub fn execute(&self, request: RestRequest) -> Response {
        let log = RequestLog::start(&request);
        let transport = Arc::clone(&self.transport);
        let reply = self.runtime.block_on(async move {
            match tokio::time::timeout(self.timeout, transport.send(request)).await {
                Ok(reply) => reply,
                Err(_) => RawReply::timed_out(),
            }
        });
        let response = ResponseTranslator::translate(reply);
        log.finish(&response);

        response
    }
}
