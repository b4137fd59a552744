//! Integration tests for the device REST client.
//!
//! The client blocks, so servers run on their own multi-thread runtime and
//! the tests themselves are plain `#[test]` functions.

mod http;
mod tls_pinning;

use integrations_device_rest::{RestClient, RestConfig, TlsConfig};
use tokio::runtime::{Builder, Runtime};
use wiremock::{Mock, MockServer};

/// Background runtime for test servers.
pub fn server_runtime() -> Runtime {
    Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("Failed to build server runtime")
}

/// A wiremock server reachable from blocking code.
pub struct MockDevice {
    server: MockServer,
    runtime: Runtime,
}

impl MockDevice {
    pub fn start() -> Self {
        let runtime = server_runtime();
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime }
    }

    pub fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    pub fn received_requests(&self) -> Vec<wiremock::Request> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
    }

    pub fn client(&self) -> RestClient {
        self.client_with(TlsConfig::default())
    }

    pub fn client_with(&self, tls: TlsConfig) -> RestClient {
        let address = self.server.address();
        let config = RestConfig::builder()
            .host(address.ip().to_string())
            .port(address.port())
            .base_path("/api")
            .tls(tls)
            .build()
            .expect("Failed to build config");
        RestClient::new(config).expect("Failed to build client")
    }
}
