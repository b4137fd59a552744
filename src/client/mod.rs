//! Blocking REST client for one device.
//!
//! A [`RestClient`] owns the endpoint, the request headers shared by every
//! call, the TLS trust configuration and the executor. Verbs without an
//! explicit URL target the composed endpoint URL.

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::RestConfig;
use crate::endpoint::Endpoint;
use crate::errors::RestResult;
use crate::http::{
    HttpMethod, ReqwestTransport, RequestExecutor, RequestHeaders, Response, RestRequest,
    Transport,
};
use crate::tls::{CertificateTrustStore, TlsConfiguration};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Blocking REST client.
///
/// Calls must not be made from inside an async runtime.
#[derive(Debug)]
pub struct RestClient {
    endpoint: Endpoint,
    headers: RequestHeaders,
    tls: TlsConfiguration,
    executor: RequestExecutor,
    /// Set when the transport was injected; TLS changes then do not rebuild it.
    custom_transport: bool,
}

impl RestClient {
    /// Creates a client from `config`.
    pub fn new(config: RestConfig) -> RestResult<Self> {
        config.validate()?;
        let tls = TlsConfiguration::from_config(&config.tls)?;
        let transport = Arc::new(ReqwestTransport::new(&tls, config.timeout)?);
        Self::assemble(config, tls, transport, false)
    }

    /// Creates a client for `host:port` with default settings.
    pub fn for_host(host: impl Into<String>, port: u16) -> RestResult<Self> {
        Self::new(RestConfig::builder().host(host).port(port).build()?)
    }

    /// Creates a client from the `DEVICE_REST_*` environment variables.
    pub fn from_env() -> RestResult<Self> {
        Self::new(RestConfig::from_env()?)
    }

    /// Creates a client sending through `transport`.
    pub fn with_transport(config: RestConfig, transport: Arc<dyn Transport>) -> RestResult<Self> {
        config.validate()?;
        let tls = TlsConfiguration::from_config(&config.tls)?;
        Self::assemble(config, tls, transport, true)
    }

    fn assemble(
        config: RestConfig,
        tls: TlsConfiguration,
        transport: Arc<dyn Transport>,
        custom_transport: bool,
    ) -> RestResult<Self> {
        let endpoint = Endpoint::new(config.scheme, config.host, config.port, &config.base_path);
        let executor = RequestExecutor::new(transport, config.timeout)?;

        tracing::debug!(
            url = %endpoint.url().map(|url| url.to_string()).unwrap_or_default(),
            timeout_ms = config.timeout.as_millis() as u64,
            "Created REST client"
        );

        Ok(Self {
            endpoint,
            headers: RequestHeaders::new(),
            tls,
            executor,
            custom_transport,
        })
    }

    // Endpoint

    /// Returns the endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the endpoint for modification.
    pub fn endpoint_mut(&mut self) -> &mut Endpoint {
        &mut self.endpoint
    }

    /// Returns the composed target URL.
    pub fn url(&self) -> RestResult<Url> {
        self.endpoint.url()
    }

    /// Adopts scheme, host, port and path of `url`; see [`Endpoint::set_url`].
    pub fn set_url(&mut self, url: &Url) {
        self.endpoint.set_url(url);
    }

    /// Replaces the base path.
    pub fn set_base_path(&mut self, base_path: &str) {
        self.endpoint.set_base_path(base_path);
    }

    /// Replaces the resource path.
    pub fn set_path(&mut self, path: &str) {
        self.endpoint.set_path(path);
    }

    /// Appends to the resource path.
    pub fn append_path(&mut self, path: &str) {
        self.endpoint.append_path(path);
    }

    /// Clears the resource path.
    pub fn clear_path(&mut self) {
        self.endpoint.clear_path();
    }

    /// Replaces the query pairs.
    pub fn set_query<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.endpoint.set_query(pairs);
    }

    /// Sets the fragment.
    pub fn set_fragment(&mut self, fragment: impl Into<String>) {
        self.endpoint.set_fragment(fragment);
    }

    // Headers

    /// Merges `value` into header `name`; see [`RequestHeaders::merge`].
    pub fn set_header(&mut self, name: &str, value: &str) -> RestResult<()> {
        self.headers.merge(name, value)
    }

    /// Sets header `name` to `value`, replacing any previous value.
    pub fn set_raw_header(&mut self, name: &str, value: &str) -> RestResult<()> {
        self.headers.set(name, value)
    }

    /// Returns the headers sent with every request.
    pub fn headers(&self) -> &RequestHeaders {
        &self.headers
    }

    // Timeout and TLS

    /// Returns the operation timeout.
    pub fn timeout(&self) -> Duration {
        self.executor.timeout()
    }

    /// Sets the operation timeout.
    pub fn set_timeout(&mut self, timeout: Duration) -> RestResult<()> {
        self.executor.set_timeout(timeout);
        self.rebuild_transport()
    }

    /// Returns the TLS configuration.
    pub fn tls(&self) -> &TlsConfiguration {
        &self.tls
    }

    /// Trusts only the certificates of the PEM file at `path`.
    pub fn set_ca_certificate(&mut self, path: impl AsRef<Path>) -> RestResult<()> {
        self.tls.set_ca_certificate_file(path)?;
        self.rebuild_transport()
    }

    /// Accepts certificates naming `identity` in place of the host name.
    pub fn set_alternate_server_identity(&mut self, identity: impl Into<String>) -> RestResult<()> {
        self.tls.set_alternate_server_identity(Some(identity.into()));
        self.rebuild_transport()
    }

    /// Returns the alternate server identity.
    pub fn alternate_server_identity(&self) -> Option<&str> {
        self.tls.alternate_server_identity()
    }

    /// Enables or disables trust on first use of self-signed certificates.
    pub fn accept_self_signed_certificates(&mut self, accept: bool) -> RestResult<()> {
        self.tls.set_accept_self_signed(accept);
        self.rebuild_transport()
    }

    /// Pins certificates in `dir`.
    pub fn set_certificate_dir(&mut self, dir: impl AsRef<Path>) -> RestResult<()> {
        self.tls
            .set_trust_store(Some(CertificateTrustStore::new(dir.as_ref())));
        self.rebuild_transport()
    }

    fn rebuild_transport(&mut self) -> RestResult<()> {
        if self.custom_transport {
            return Ok(());
        }
        let transport = ReqwestTransport::new(&self.tls, self.executor.timeout())?;
        self.executor.set_transport(Arc::new(transport));
        Ok(())
    }

    // Verbs

    /// GET on the endpoint URL.
    pub fn get(&self) -> RestResult<Response> {
        Ok(self.get_url(self.url()?))
    }

    /// GET on `url`.
    pub fn get_url(&self, url: Url) -> Response {
        self.execute(HttpMethod::Get, url, None)
    }

    /// PUT of a JSON document on the endpoint URL.
    pub fn put_json(&self, body: &Value) -> RestResult<Response> {
        Ok(self.send_json(HttpMethod::Put, self.url()?, body))
    }

    /// PUT of text on the endpoint URL.
    pub fn put_text(&self, body: &str) -> RestResult<Response> {
        Ok(self.put_url(self.url()?, body))
    }

    /// PUT of raw bytes on `url`.
    pub fn put_url(&self, url: Url, body: impl Into<Vec<u8>>) -> Response {
        self.execute(HttpMethod::Put, url, Some(body.into()))
    }

    /// POST of a JSON document on the endpoint URL.
    pub fn post_json(&self, body: &Value) -> RestResult<Response> {
        Ok(self.send_json(HttpMethod::Post, self.url()?, body))
    }

    /// POST of text on the endpoint URL.
    pub fn post_text(&self, body: &str) -> RestResult<Response> {
        Ok(self.post_url(self.url()?, body))
    }

    /// POST of raw bytes on `url`.
    pub fn post_url(&self, url: Url, body: impl Into<Vec<u8>>) -> Response {
        self.execute(HttpMethod::Post, url, Some(body.into()))
    }

    /// DELETE on the endpoint URL.
    pub fn delete(&self) -> RestResult<Response> {
        Ok(self.delete_url(self.url()?))
    }

    /// DELETE on `url`.
    pub fn delete_url(&self, url: Url) -> Response {
        self.execute(HttpMethod::Delete, url, None)
    }

    fn send_json(&self, method: HttpMethod, url: Url, body: &Value) -> Response {
        // Value's Display is the compact encoding
        let mut request = RestRequest::new(method, url, &self.headers).with_body(body.to_string());
        if !request.headers.contains_key(CONTENT_TYPE) {
            request
                .headers
                .insert(CONTENT_TYPE, reqwest::header::HeaderValue::from_static(JSON_CONTENT_TYPE));
        }
        self.executor.execute(request)
    }

    fn execute(&self, method: HttpMethod, url: Url, body: Option<Vec<u8>>) -> Response {
        let mut request = RestRequest::new(method, url, &self.headers);
        request.body = body;
        self.executor.execute(request)
    }
}
