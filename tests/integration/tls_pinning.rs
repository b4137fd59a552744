//! TLS trust against a minimal HTTPS device built on tokio-rustls.

use super::*;
use integrations_device_rest::{PeerCertificate, TransportErrorKind};
use rcgen::{BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use wiremock::matchers::any;
use wiremock::ResponseTemplate;

const DEVICE_NAME: &str = "device.local";
const REPLY: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 11\r\nConnection: close\r\n\r\n{\"ok\":true}";

fn params(common_name: &str, names: &[&str]) -> CertificateParams {
    let mut params =
        CertificateParams::new(names.iter().map(|name| name.to_string()).collect::<Vec<_>>())
            .unwrap();
    let mut distinguished_name = DistinguishedName::new();
    distinguished_name.push(DnType::CommonName, common_name);
    params.distinguished_name = distinguished_name;
    params
}

fn self_signed(common_name: &str) -> (Certificate, KeyPair) {
    let key = KeyPair::generate().unwrap();
    let cert = params(common_name, &[common_name]).self_signed(&key).unwrap();
    (cert, key)
}

/// HTTPS server answering every request with the same raw HTTP reply.
struct TlsDevice {
    port: u16,
    _runtime: tokio::runtime::Runtime,
}

impl TlsDevice {
    /// Starts a device replying `{"ok":true}`.
    fn start(chain: Vec<CertificateDer<'static>>, key: &KeyPair) -> Self {
        Self::start_with_reply(chain, key, REPLY)
    }

    fn start_with_reply(
        chain: Vec<CertificateDer<'static>>,
        key: &KeyPair,
        reply: impl Into<Arc<str>>,
    ) -> Self {
        let reply = reply.into();
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der()));
        let config = rustls::ServerConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(chain, key)
        .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let runtime = server_runtime();
        let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
        let port = listener.local_addr().unwrap().port();

        runtime.spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let reply = Arc::clone(&reply);
                tokio::spawn(async move {
                    let Ok(mut tls) = acceptor.accept(stream).await else {
                        return;
                    };
                    let mut request = Vec::new();
                    let mut buffer = [0u8; 1024];
                    while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                        match tls.read(&mut buffer).await {
                            Ok(0) | Err(_) => return,
                            Ok(read) => request.extend_from_slice(&buffer[..read]),
                        }
                    }
                    let _ = tls.write_all(reply.as_bytes()).await;
                    let _ = tls.shutdown().await;
                });
            }
        });

        Self {
            port,
            _runtime: runtime,
        }
    }

    fn client(&self, tls: TlsConfig) -> RestClient {
        let config = RestConfig::builder()
            .scheme("https")
            .host("127.0.0.1")
            .port(self.port)
            .tls(tls)
            .build()
            .unwrap();
        RestClient::new(config).unwrap()
    }
}

fn tofu(dir: &Path) -> TlsConfig {
    TlsConfig::builder()
        .alternate_server_identity(DEVICE_NAME)
        .accept_self_signed(true)
        .certificate_dir(dir)
        .build()
}

#[test]
fn test_trust_on_first_use() {
    let dir = TempDir::new().unwrap();
    let pin = dir.path().join(format!("{}.pem", DEVICE_NAME));
    let (cert, key) = self_signed(DEVICE_NAME);
    let device = TlsDevice::start(vec![cert.der().clone()], &key);

    let first = device.client(tofu(dir.path())).get().unwrap();
    assert!(!first.is_error(), "{}", first.error_reason());
    assert_eq!(first.json(), Some(&json!({"ok": true})));
    let pinned = fs::read(&pin).unwrap();

    let second = device.client(tofu(dir.path())).get().unwrap();
    assert!(!second.is_error(), "{}", second.error_reason());
    assert_eq!(fs::read(&pin).unwrap(), pinned);
}

#[test]
fn test_ca_flagged_self_signed_device_is_pinned() {
    let dir = TempDir::new().unwrap();
    let pin = dir.path().join(format!("{}.pem", DEVICE_NAME));
    let key = KeyPair::generate().unwrap();
    let mut device_params = params(DEVICE_NAME, &[DEVICE_NAME]);
    device_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let cert = device_params.self_signed(&key).unwrap();
    let device = TlsDevice::start(vec![cert.der().clone()], &key);

    let first = device.client(tofu(dir.path())).get().unwrap();
    assert!(!first.is_error(), "{}", first.error_reason());
    assert_eq!(first.json(), Some(&json!({"ok": true})));
    let pinned = PeerCertificate::from_pem(&fs::read(&pin).unwrap()).unwrap();
    assert_eq!(pinned.der().as_ref(), cert.der().as_ref());

    let second = device.client(tofu(dir.path())).get().unwrap();
    assert!(!second.is_error(), "{}", second.error_reason());
}

#[test]
fn test_redirect_to_plain_http_is_refused() {
    let dir = TempDir::new().unwrap();
    let target = MockDevice::start();
    target.mount(Mock::given(any()).respond_with(ResponseTemplate::new(200)));

    let redirect = format!(
        "HTTP/1.1 302 Found\r\nLocation: {}/api/state\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        target.server.uri()
    );
    let (cert, key) = self_signed(DEVICE_NAME);
    let device = TlsDevice::start_with_reply(vec![cert.der().clone()], &key, redirect);

    let response = device.client(tofu(dir.path())).get().unwrap();

    assert!(response.is_error());
    assert_eq!(response.http_status_code(), 0);
    assert_eq!(response.transport_error(), TransportErrorKind::InsecureRedirect);
    assert!(target.received_requests().is_empty());
}

#[test]
fn test_replaced_certificate_is_rejected() {
    let dir = TempDir::new().unwrap();
    let pin = dir.path().join(format!("{}.pem", DEVICE_NAME));

    let (cert, key) = self_signed(DEVICE_NAME);
    let original = TlsDevice::start(vec![cert.der().clone()], &key);
    assert!(!original.client(tofu(dir.path())).get().unwrap().is_error());
    let pinned = fs::read(&pin).unwrap();

    let (impostor_cert, impostor_key) = self_signed(DEVICE_NAME);
    let impostor = TlsDevice::start(vec![impostor_cert.der().clone()], &impostor_key);
    let response = impostor.client(tofu(dir.path())).get().unwrap();

    assert!(response.is_error());
    assert_eq!(response.http_status_code(), 0);
    assert_eq!(response.transport_error(), TransportErrorKind::TlsHandshakeFailed);
    assert_eq!(fs::read(&pin).unwrap(), pinned);
}

#[test]
fn test_self_signed_rejected_without_acceptance() {
    let dir = TempDir::new().unwrap();
    let (cert, key) = self_signed(DEVICE_NAME);
    let device = TlsDevice::start(vec![cert.der().clone()], &key);

    let tls = TlsConfig::builder()
        .alternate_server_identity(DEVICE_NAME)
        .certificate_dir(dir.path())
        .build();
    let response = device.client(tls).get().unwrap();

    assert!(response.is_error());
    assert_eq!(response.transport_error(), TransportErrorKind::TlsHandshakeFailed);
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn test_hostname_mismatch_without_alternate_identity() {
    let dir = TempDir::new().unwrap();
    let (cert, key) = self_signed(DEVICE_NAME);
    let device = TlsDevice::start(vec![cert.der().clone()], &key);

    let tls = TlsConfig::builder()
        .accept_self_signed(true)
        .certificate_dir(dir.path())
        .build();
    let response = device.client(tls).get().unwrap();

    assert!(response.is_error());
    assert!(!dir.path().join(format!("{}.pem", DEVICE_NAME)).exists());
}

#[test]
fn test_custom_ca_certificate() {
    let dir = TempDir::new().unwrap();

    let ca_key = KeyPair::generate().unwrap();
    let mut ca_params = params("Device Test CA", &[]);
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let ca = ca_params.self_signed(&ca_key).unwrap();
    let ca_path = dir.path().join("ca.pem");
    fs::write(&ca_path, ca.pem()).unwrap();

    let leaf_key = KeyPair::generate().unwrap();
    let leaf = params(DEVICE_NAME, &["127.0.0.1"])
        .signed_by(&leaf_key, &ca, &ca_key)
        .unwrap();
    let device = TlsDevice::start(vec![leaf.der().clone()], &leaf_key);

    let untrusted = device.client(TlsConfig::default()).get().unwrap();
    assert_eq!(untrusted.transport_error(), TransportErrorKind::TlsHandshakeFailed);

    let trusted = device
        .client(TlsConfig::builder().ca_cert_path(&ca_path).build())
        .get()
        .unwrap();
    assert!(!trusted.is_error(), "{}", trusted.error_reason());
    assert_eq!(trusted.json(), Some(&json!({"ok": true})));
}
