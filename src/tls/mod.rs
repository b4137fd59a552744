//! TLS trust configuration.
//!
//! A [`TlsConfiguration`] is owned by each client. It carries the trusted
//! roots (webpki roots unless a CA certificate replaced them) and the override
//! policy, and turns both into a `rustls::ClientConfig` whose verifier is a
//! [`PinningVerifier`].

mod certificate;
mod policy;
mod store;
mod verifier;

pub use certificate::{pem_certificates, PeerCertificate};
pub use policy::{TlsPolicyEvaluator, TrustDecision, ValidationErrorKind};
pub use store::{CertificateTrustStore, PinnedCertificate, APPLICATION_DIR, CERTIFICATES_DIR};
pub use verifier::PinningVerifier;

use rustls::crypto::CryptoProvider;
use rustls::pki_types::CertificateDer;
use rustls::{ClientConfig, RootCertStore};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error};

use crate::config::TlsConfig;
use crate::errors::{RestError, RestResult};

/// Crypto provider used for every connection.
pub fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Trust configuration of one client.
#[derive(Debug, Clone, Default)]
pub struct TlsConfiguration {
    ca_certificates: Vec<CertificateDer<'static>>,
    alternate_server_identity: Option<String>,
    accept_self_signed: bool,
    trust_store: Option<CertificateTrustStore>,
}

impl TlsConfiguration {
    /// Creates a configuration with webpki roots and no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the configuration described by `config`.
    ///
    /// The trust store falls back to the platform data directory when no
    /// certificate directory is configured.
    pub fn from_config(config: &TlsConfig) -> RestResult<Self> {
        let mut tls = Self::new();
        if let Some(path) = &config.ca_cert_path {
            tls.set_ca_certificate_file(path)?;
        }
        tls.alternate_server_identity = config.alternate_server_identity.clone();
        tls.accept_self_signed = config.accept_self_signed;
        tls.trust_store = match &config.certificate_dir {
            Some(dir) => Some(CertificateTrustStore::new(dir)),
            None => CertificateTrustStore::at_default_location(),
        };
        Ok(tls)
    }

    /// Replaces the trusted roots with the certificates of a PEM file.
    pub fn set_ca_certificate_file(&mut self, path: impl AsRef<Path>) -> RestResult<()> {
        let path = path.as_ref();
        let contents = fs::read(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "Unable to open CA-Certificate file");
            RestError::io(path.display().to_string(), e)
        })?;

        let certificates = pem_certificates(&contents)?;
        if certificates.is_empty() {
            error!(path = %path.display(), "No certificate found in CA-Certificate file");
            return Err(RestError::certificate(format!(
                "No certificate found in {}",
                path.display()
            )));
        }

        debug!(path = %path.display(), count = certificates.len(), "Loaded CA certificates");
        self.ca_certificates = certificates;
        Ok(())
    }

    /// Replaces the trusted roots. An empty list restores the webpki roots.
    pub fn set_ca_certificates(&mut self, certificates: Vec<CertificateDer<'static>>) {
        self.ca_certificates = certificates;
    }

    /// Custom roots, empty when the webpki roots are used.
    pub fn ca_certificates(&self) -> &[CertificateDer<'static>] {
        &self.ca_certificates
    }

    /// Sets the identity accepted for host name mismatches.
    pub fn set_alternate_server_identity(&mut self, identity: Option<String>) {
        self.alternate_server_identity = identity;
    }

    /// Identity accepted for host name mismatches.
    pub fn alternate_server_identity(&self) -> Option<&str> {
        self.alternate_server_identity.as_deref()
    }

    /// Enables trust on first use of self-signed certificates.
    pub fn set_accept_self_signed(&mut self, accept: bool) {
        self.accept_self_signed = accept;
    }

    /// Whether self-signed certificates may be pinned.
    pub fn accepts_self_signed(&self) -> bool {
        self.accept_self_signed
    }

    /// Sets the store used for pinning.
    pub fn set_trust_store(&mut self, store: Option<CertificateTrustStore>) {
        self.trust_store = store;
    }

    /// Store used for pinning.
    pub fn trust_store(&self) -> Option<&CertificateTrustStore> {
        self.trust_store.as_ref()
    }

    /// Root store for chain validation.
    pub fn root_store(&self) -> RestResult<RootCertStore> {
        let mut roots = RootCertStore::empty();
        if self.ca_certificates.is_empty() {
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        } else {
            for certificate in &self.ca_certificates {
                roots.add(certificate.clone())?;
            }
        }
        Ok(roots)
    }

    /// Override policy of this configuration.
    pub fn policy(&self) -> TlsPolicyEvaluator {
        TlsPolicyEvaluator::new(
            self.alternate_server_identity.clone(),
            self.accept_self_signed,
            self.trust_store.clone(),
        )
    }

    /// Builds the rustls client configuration.
    pub fn client_config(&self) -> RestResult<ClientConfig> {
        let provider = crypto_provider();
        let verifier =
            PinningVerifier::new(Arc::new(self.root_store()?), Arc::clone(&provider), self.policy())?;

        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();
        Ok(config)
    }
}
