//! rustls certificate verifier applying the trust policy.
//!
//! Chain and name validation is done by webpki. When it fails, the failure is
//! broken down into individual validation problems and each one goes through
//! the [`TlsPolicyEvaluator`]. The handshake continues only if every problem
//! was overridden; otherwise the webpki error aborts it.
//!
//! webpki rejects a self-signed leaf before looking at its name or, for
//! CA-flagged and v1 certificates, before it even searches for an issuer.
//! Such a leaf is recognised from the certificate itself and its validity
//! period and names are then checked without building a chain.

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::{RestError, RestResult};
use crate::tls::certificate::PeerCertificate;
use crate::tls::policy::{TlsPolicyEvaluator, ValidationErrorKind};

/// Server certificate verifier with alternate-identity and TOFU overrides.
#[derive(Debug)]
pub struct PinningVerifier {
    inner: Arc<WebPkiServerVerifier>,
    policy: TlsPolicyEvaluator,
}

impl PinningVerifier {
    /// Creates a verifier trusting `roots`.
    pub fn new(
        roots: Arc<RootCertStore>,
        provider: Arc<CryptoProvider>,
        policy: TlsPolicyEvaluator,
    ) -> RestResult<Self> {
        let inner = WebPkiServerVerifier::builder_with_provider(roots, provider)
            .build()
            .map_err(|e| RestError::certificate(format!("Failed to build verifier: {}", e)))?;

        Ok(Self { inner, policy })
    }
}

/// Splits a webpki failure into the problems the policy evaluates.
///
/// The self-signed problem comes last, so a certificate is only pinned once
/// everything else was overridden.
fn validation_problems(
    error: &rustls::Error,
    certificate: &PeerCertificate,
    end_entity: &CertificateDer<'_>,
    server_name: &ServerName<'_>,
    now: UnixTime,
) -> Vec<ValidationErrorKind> {
    if !certificate.is_self_signed() || !is_missing_issuer(error) {
        return vec![ValidationErrorKind::from_rustls(error)];
    }

    let mut problems = Vec::new();
    if let Some(problem) = validity_problem(certificate, now) {
        problems.push(problem);
    }
    if let Some(problem) = name_problem(end_entity, server_name) {
        problems.push(problem);
    }
    problems.push(ValidationErrorKind::SelfSigned);
    problems
}

/// Returns true for the errors webpki reports on a self-signed leaf in place
/// of the missing issuer.
fn is_missing_issuer(error: &rustls::Error) -> bool {
    match error {
        rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer) => true,
        rustls::Error::InvalidCertificate(CertificateError::Other(other)) => matches!(
            other.0.downcast_ref::<webpki::Error>(),
            Some(webpki::Error::CaUsedAsEndEntity | webpki::Error::UnsupportedCertVersion)
        ),
        _ => false,
    }
}

fn validity_problem(certificate: &PeerCertificate, now: UnixTime) -> Option<ValidationErrorKind> {
    let now = i64::try_from(now.as_secs()).unwrap_or(i64::MAX);
    if now < certificate.not_before() {
        Some(ValidationErrorKind::NotYetValid)
    } else if now > certificate.not_after() {
        Some(ValidationErrorKind::Expired)
    } else {
        None
    }
}

/// Checks the subject alternative names. A certificate webpki cannot parse
/// as an end entity (v1) has none, so its name never matches.
fn name_problem(
    end_entity: &CertificateDer<'_>,
    server_name: &ServerName<'_>,
) -> Option<ValidationErrorKind> {
    let verified = webpki::EndEntityCert::try_from(end_entity)
        .and_then(|cert| cert.verify_is_valid_for_subject_name(server_name));
    match verified {
        Ok(()) => None,
        Err(e) => {
            debug!(host = %server_name.to_str(), error = ?e, "Server name not valid for certificate");
            Some(ValidationErrorKind::HostnameMismatch)
        }
    }
}

impl ServerCertVerifier for PinningVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let error = match self
            .inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
        {
            Ok(verified) => return Ok(verified),
            Err(error) => error,
        };

        let host = server_name.to_str();
        let certificate = match PeerCertificate::from_der(end_entity) {
            Ok(certificate) => certificate,
            Err(e) => {
                warn!(host = %host, error = %e, "Unparseable server certificate");
                return Err(error);
            }
        };

        let problems = validation_problems(&error, &certificate, end_entity, server_name, now);
        let decisions = self.policy.evaluate_all(&problems, &certificate);

        if decisions.iter().all(|decision| decision.overridden) {
            debug!(host = %host, errors = decisions.len(), "All TLS validation errors overridden");
            Ok(ServerCertVerified::assertion())
        } else {
            warn!(host = %host, error = %error, "TLS handshake rejected");
            Err(error)
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
