//! Decides which TLS validation errors may be overridden.
//!
//! Two overrides exist:
//! - a hostname mismatch is accepted when one of the certificate's Common
//!   Names equals the configured alternate server identity;
//! - a self-signed certificate is accepted when self-signed acceptance is on
//!   and the certificate matches the one pinned for its identity, or nothing
//!   is pinned yet and pinning it succeeds.
//!
//! Every other validation error is fatal.
//!
//! The alternate identity is compared character by character after Unicode
//! lowercasing, so `"Küche Hub"` matches `"KÜCHE HUB"`.
//!
//! Host names are checked by webpki against the subject alternative names
//! only; the Common Name is never used as a fallback. A certificate that
//! carries its host name in the Common Name alone therefore fails with
//! [`ValidationErrorKind::HostnameMismatch`] and needs the alternate identity
//! set to that name.

use rustls::CertificateError;
use std::fmt;
use tracing::{debug, error, warn};

use crate::tls::certificate::PeerCertificate;
use crate::tls::store::CertificateTrustStore;

/// Validation problem reported while establishing a TLS connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The certificate is not valid for the requested host name.
    HostnameMismatch,
    /// The certificate is signed by itself and no trusted root.
    SelfSigned,
    /// The issuer is not a trusted root.
    UnknownIssuer,
    /// The certificate has expired.
    Expired,
    /// The certificate is not valid yet.
    NotYetValid,
    /// The certificate was revoked.
    Revoked,
    /// A signature in the chain is invalid.
    BadSignature,
    /// Anything else.
    Other(String),
}

impl ValidationErrorKind {
    /// Classifies an error returned by a rustls certificate verifier.
    pub fn from_rustls(error: &rustls::Error) -> Self {
        match error {
            rustls::Error::InvalidCertificate(cert_error) => match cert_error {
                CertificateError::NotValidForName
                | CertificateError::NotValidForNameContext { .. } => Self::HostnameMismatch,
                CertificateError::UnknownIssuer => Self::UnknownIssuer,
                CertificateError::Expired | CertificateError::ExpiredContext { .. } => {
                    Self::Expired
                }
                CertificateError::NotValidYet | CertificateError::NotValidYetContext { .. } => {
                    Self::NotYetValid
                }
                CertificateError::Revoked => Self::Revoked,
                CertificateError::BadSignature => Self::BadSignature,
                other => Self::Other(format!("{:?}", other)),
            },
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostnameMismatch => write!(f, "Host name mismatch"),
            Self::SelfSigned => write!(f, "Self-signed certificate"),
            Self::UnknownIssuer => write!(f, "Unknown issuer"),
            Self::Expired => write!(f, "Certificate expired"),
            Self::NotYetValid => write!(f, "Certificate not yet valid"),
            Self::Revoked => write!(f, "Certificate revoked"),
            Self::BadSignature => write!(f, "Bad signature"),
            Self::Other(message) => write!(f, "{}", message),
        }
    }
}

/// Outcome of evaluating one validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustDecision {
    /// The evaluated problem.
    pub kind: ValidationErrorKind,
    /// True if the problem may be ignored.
    pub overridden: bool,
    /// Why.
    pub reason: String,
}

impl TrustDecision {
    fn overridden(kind: ValidationErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            overridden: true,
            reason: reason.into(),
        }
    }

    fn rejected(kind: ValidationErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            overridden: false,
            reason: reason.into(),
        }
    }
}

/// Evaluates validation errors against the configured overrides.
#[derive(Debug, Clone, Default)]
pub struct TlsPolicyEvaluator {
    alternate_identity: Option<String>,
    accept_self_signed: bool,
    store: Option<CertificateTrustStore>,
}

impl TlsPolicyEvaluator {
    /// Creates an evaluator. Without a store, self-signed certificates are
    /// never accepted.
    pub fn new(
        alternate_identity: Option<String>,
        accept_self_signed: bool,
        store: Option<CertificateTrustStore>,
    ) -> Self {
        Self {
            alternate_identity,
            accept_self_signed,
            store,
        }
    }

    /// Alternate identity accepted for host name mismatches.
    pub fn alternate_identity(&self) -> Option<&str> {
        self.alternate_identity.as_deref()
    }

    /// Whether self-signed certificates may be pinned.
    pub fn accepts_self_signed(&self) -> bool {
        self.accept_self_signed
    }

    /// Evaluates one validation error.
    pub fn evaluate(&self, kind: &ValidationErrorKind, certificate: &PeerCertificate) -> TrustDecision {
        let decision = match kind {
            ValidationErrorKind::HostnameMismatch => self.check_server_identity(certificate),
            ValidationErrorKind::SelfSigned => self.check_pinned_certificate(certificate),
            other => TrustDecision::rejected(other.clone(), "Validation error cannot be overridden"),
        };

        if decision.overridden {
            debug!(
                kind = %decision.kind,
                identity = certificate.identity().unwrap_or(""),
                reason = %decision.reason,
                "Ignoring TLS validation error"
            );
        } else {
            warn!(
                kind = %decision.kind,
                identity = certificate.identity().unwrap_or(""),
                reason = %decision.reason,
                "TLS validation error rejected"
            );
        }
        decision
    }

    /// Evaluates every error in order.
    ///
    /// Once one error is rejected, later self-signed errors are rejected
    /// without evaluation so that a failing connection never pins.
    pub fn evaluate_all(
        &self,
        kinds: &[ValidationErrorKind],
        certificate: &PeerCertificate,
    ) -> Vec<TrustDecision> {
        let mut decisions: Vec<TrustDecision> = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let rejected_before = decisions.iter().any(|d| !d.overridden);
            if rejected_before && *kind == ValidationErrorKind::SelfSigned {
                decisions.push(TrustDecision::rejected(
                    kind.clone(),
                    "Not evaluated, connection already rejected",
                ));
                continue;
            }
            decisions.push(self.evaluate(kind, certificate));
        }
        decisions
    }

    fn check_server_identity(&self, certificate: &PeerCertificate) -> TrustDecision {
        let kind = ValidationErrorKind::HostnameMismatch;
        let Some(alternate) = self.alternate_identity.as_deref() else {
            return TrustDecision::rejected(kind, "No alternate server identity configured");
        };

        let matched = certificate
            .common_names()
            .iter()
            .any(|name| same_identity(name, alternate));
        if matched {
            TrustDecision::overridden(kind, format!("Certificate names '{}'", alternate))
        } else {
            TrustDecision::rejected(
                kind,
                format!("Certificate does not name '{}'", alternate),
            )
        }
    }

    fn check_pinned_certificate(&self, certificate: &PeerCertificate) -> TrustDecision {
        let kind = ValidationErrorKind::SelfSigned;
        if !self.accept_self_signed {
            return TrustDecision::rejected(kind, "Self-signed certificates are not accepted");
        }
        let Some(store) = &self.store else {
            return TrustDecision::rejected(kind, "No certificate store available");
        };
        let Some(identity) = certificate.identity() else {
            return TrustDecision::rejected(kind, "Certificate has no Common Name");
        };

        match store.lookup(identity) {
            Ok(Some(pinned)) => {
                if pinned.matches(certificate) {
                    debug!(
                        identity = %identity,
                        "'Trust on first use' - Certificate received matches pinned certificate"
                    );
                    TrustDecision::overridden(kind, "Certificate matches pinned certificate")
                } else {
                    error!(
                        identity = %identity,
                        path = %pinned.path().display(),
                        "'Trust on first use' - Certificate received does not match pinned certificate"
                    );
                    TrustDecision::rejected(kind, "Certificate does not match pinned certificate")
                }
            }
            Ok(None) => {
                if store.store(identity, certificate) {
                    debug!(identity = %identity, "'Trust on first use' - Certificate pinned");
                    TrustDecision::overridden(kind, "Certificate pinned on first use")
                } else {
                    TrustDecision::rejected(kind, "Certificate could not be pinned")
                }
            }
            Err(e) => {
                error!(identity = %identity, error = %e, "Pinned certificate unreadable");
                TrustDecision::rejected(kind, format!("Pinned certificate unreadable: {}", e))
            }
        }
    }
}

fn same_identity(name: &str, other: &str) -> bool {
    name.chars()
        .flat_map(char::to_lowercase)
        .eq(other.chars().flat_map(char::to_lowercase))
}
