//! Peer certificate wrapper used by the trust policy.

use pem::{EncodeConfig, LineEnding, Pem};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::CertificateDer;
use x509_parser::parse_x509_certificate;

use crate::errors::{RestError, RestResult};

const PEM_TAG: &str = "CERTIFICATE";

/// A certificate presented by a server, with the subject data the trust
/// policy needs.
///
/// Equality is exact DER equality.
#[derive(Debug, Clone)]
pub struct PeerCertificate {
    der: CertificateDer<'static>,
    common_names: Vec<String>,
    self_signed: bool,
    not_before: i64,
    not_after: i64,
}

impl PeerCertificate {
    /// Parses a DER certificate.
    pub fn from_der(der: &CertificateDer<'_>) -> RestResult<Self> {
        let (_, cert) = parse_x509_certificate(der.as_ref())
            .map_err(|e| RestError::certificate(format!("Failed to parse certificate: {}", e)))?;

        let common_names = cert
            .subject()
            .iter_common_name()
            .filter_map(|attribute| attribute.as_str().ok())
            .map(str::to_string)
            .collect();
        // an issuer name alone can be forged, the signature has to verify
        // against the certificate's own key
        let self_signed = cert.subject().as_raw() == cert.issuer().as_raw()
            && cert.verify_signature(None).is_ok();
        let validity = cert.validity();

        Ok(Self {
            der: der.clone().into_owned(),
            common_names,
            self_signed,
            not_before: validity.not_before.timestamp(),
            not_after: validity.not_after.timestamp(),
        })
    }

    /// Parses the first certificate of a PEM document.
    pub fn from_pem(pem: &[u8]) -> RestResult<Self> {
        let first = pem_certificates(pem)?
            .into_iter()
            .next()
            .ok_or_else(|| RestError::certificate("No certificate found in PEM data"))?;
        Self::from_der(&first)
    }

    /// Returns the identity used as pinning key: the first Common Name.
    pub fn identity(&self) -> Option<&str> {
        self.common_names.first().map(String::as_str)
    }

    /// Returns every Common Name of the subject.
    pub fn common_names(&self) -> &[String] {
        &self.common_names
    }

    /// Returns true if subject and issuer are the same name and the
    /// certificate is signed by its own key.
    ///
    /// Basic constraints and the X.509 version play no part, so CA-flagged
    /// and v1 certificates count as self-signed too.
    pub fn is_self_signed(&self) -> bool {
        self.self_signed
    }

    /// Start of the validity period, in seconds since the Unix epoch.
    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    /// End of the validity period, in seconds since the Unix epoch.
    pub fn not_after(&self) -> i64 {
        self.not_after
    }

    /// Returns the DER encoding.
    pub fn der(&self) -> &CertificateDer<'static> {
        &self.der
    }

    /// Encodes the certificate as PEM.
    pub fn to_pem(&self) -> String {
        pem::encode_config(
            &Pem::new(PEM_TAG, self.der.to_vec()),
            EncodeConfig::new().set_line_ending(LineEnding::LF),
        )
    }
}

impl PartialEq for PeerCertificate {
    fn eq(&self, other: &Self) -> bool {
        self.der.as_ref() == other.der.as_ref()
    }
}

impl Eq for PeerCertificate {}

/// Reads every certificate of a PEM document.
pub fn pem_certificates(pem: &[u8]) -> RestResult<Vec<CertificateDer<'static>>> {
    CertificateDer::pem_slice_iter(pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| RestError::certificate(format!("Invalid PEM data: {}", e)))
}
