//! Persistent trust-on-first-use certificate store.
//!
//! One PEM file per server identity: `<dir>/<identity>.pem`. Files are written
//! once on first acceptance and never touched again; removing a file resets
//! trust for that identity.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::errors::{RestError, RestResult};
use crate::tls::certificate::PeerCertificate;

/// Application directory name below the platform data directory.
pub const APPLICATION_DIR: &str = "device-rest";

/// Directory holding pinned certificates below the application directory.
pub const CERTIFICATES_DIR: &str = "certificates";

const PEM_EXTENSION: &str = "pem";

/// A certificate previously pinned for an identity.
#[derive(Debug, Clone)]
pub struct PinnedCertificate {
    identity: String,
    path: PathBuf,
    certificate: PeerCertificate,
}

impl PinnedCertificate {
    /// Identity the certificate is pinned for.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// File holding the certificate.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The pinned certificate.
    pub fn certificate(&self) -> &PeerCertificate {
        &self.certificate
    }

    /// Returns true if `presented` is exactly the pinned certificate.
    pub fn matches(&self, presented: &PeerCertificate) -> bool {
        &self.certificate == presented
    }
}

/// Directory of pinned certificates keyed by identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateTrustStore {
    dir: PathBuf,
}

impl CertificateTrustStore {
    /// Creates a store rooted at `dir`. The directory is created on first
    /// write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns `<data dir>/device-rest/certificates`, if the platform has a
    /// data directory.
    pub fn default_location() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join(APPLICATION_DIR).join(CERTIFICATES_DIR))
    }

    /// Creates a store at [`default_location`](Self::default_location).
    pub fn at_default_location() -> Option<Self> {
        Self::default_location().map(Self::new)
    }

    /// Directory holding the certificate files.
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Returns the file used for `identity`.
    ///
    /// Identities that cannot be used as a plain file name are rejected.
    pub fn path_for(&self, identity: &str) -> RestResult<PathBuf> {
        let unusable = identity.is_empty()
            || identity == "."
            || identity == ".."
            || identity.contains(['/', '\\', '\0']);
        if unusable {
            return Err(RestError::certificate(format!(
                "Identity '{}' cannot be used as a certificate file name",
                identity
            )));
        }
        Ok(self.dir.join(format!("{}.{}", identity, PEM_EXTENSION)))
    }

    /// Looks up the certificate pinned for `identity`.
    ///
    /// Returns `Ok(None)` if nothing is pinned yet. A file that exists but
    /// cannot be read or parsed is an error.
    pub fn lookup(&self, identity: &str) -> RestResult<Option<PinnedCertificate>> {
        let path = self.path_for(identity)?;
        let contents = match fs::read(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RestError::io(path.display().to_string(), e)),
        };

        let certificate = PeerCertificate::from_pem(&contents)?;
        Ok(Some(PinnedCertificate {
            identity: identity.to_string(),
            path,
            certificate,
        }))
    }

    /// Pins `certificate` for `identity`.
    ///
    /// Returns false if the directory cannot be created, the identity is
    /// already pinned, or the PEM could not be written completely.
    pub fn store(&self, identity: &str, certificate: &PeerCertificate) -> bool {
        let path = match self.path_for(identity) {
            Ok(path) => path,
            Err(e) => {
                error!(identity = %identity, error = %e, "Cannot pin certificate");
                return false;
            }
        };

        if let Err(e) = fs::create_dir_all(&self.dir) {
            error!(
                directory = %self.dir.display(),
                error = %e,
                "Failed to create certificate directory"
            );
            return false;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to create certificate file");
                return false;
            }
        };

        let pem = certificate.to_pem();
        match file.write_all(pem.as_bytes()).and_then(|_| file.sync_all()) {
            Ok(()) => {
                debug!(identity = %identity, path = %path.display(), "Pinned certificate");
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to write certificate file");
                drop(file);
                // a truncated pin would lock the identity out for good
                let _ = fs::remove_file(&path);
                false
            }
        }
    }
}
