//! The caller's identity, as supplied by the hosting environment.

use sha2::{Digest, Sha256};
use std::fmt::Debug;

/// Issuer recorded for identities issued by a caller without one.
pub const DEFAULT_ISSUER: &str = "ledger-runtime";

/// Who is making the current call.
pub trait IdentityService: Send + Sync + Debug {
    /// Stable identifier of the caller's credential; `None` for anonymous calls.
    fn identifier(&self) -> Option<&str>;
    fn name(&self) -> Option<&str>;
    fn issuer(&self) -> Option<&str>;
    fn certificate(&self) -> Option<&str>;
}

/// A caller with no credential. Calls run without a participant.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl IdentityService for AnonymousIdentity {
    fn identifier(&self) -> Option<&str> {
        None
    }
    fn name(&self) -> Option<&str> {
        None
    }
    fn issuer(&self) -> Option<&str> {
        None
    }
    fn certificate(&self) -> Option<&str> {
        None
    }
}

/// A caller presenting a certificate issued under `name` by `issuer`.
#[derive(Debug, Clone)]
pub struct CertificateIdentity {
    name: String,
    issuer: String,
    certificate: String,
    identifier: String,
}

impl CertificateIdentity {
    pub fn new(name: &str, issuer: &str, certificate: &str) -> Self {
        Self {
            name: name.to_string(),
            issuer: issuer.to_string(),
            certificate: certificate.to_string(),
            identifier: certificate_fingerprint(certificate),
        }
    }
}

impl IdentityService for CertificateIdentity {
    fn identifier(&self) -> Option<&str> {
        Some(&self.identifier)
    }
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
    fn issuer(&self) -> Option<&str> {
        Some(&self.issuer)
    }
    fn certificate(&self) -> Option<&str> {
        Some(&self.certificate)
    }
}

/// Hex SHA-256 of a certificate's text.
pub fn certificate_fingerprint(certificate: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(certificate.trim().as_bytes());
    hex::encode(hasher.finalize())
}

/// ID of an identity that has been issued but not yet activated.
pub fn issued_identity_id(name: &str, issuer: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(issuer.as_bytes());
    hex::encode(hasher.finalize())
}
