//! Hex and text form of certificate chains

use serde::{Deserialize, Serialize};

use crate::certificate::{Certificate, CertificateRole, CertificateStatus};
use crate::{Error, Result};

/// One certificate with its status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateSnapshot {
    /// DER contents as hex
    pub contents_hex: String,
    /// Verification status
    pub status: CertificateStatus,
}

impl CertificateSnapshot {
    /// Decode the certificate and restore its status
    pub fn to_certificate(&self, role: CertificateRole) -> Result<Certificate> {
        let contents = hex::decode(&self.contents_hex)
            .map_err(|_| Error::InvalidData("certificate contents are not hex"))?;
        let mut certificate = Certificate::new(role, contents)?;
        certificate.set_status(self.status);
        Ok(certificate)
    }
}

impl From<&Certificate> for CertificateSnapshot {
    fn from(certificate: &Certificate) -> Self {
        Self {
            contents_hex: certificate.to_hex(),
            status: certificate.status(),
        }
    }
}

/// The four chain certificates with their statuses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    /// Root certificate
    pub root: CertificateSnapshot,
    /// Citizen CA certificate
    pub ca: CertificateSnapshot,
    /// Authentication certificate
    pub authentication: CertificateSnapshot,
    /// Non-repudiation signature certificate
    pub signature: CertificateSnapshot,
}
