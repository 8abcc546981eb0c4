use chrono::{DateTime, Utc};

use super::{Certificate, CertificateRole};
use crate::commands::SignatureKind;
use crate::snapshot::{CertificateSnapshot, ChainSnapshot};
use crate::{Error, Result};

/// Root, CA, authentication and signature certificates of one card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateChain {
    root: Certificate,
    ca: Certificate,
    authentication: Certificate,
    signature: Certificate,
}

impl CertificateChain {
    /// Assemble a chain, checking each certificate sits in its role
    pub fn new(
        root: Certificate,
        ca: Certificate,
        authentication: Certificate,
        signature: Certificate,
    ) -> Result<Self> {
        let chain = Self {
            root,
            ca,
            authentication,
            signature,
        };
        let roles = [
            CertificateRole::Root,
            CertificateRole::Ca,
            CertificateRole::Authentication,
            CertificateRole::Signature,
        ];
        if chain.iter().zip(roles).any(|(cert, role)| cert.role() != role) {
            return Err(Error::InvalidData("certificate in the wrong chain position"));
        }
        Ok(chain)
    }

    /// Rebuild a chain, statuses included, from a snapshot
    pub fn from_snapshot(snapshot: &ChainSnapshot) -> Result<Self> {
        Self::new(
            snapshot.root.to_certificate(CertificateRole::Root)?,
            snapshot.ca.to_certificate(CertificateRole::Ca)?,
            snapshot.authentication.to_certificate(CertificateRole::Authentication)?,
            snapshot.signature.to_certificate(CertificateRole::Signature)?,
        )
    }

    /// Capture contents and statuses
    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            root: CertificateSnapshot::from(&self.root),
            ca: CertificateSnapshot::from(&self.ca),
            authentication: CertificateSnapshot::from(&self.authentication),
            signature: CertificateSnapshot::from(&self.signature),
        }
    }

    /// Root certificate
    pub const fn root(&self) -> &Certificate {
        &self.root
    }

    /// Citizen CA certificate
    pub const fn ca(&self) -> &Certificate {
        &self.ca
    }

    /// Authentication certificate
    pub const fn authentication(&self) -> &Certificate {
        &self.authentication
    }

    /// Non-repudiation signature certificate
    pub const fn signature(&self) -> &Certificate {
        &self.signature
    }

    /// Certificate holding `role`, if it is part of the chain
    pub const fn get(&self, role: CertificateRole) -> Option<&Certificate> {
        match role {
            CertificateRole::Root => Some(&self.root),
            CertificateRole::Ca => Some(&self.ca),
            CertificateRole::Authentication => Some(&self.authentication),
            CertificateRole::Signature => Some(&self.signature),
            CertificateRole::NationalRegister => None,
        }
    }

    /// Mutable certificate holding `role`, if it is part of the chain
    pub const fn get_mut(&mut self, role: CertificateRole) -> Option<&mut Certificate> {
        match role {
            CertificateRole::Root => Some(&mut self.root),
            CertificateRole::Ca => Some(&mut self.ca),
            CertificateRole::Authentication => Some(&mut self.authentication),
            CertificateRole::Signature => Some(&mut self.signature),
            CertificateRole::NationalRegister => None,
        }
    }

    /// Certificates from root to signature
    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        [&self.root, &self.ca, &self.authentication, &self.signature].into_iter()
    }

    /// Mutable certificates from root to signature
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Certificate> {
        [
            &mut self.root,
            &mut self.ca,
            &mut self.authentication,
            &mut self.signature,
        ]
        .into_iter()
    }

    /// Check the validity period of every certificate at `now`
    ///
    /// Every certificate is checked even after one fails.
    pub fn verify(&mut self, now: DateTime<Utc>) -> bool {
        self.iter_mut().fold(true, |valid, cert| cert.verify(now) && valid)
    }

    /// Check a SHA1withRSA signature made by the key for `kind`
    pub fn verify_signature(&self, data: &[u8], signature: &[u8], kind: SignatureKind) -> Result<bool> {
        let certificate = match kind {
            SignatureKind::Authentication => &self.authentication,
            SignatureKind::NonRepudiation => &self.signature,
        };
        certificate.verify_signed(data, signature)
    }
}
