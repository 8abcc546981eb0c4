//! Certificates stored on the card and their verification state

mod anchors;
mod chain;
mod status;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use derive_more::Display;
use tracing::debug;
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::{DistributionPointName, GeneralName, ParsedExtension};
use x509_parser::oid_registry::OID_PKIX_ACCESS_DESCRIPTOR_OCSP;
use x509_parser::parse_x509_certificate;
use x509_parser::x509::{AttributeTypeAndValue, X509Name};

pub use anchors::TrustAnchors;
pub use chain::CertificateChain;
pub use status::CertificateStatus;

use crate::constants::{FileId, NATIONAL_REGISTER_NAME, files};
use crate::crypto;
use crate::{Error, Result};

/// Role of a certificate on the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CertificateRole {
    /// Belgium root CA
    #[display("Root")]
    Root,
    /// Citizen CA
    #[display("CA")]
    Ca,
    /// Citizen authentication
    #[display("Authentication")]
    Authentication,
    /// Citizen non-repudiation signature
    #[display("Signature")]
    Signature,
    /// National register, signer of the identity and address records
    #[display("RN")]
    NationalRegister,
}

impl CertificateRole {
    /// Every role, in chain order
    pub const ALL: [Self; 5] = [
        Self::Root,
        Self::Ca,
        Self::Authentication,
        Self::Signature,
        Self::NationalRegister,
    ];

    /// File holding the certificate
    pub const fn file(&self) -> FileId {
        match self {
            Self::Root => files::ROOT_CERTIFICATE,
            Self::Ca => files::CA_CERTIFICATE,
            Self::Authentication => files::AUTHENTICATION_CERTIFICATE,
            Self::Signature => files::SIGNATURE_CERTIFICATE,
            Self::NationalRegister => files::NATIONAL_REGISTER_CERTIFICATE,
        }
    }
}

/// Outcome of evaluating a certificate at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Status the certificate moves to
    pub status: CertificateStatus,
    /// Whether the certificate is acceptable
    pub valid: bool,
}

/// A DER certificate with its role and verification status
#[derive(Debug, Clone)]
pub struct Certificate {
    role: CertificateRole,
    contents: Bytes,
    status: CertificateStatus,
    subject: String,
    issuer: String,
    subject_der: Bytes,
    issuer_der: Bytes,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    serial: Bytes,
    public_key: Bytes,
    public_key_bits: Bytes,
    ocsp_url: Option<String>,
    crl_url: Option<String>,
    rn_name: String,
}

impl Certificate {
    /// Decode a DER certificate
    pub fn new(role: CertificateRole, contents: impl Into<Bytes>) -> Result<Self> {
        let contents = contents.into();
        let (_, cert) = parse_x509_certificate(&contents)?;

        let validity = cert.validity();
        let not_before = timestamp(validity.not_before.timestamp())?;
        let not_after = timestamp(validity.not_after.timestamp())?;
        let spki = cert.public_key();

        let certificate = Self {
            role,
            status: CertificateStatus::NotValidated,
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            subject_der: Bytes::copy_from_slice(cert.subject().as_raw()),
            issuer_der: Bytes::copy_from_slice(cert.issuer().as_raw()),
            not_before,
            not_after,
            serial: Bytes::copy_from_slice(cert.raw_serial()),
            public_key: Bytes::copy_from_slice(spki.raw),
            public_key_bits: Bytes::copy_from_slice(&spki.subject_public_key.data),
            ocsp_url: ocsp_url(&cert),
            crl_url: crl_url(&cert),
            rn_name: national_register_name(cert.subject()),
            contents: contents.clone(),
        };

        Ok(certificate)
    }

    /// Role of the certificate
    pub const fn role(&self) -> CertificateRole {
        self.role
    }

    /// DER contents
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// DER contents as lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(&self.contents)
    }

    /// Current verification status
    pub const fn status(&self) -> CertificateStatus {
        self.status
    }

    /// Overwrite the verification status
    pub const fn set_status(&mut self, status: CertificateStatus) {
        self.status = status;
    }

    /// Subject distinguished name
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer distinguished name
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// DER encoding of the subject name
    pub fn subject_der(&self) -> &[u8] {
        &self.subject_der
    }

    /// DER encoding of the issuer name
    pub fn issuer_der(&self) -> &[u8] {
        &self.issuer_der
    }

    /// Start of validity
    pub const fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    /// End of validity
    pub const fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Serial number as big-endian bytes
    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    /// DER SubjectPublicKeyInfo
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Contents of the subjectPublicKey bit string
    pub fn public_key_bits(&self) -> &[u8] {
        &self.public_key_bits
    }

    /// OCSP responder from the authority information access extension
    pub fn ocsp_url(&self) -> Option<&str> {
        self.ocsp_url.as_deref()
    }

    /// First URI of the CRL distribution points extension
    pub fn crl_url(&self) -> Option<&str> {
        self.crl_url.as_deref()
    }

    /// Whether subject and issuer are the same name
    pub fn is_self_signed(&self) -> bool {
        self.subject_der == self.issuer_der
    }

    /// Status the certificate would move to when checked at `now`
    pub fn evaluate(&self, now: DateTime<Utc>) -> Verdict {
        let (status, valid) = if self.status.is_ok() {
            (CertificateStatus::ValidatedOk, true)
        } else if now < self.not_before {
            (CertificateStatus::CertNotYetValid, false)
        } else if now > self.not_after {
            (CertificateStatus::CertHasExpired, false)
        } else {
            (self.status, true)
        };
        Verdict { status, valid }
    }

    /// Check the validity period at `now`, updating the status
    pub fn verify(&mut self, now: DateTime<Utc>) -> bool {
        let verdict = self.evaluate(now);
        if verdict.status != self.status {
            debug!(role = %self.role, from = %self.status, to = %verdict.status, "Certificate status changed");
        }
        self.status = verdict.status;
        verdict.valid
    }

    /// Check the validity period and the national register subject
    pub fn verify_national_register(&mut self, now: DateTime<Utc>) -> bool {
        self.verify(now) && self.rn_name == NATIONAL_REGISTER_NAME
    }

    /// Check a SHA1withRSA signature made with this certificate's key
    pub fn verify_signed(&self, data: &[u8], signature: &[u8]) -> Result<bool> {
        crypto::verify_sha1_with_rsa(&self.public_key, data, signature)
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.role == other.role && self.contents == other.contents && self.status == other.status
    }
}

impl Eq for Certificate {}

fn timestamp(seconds: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| Error::Certificate(format!("validity out of range: {seconds}")))
}

fn ocsp_url(cert: &X509Certificate<'_>) -> Option<String> {
    cert.extensions().iter().find_map(|ext| match ext.parsed_extension() {
        ParsedExtension::AuthorityInfoAccess(aia) => aia
            .accessdescs
            .iter()
            .filter(|desc| desc.access_method == OID_PKIX_ACCESS_DESCRIPTOR_OCSP)
            .find_map(|desc| match &desc.access_location {
                GeneralName::URI(uri) => Some((*uri).to_string()),
                _ => None,
            }),
        _ => None,
    })
}

fn crl_url(cert: &X509Certificate<'_>) -> Option<String> {
    cert.extensions().iter().find_map(|ext| match ext.parsed_extension() {
        ParsedExtension::CRLDistributionPoints(points) => points
            .points
            .iter()
            .filter_map(|point| match &point.distribution_point {
                Some(DistributionPointName::FullName(names)) => Some(names),
                _ => None,
            })
            .flatten()
            .find_map(|name| match name {
                GeneralName::URI(uri) => Some(uri.to_string()),
                _ => None,
            }),
        _ => None,
    })
}

fn national_register_name(subject: &X509Name<'_>) -> String {
    [
        first_value(subject.iter_common_name()),
        first_value(subject.iter_organization()),
        first_value(subject.iter_country()),
    ]
    .concat()
}

fn first_value<'n, 'a: 'n>(mut values: impl Iterator<Item = &'n AttributeTypeAndValue<'a>>) -> &'a str {
    values.next().and_then(|value| value.as_str().ok()).unwrap_or_default()
}
