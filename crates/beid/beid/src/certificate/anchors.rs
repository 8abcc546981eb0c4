use bytes::Bytes;
use tracing::warn;

use super::{Certificate, CertificateStatus};

/// Root certificates accepted for the card's trust chain
///
/// A primary root and an optional rollover root are kept so a new root can
/// be accepted before the old one is retired. With no root configured every
/// card root is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustAnchors {
    primary: Option<Bytes>,
    rollover: Option<Bytes>,
}

impl TrustAnchors {
    /// Create an empty set that accepts no root
    pub const fn new() -> Self {
        Self {
            primary: None,
            rollover: None,
        }
    }

    /// Set the primary root, DER encoded
    pub fn with_primary(mut self, der: impl Into<Bytes>) -> Self {
        self.primary = Some(der.into());
        self
    }

    /// Set the rollover root, DER encoded
    pub fn with_rollover(mut self, der: impl Into<Bytes>) -> Self {
        self.rollover = Some(der.into());
        self
    }

    /// Whether no root is accepted
    pub const fn is_empty(&self) -> bool {
        self.primary.is_none() && self.rollover.is_none()
    }

    /// Accepted roots, primary first
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.primary.iter().chain(&self.rollover).map(Bytes::as_ref)
    }

    /// Whether `der` is byte-for-byte one of the accepted roots
    pub fn contains(&self, der: &[u8]) -> bool {
        self.iter().any(|anchor| anchor == der)
    }

    /// Pin `root` against the accepted roots
    ///
    /// A mismatch moves the root to [`CertificateStatus::InvalidRoot`].
    pub fn check(&self, root: &mut Certificate) -> bool {
        if self.contains(root.contents()) {
            return true;
        }
        warn!(subject = root.subject(), "Root certificate is not a trust anchor");
        root.set_status(CertificateStatus::InvalidRoot);
        false
    }
}
