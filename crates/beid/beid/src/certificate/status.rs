use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

macro_rules! certificate_status {
    ($($(#[$doc:meta])* $variant:ident,)+) => {
        /// Verification state of a certificate
        ///
        /// Every certificate starts as [`CertificateStatus::NotValidated`] and is
        /// moved by time checks, root pinning and revocation checks.
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum CertificateStatus {
            $($(#[$doc])* $variant,)+
        }

        impl CertificateStatus {
            /// Every status, in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// Stable name used for snapshots
            pub const fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                }
            }
        }

        impl FromStr for CertificateStatus {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Error> {
                match s {
                    $(stringify!($variant) => Ok(Self::$variant),)+
                    _ => Err(Error::InvalidData("unknown certificate status")),
                }
            }
        }
    };
}

certificate_status! {
    /// Checked and trusted
    ValidatedOk,
    /// Not checked yet
    #[default]
    NotValidated,
    /// Issuer certificate unavailable
    UnableToGetIssuerCert,
    /// CRL could not be fetched or decoded
    UnableToGetCrl,
    /// Certificate signature could not be decrypted
    UnableToDecryptCertSignature,
    /// CRL signature could not be decrypted
    UnableToDecryptCrlSignature,
    /// Issuer public key could not be decoded
    UnableToDecodeIssuerPublicKey,
    /// Certificate signature is invalid
    CertSignatureFailure,
    /// CRL signature is invalid
    CrlSignatureFailure,
    /// Certificate validity has not started
    CertNotYetValid,
    /// Certificate validity has ended
    CertHasExpired,
    /// CRL is not valid yet
    CrlNotYetValid,
    /// CRL has expired
    CrlHasExpired,
    /// Malformed notBefore
    ErrInCertNotBeforeField,
    /// Malformed notAfter
    ErrInCertNotAfterField,
    /// Malformed CRL lastUpdate
    ErrInCrlLastUpdateField,
    /// Malformed CRL nextUpdate
    ErrInCrlNextUpdateField,
    /// Out of memory
    OutOfMem,
    /// Self-signed leaf certificate
    DepthZeroSelfSignedCert,
    /// Self-signed certificate in the chain
    SelfSignedCertInChain,
    /// Issuer certificate not found locally
    UnableToGetIssuerCertLocally,
    /// Leaf signature cannot be verified
    UnableToVerifyLeafSignature,
    /// Chain too long
    CertChainTooLong,
    /// Revoked by its issuer
    CertRevoked,
    /// Invalid CA certificate
    InvalidCa,
    /// Root is not an accepted trust anchor
    InvalidRoot,
    /// Path length constraint exceeded
    PathLengthExceeded,
    /// Unsuitable purpose
    InvalidPurpose,
    /// Not trusted
    CertUnTrusted,
    /// Rejected
    CertRejected,
    /// Subject and issuer mismatch
    SubjectIssuerMismatch,
    /// Authority and subject key identifier mismatch
    AkidSkidMismatch,
    /// Authority key identifier issuer serial mismatch
    AkidIssuerSerialMismatch,
    /// Key usage does not include certificate signing
    KeyUsageNoCertSign,
    /// CRL issuer unavailable
    UnableToGetCrlIssuer,
    /// Unhandled critical extension
    UnhandledCriticalExtension,
    /// The OCSP responder does not know the certificate
    CertUnknown,
}

impl CertificateStatus {
    /// Whether the certificate was checked and found good
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::ValidatedOk)
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        assert_eq!(CertificateStatus::ALL.len(), 37);
        for status in CertificateStatus::ALL {
            assert_eq!(status.to_string().parse::<CertificateStatus>().unwrap(), *status);
        }
        assert_eq!(CertificateStatus::CertRevoked.to_string(), "CertRevoked");
        assert!("Revoked".parse::<CertificateStatus>().is_err());
    }

    #[test]
    fn test_default() {
        assert_eq!(CertificateStatus::default(), CertificateStatus::NotValidated);
        assert!(!CertificateStatus::default().is_ok());
        assert!(CertificateStatus::ValidatedOk.is_ok());
    }
}
