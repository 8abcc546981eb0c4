//! Certificate revocation lists
//!
//! CRL signatures and update times are not checked.

use std::iter;

use tracing::{debug, info, warn};
use x509_parser::parse_x509_crl;

use super::RevocationFetcher;
use crate::certificate::{Certificate, CertificateChain, CertificateStatus};
use crate::{Error, Result};

/// Whether the DER `crl` lists `certificate` as revoked
///
/// Only a CRL published by the certificate's issuer can revoke it. A CRL
/// from another issuer lists nothing for the certificate and is logged.
pub fn is_revoked(crl: &[u8], certificate: &Certificate) -> Result<bool> {
    let (_, crl) = parse_x509_crl(crl).map_err(|e| Error::RevocationCheckFailed(format!("malformed CRL: {e}")))?;
    if crl.issuer().as_raw() != certificate.issuer_der() {
        warn!(
            role = %certificate.role(),
            crl_issuer = %crl.issuer(),
            issuer = certificate.issuer(),
            "CRL was published by another issuer"
        );
        return Ok(false);
    }

    Ok(crl
        .iter_revoked_certificates()
        .any(|revoked| revoked.raw_serial() == certificate.serial()))
}

fn fetch(fetcher: &dyn RevocationFetcher, certificate: &Certificate) -> Result<bool> {
    let url = certificate
        .crl_url()
        .ok_or_else(|| Error::RevocationCheckFailed("no CRL distribution point".into()))?;
    debug!(role = %certificate.role(), url, "Fetching CRL");
    is_revoked(&fetcher.get(url)?, certificate)
}

/// Check the chain and the national register certificate against their CRLs
///
/// A self-signed root that was not validated yet is marked
/// [`CertificateStatus::SelfSignedCertInChain`]. The CA, authentication,
/// signature and national register certificates are then looked up in
/// order; one failing does not stop the others. Returns whether every lookup
/// succeeded and found nothing revoked.
pub fn verify_crl(
    chain: &mut CertificateChain,
    national_register: &mut Certificate,
    fetcher: &dyn RevocationFetcher,
) -> bool {
    let mut certificates = chain.iter_mut();
    if let Some(root) = certificates.next()
        && root.status() == CertificateStatus::NotValidated
        && root.is_self_signed()
    {
        debug!(subject = root.subject(), "Root is self-signed");
        root.set_status(CertificateStatus::SelfSignedCertInChain);
    }

    let mut all_ok = true;
    for certificate in certificates.chain(iter::once(national_register)) {
        let role = certificate.role();
        match fetch(fetcher, certificate) {
            Ok(true) => {
                warn!(%role, serial = hex::encode(certificate.serial()), "Certificate is revoked");
                certificate.set_status(CertificateStatus::CertRevoked);
                all_ok = false;
            }
            Ok(false) => {
                info!(%role, "Certificate not listed in CRL");
                if certificate.status() == CertificateStatus::NotValidated {
                    certificate.set_status(CertificateStatus::ValidatedOk);
                }
            }
            Err(e) => {
                warn!(%role, error = %e, "CRL check failed");
                certificate.set_status(CertificateStatus::UnableToGetCrl);
                all_ok = false;
            }
        }
    }

    all_ok
}
