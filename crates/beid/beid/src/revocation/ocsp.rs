//! OCSP requests and responses (RFC 6960)
//!
//! Requests carry a single SHA-1 `CertID` and are sent with HTTP GET. The
//! responder's signature is not checked; only the status of the matching
//! single response is used.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use derive_more::Display;
use tracing::{debug, info, warn};
use url::form_urlencoded;
use yasna::models::ObjectIdentifier;
use yasna::{ASN1Error, ASN1ErrorKind, ASN1Result, BERReader, DERWriter, Tag};

use super::RevocationFetcher;
use crate::certificate::{Certificate, CertificateChain, CertificateRole, CertificateStatus};
use crate::crypto::sha1;
use crate::{Error, Result};

const OID_SHA1: &[u64] = &[1, 3, 14, 3, 2, 26];
const OID_OCSP_BASIC: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 48, 1, 1];

/// `OCSPResponseStatus` successful
const RESPONSE_SUCCESSFUL: i64 = 0;

/// Status of a certificate according to its OCSP responder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum OcspStatus {
    /// Not revoked
    #[display("good")]
    Good,
    /// Revoked
    #[display("revoked")]
    Revoked,
    /// Unknown to the responder
    #[display("unknown")]
    Unknown,
}

impl OcspStatus {
    /// Certificate status this answer moves to
    pub const fn certificate_status(&self) -> CertificateStatus {
        match self {
            Self::Good => CertificateStatus::ValidatedOk,
            Self::Revoked => CertificateStatus::CertRevoked,
            Self::Unknown => CertificateStatus::CertUnknown,
        }
    }
}

/// DER `OCSPRequest` for `certificate`, issued by `issuer`
pub fn build_request(certificate: &Certificate, issuer: &Certificate) -> Vec<u8> {
    yasna::construct_der(|w| {
        // OCSPRequest
        w.write_sequence(|w| {
            // TBSRequest
            w.next().write_sequence(|w| {
                // requestList
                w.next().write_sequence(|w| {
                    // Request
                    w.next().write_sequence(|w| {
                        write_cert_id(w.next(), certificate, issuer);
                    });
                });
            });
        });
    })
}

fn write_cert_id(w: DERWriter<'_>, certificate: &Certificate, issuer: &Certificate) {
    w.write_sequence(|w| {
        w.next().write_sequence(|w| {
            w.next().write_oid(&ObjectIdentifier::from_slice(OID_SHA1));
            w.next().write_null();
        });
        w.next().write_bytes(&sha1(certificate.issuer_der()));
        w.next().write_bytes(&sha1(issuer.public_key_bits()));
        w.next().write_bigint_bytes(certificate.serial(), true);
    });
}

/// GET URL for `request`: the responder URL, a slash and the URL-encoded base64 request
pub fn request_url(responder: &str, request: &[u8]) -> String {
    let encoded: String = form_urlencoded::byte_serialize(STANDARD.encode(request).as_bytes()).collect();
    format!("{}/{}", responder.trim_end_matches('/'), encoded)
}

/// Status for the certificate with `serial` in a DER `OCSPResponse`
pub fn parse_response(der: &[u8], serial: &[u8]) -> Result<OcspStatus> {
    let (status, basic) = yasna::parse_der(der, |r| {
        r.read_sequence(|r| {
            let status = r.next().read_enum()?;
            let basic = r.read_optional(|r| {
                r.read_tagged(Tag::context(0), |r| {
                    r.read_sequence(|r| {
                        let response_type = r.next().read_oid()?;
                        let response = r.next().read_bytes()?;
                        Ok((response_type, response))
                    })
                })
            })?;
            Ok((status, basic))
        })
    })
    .map_err(asn1_error)?;

    if status != RESPONSE_SUCCESSFUL {
        return Err(Error::RevocationCheckFailed(format!("OCSP response status {status}")));
    }
    let Some((response_type, response)) = basic else {
        return Err(Error::RevocationCheckFailed("OCSP response without body".into()));
    };
    if response_type != ObjectIdentifier::from_slice(OID_OCSP_BASIC) {
        return Err(Error::RevocationCheckFailed(format!(
            "unsupported OCSP response type {response_type}"
        )));
    }

    let responses = yasna::parse_der(&response, read_basic_response).map_err(asn1_error)?;
    responses
        .into_iter()
        .find(|(response_serial, _)| same_serial(response_serial, serial))
        .map(|(_, status)| status)
        .ok_or_else(|| Error::RevocationCheckFailed("no OCSP response for certificate".into()))
}

/// `BasicOCSPResponse`, keeping `(serial, status)` of each single response
fn read_basic_response(r: BERReader<'_, '_>) -> ASN1Result<Vec<(Vec<u8>, OcspStatus)>> {
    r.read_sequence(|r| {
        // ResponseData
        let responses = r.next().read_sequence(|r| {
            r.read_optional(|r| r.read_tagged(Tag::context(0), |r| r.read_der()))?;
            // responderID and producedAt
            r.next().read_der()?;
            r.next().read_der()?;
            let responses = r.next().collect_sequence_of(read_single_response)?;
            r.read_optional(|r| r.read_tagged(Tag::context(1), |r| r.read_der()))?;
            Ok(responses)
        })?;
        // signatureAlgorithm, signature and certs
        r.next().read_der()?;
        r.next().read_der()?;
        r.read_optional(|r| r.read_der())?;
        Ok(responses)
    })
}

fn read_single_response(r: BERReader<'_, '_>) -> ASN1Result<(Vec<u8>, OcspStatus)> {
    r.read_sequence(|r| {
        let serial = r.next().read_sequence(|r| {
            r.next().read_der()?;
            r.next().read_bytes()?;
            r.next().read_bytes()?;
            Ok(r.next().read_bigint_bytes()?.0)
        })?;
        let status = match r.next().read_tagged_der()?.tag() {
            tag if tag == Tag::context(0) => OcspStatus::Good,
            tag if tag == Tag::context(1) => OcspStatus::Revoked,
            tag if tag == Tag::context(2) => OcspStatus::Unknown,
            _ => return Err(ASN1Error::new(ASN1ErrorKind::Invalid)),
        };
        // thisUpdate, nextUpdate and singleExtensions
        r.next().read_der()?;
        r.read_optional(|r| r.read_tagged(Tag::context(0), |r| r.read_der()))?;
        r.read_optional(|r| r.read_tagged(Tag::context(1), |r| r.read_der()))?;
        Ok((serial, status))
    })
}

fn same_serial(a: &[u8], b: &[u8]) -> bool {
    let strip = |s: &[u8]| -> usize { s.iter().take_while(|&&byte| byte == 0).count() };
    a[strip(a)..] == b[strip(b)..]
}

fn asn1_error(error: ASN1Error) -> Error {
    Error::RevocationCheckFailed(format!("malformed OCSP response: {error}"))
}

/// Ask the responder of `certificate` whether it is revoked
///
/// Returns `None` when the certificate names no responder.
fn check(
    fetcher: &dyn RevocationFetcher,
    certificate: &Certificate,
    issuer: &Certificate,
) -> Option<Result<OcspStatus>> {
    let responder = certificate.ocsp_url()?;
    let url = request_url(responder, &build_request(certificate, issuer));
    debug!(role = %certificate.role(), responder, "Sending OCSP request");

    Some(
        fetcher
            .get(&url)
            .and_then(|response| parse_response(&response, certificate.serial())),
    )
}

/// Check the authentication and signature certificates with OCSP
///
/// Each answer moves the certificate's status; a failed exchange leaves it
/// [`CertificateStatus::CertUnknown`]. Certificates naming no responder are
/// skipped. Returns whether every checked certificate is good.
pub fn verify_ocsp(chain: &mut CertificateChain, fetcher: &dyn RevocationFetcher) -> bool {
    let issuer = chain.ca().clone();
    let mut all_good = true;

    for role in [CertificateRole::Authentication, CertificateRole::Signature] {
        let Some(certificate) = chain.get_mut(role) else {
            continue;
        };
        let Some(result) = check(fetcher, certificate, &issuer) else {
            debug!(%role, "No OCSP responder, skipping");
            continue;
        };

        let status = match result {
            Ok(status) => {
                info!(%role, %status, "OCSP answer");
                status
            }
            Err(e) => {
                warn!(%role, error = %e, "OCSP check failed");
                OcspStatus::Unknown
            }
        };
        certificate.set_status(status.certificate_status());
        all_good &= status == OcspStatus::Good;
    }

    all_good
}
