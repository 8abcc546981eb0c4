//! SHA1withRSA signature checks

use rsa::RsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use sha1::{Digest, Sha1};
use tracing::trace;

use crate::{Error, Result};

/// SHA-1 digest of `data`
pub fn sha1(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

/// Check a PKCS#1 v1.5 SHA1withRSA `signature` over `data`
///
/// `public_key` is a DER SubjectPublicKeyInfo. Returns `Ok(false)` when the
/// signature does not match, and an error when the key cannot be decoded.
pub fn verify_sha1_with_rsa(public_key: &[u8], data: &[u8], signature: &[u8]) -> Result<bool> {
    let key = RsaPublicKey::from_public_key_der(public_key)
        .map_err(|e| Error::Certificate(format!("invalid RSA public key: {e}")))?;
    let Ok(signature) = Signature::try_from(signature) else {
        return Ok(false);
    };

    let verified = VerifyingKey::<Sha1>::new(key).verify(data, &signature).is_ok();
    trace!(verified, len = data.len(), "Checked SHA1withRSA signature");
    Ok(verified)
}
