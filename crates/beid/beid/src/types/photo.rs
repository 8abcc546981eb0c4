use bytes::Bytes;
use sha1::{Digest, Sha1};

use crate::{Error, Result};

/// JPEG photo from file `DF01/4035`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRecord {
    data: Bytes,
}

impl PhotoRecord {
    /// Wrap the raw photo bytes
    pub const fn new(data: Bytes) -> Self {
        Self { data }
    }

    /// JPEG bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take the JPEG bytes
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// SHA-1 digest of the photo
    pub fn hash(&self) -> [u8; 20] {
        Sha1::digest(&self.data).into()
    }

    /// Check the photo against the hash stored in the identity record
    pub fn verify_hash(&self, expected: &[u8]) -> Result<()> {
        if self.hash().as_slice() == expected {
            Ok(())
        } else {
            Err(Error::HashVerificationFailed("photo"))
        }
    }
}

impl AsRef<[u8]> for PhotoRecord {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
