//! Revocation checks over OCSP and CRL

pub mod crl;
pub mod ocsp;

use std::fmt::Debug;
use std::time::Duration;

use bytes::Bytes;
use tracing::trace;

use crate::{Error, Result};

pub use crl::verify_crl;
pub use ocsp::{OcspStatus, verify_ocsp};

/// Source of OCSP responses and CRLs
pub trait RevocationFetcher: Send + Sync + Debug {
    /// Fetch the body at `url` with HTTP GET
    fn get(&self, url: &str) -> Result<Bytes>;
}

/// [`RevocationFetcher`] over blocking HTTP
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(http_error)?;
        Ok(Self { client })
    }
}

impl RevocationFetcher for HttpFetcher {
    fn get(&self, url: &str) -> Result<Bytes> {
        let body = self
            .client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::bytes)
            .map_err(http_error)?;
        trace!(url, len = body.len(), "Fetched revocation data");
        Ok(body)
    }
}

fn http_error(error: reqwest::Error) -> Error {
    Error::RevocationCheckFailed(error.to_string())
}
