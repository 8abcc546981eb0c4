//! APDU response definitions
//!
//! This module provides the response type returned by card executors,
//! according to ISO/IEC 7816-4.

pub mod status;

use bytes::Bytes;
use tracing::trace;

use crate::Error;
use status::StatusWord;

/// Basic APDU response structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response payload data
    payload: Option<Bytes>,
    /// Status word
    status: StatusWord,
}

impl Response {
    /// Create a new response with payload and status
    pub fn new(payload: Option<Bytes>, status: impl Into<StatusWord>) -> Self {
        Self {
            payload,
            status: status.into(),
        }
    }

    /// Create a success response
    pub const fn success(payload: Option<Bytes>) -> Self {
        Self {
            payload,
            status: status::common::SUCCESS,
        }
    }

    /// Parse response from raw bytes (including status word)
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        let (status, payload) = extract_status_and_payload(data)?;

        trace!(
            sw1 = format_args!("{:#04x}", status.sw1),
            sw2 = format_args!("{:#04x}", status.sw2),
            payload_len = payload.len(),
            "Parsed APDU response"
        );

        let payload = (!payload.is_empty()).then(|| Bytes::copy_from_slice(payload));
        Ok(Self { payload, status })
    }

    /// Get the response payload, if any
    pub const fn payload(&self) -> &Option<Bytes> {
        &self.payload
    }

    /// Get the response payload as a slice, empty when the card returned none
    pub fn data(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or_default()
    }

    /// Get the status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Check if the response indicates success
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Convert to the payload, failing with a status error unless the card answered 90 00
    pub fn into_bytes_result(self) -> Result<Bytes, Error> {
        if self.is_success() {
            Ok(self.payload.unwrap_or_default())
        } else {
            Err(Error::status(self.status.sw1, self.status.sw2))
        }
    }
}

/// Extract status word and payload from raw APDU response data
///
/// # Errors
/// Returns an error if the data is too short to contain a valid status word.
pub fn extract_status_and_payload(data: &[u8]) -> Result<(StatusWord, &[u8]), Error> {
    match data {
        [payload @ .., sw1, sw2] => Ok((StatusWord::new(*sw1, *sw2), payload)),
        _ => {
            trace!("Response too short: {} bytes", data.len());
            Err(Error::parse("response shorter than a status word"))
        }
    }
}
