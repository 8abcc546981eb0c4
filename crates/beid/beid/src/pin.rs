//! PIN block encoding and PIN status handling

use std::fmt;

use beid_apdu_core::StatusWord;
use bytes::Bytes;
use zeroize::Zeroizing;

use crate::constants::{PIN_BLOCK_LENGTH, PIN_TRIES_AFTER_SUCCESS};
use crate::{Error, Result};

const MIN_DIGITS: usize = 4;
const MAX_DIGITS: usize = 2 * (PIN_BLOCK_LENGTH - 1);

/// An encoded PIN or PUK, wiped from memory on drop
///
/// The first byte is `0x20` plus the number of nibbles, followed by the
/// packed digits. An odd digit count is padded with a trailing `F` and the
/// rest of the block is filled with `0xFF`.
#[derive(Clone)]
pub struct PinBlock(Zeroizing<[u8; PIN_BLOCK_LENGTH]>);

impl PinBlock {
    /// Encode a PIN given as a string of hex digits
    pub fn encode(pin: &str) -> Result<Self> {
        let digits = pin.as_bytes();
        if !digits.iter().all(u8::is_ascii_hexdigit) {
            return Err(Error::InvalidPin("PIN must consist of hex digits"));
        }

        let padded = digits.len() + digits.len() % 2;
        if padded < MIN_DIGITS {
            return Err(Error::InvalidPin("PIN is too short"));
        }
        if padded > MAX_DIGITS {
            return Err(Error::InvalidPin("PIN is too long"));
        }

        let mut block = Zeroizing::new([0xFF; PIN_BLOCK_LENGTH]);
        block[0] = 0x20 + padded as u8;
        for (i, pair) in digits.chunks(2).enumerate() {
            let high = nibble(pair[0]);
            let low = pair.get(1).map_or(0x0F, |&d| nibble(d));
            block[i + 1] = (high << 4) | low;
        }

        Ok(Self(block))
    }

    /// Encode the concatenation of the citizen and government PUKs
    pub fn encode_puk(citizen: &str, government: &str) -> Result<Self> {
        let combined = Zeroizing::new(format!("{citizen}{government}"));
        Self::encode(&combined)
    }

    /// Number of digits, excluding padding
    pub fn digit_count(&self) -> usize {
        let nibbles = (self.0[0] - 0x20) as usize;
        match self.0[nibbles / 2] & 0x0F {
            0x0F if nibbles % 2 == 0 => nibbles - 1,
            _ => nibbles,
        }
    }

    /// Copy of the encoded block for an APDU payload
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.0.as_ref())
    }
}

impl AsRef<[u8]> for PinBlock {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl fmt::Debug for PinBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinBlock")
            .field("digits", &self.digit_count())
            .finish_non_exhaustive()
    }
}

const fn nibble(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

/// Map the status word of a PIN operation to the remaining tries
///
/// A successful verification always reports three tries.
pub fn tries_remaining(status: StatusWord) -> Result<u8> {
    if status.is_success() {
        return Ok(PIN_TRIES_AFTER_SUCCESS);
    }
    match status.retries_remaining() {
        Some(remaining) => Err(Error::WrongPin { remaining }),
        None => Err(Error::InvalidStatusWord(status)),
    }
}
