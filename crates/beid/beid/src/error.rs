use beid_apdu_core::{StatusWord, TransportError};
use derive_more::Display;

/// Result type for eID operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why no card is available for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CardAbsence {
    /// No session has been opened
    #[display("not connected")]
    NotConnected,
    /// The reader is empty
    #[display("not present")]
    NotPresent,
    /// The card was pulled while connected
    #[display("removed")]
    Removed,
    /// The card was reset by another application
    #[display("reset")]
    Reset,
}

/// Error type for eID operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No reader matched the configured reader name, or none is attached
    #[error("No card readers found")]
    NoReadersFound,

    /// No card is available
    #[error("Card {0}")]
    CardNotConnected(CardAbsence),

    /// Low-level exchange failure
    #[error(transparent)]
    Transport(TransportError),

    /// APDU encoding or framing failure
    #[error(transparent)]
    Apdu(beid_apdu_core::Error),

    /// The card answered with an unexpected status word
    #[error("Invalid status word {0}: {desc}", desc = .0.description())]
    InvalidStatusWord(StatusWord),

    /// PIN verification failed
    #[error("Wrong PIN, {remaining} tries remaining")]
    WrongPin {
        /// Attempts left before the PIN is blocked
        remaining: u8,
    },

    /// A record lacks a mandatory tag
    #[error("Tag {0:#04X} not found")]
    TagNotFound(u8),

    /// A date field could not be parsed
    #[error("Invalid date in tag {tag:#04X}: {value:?}")]
    DateParse {
        /// Tag holding the date
        tag: u8,
        /// Normalised text that failed to parse
        value: String,
    },

    /// Signature over a card record did not verify
    #[error("Signature verification failed for {0}")]
    SignatureVerificationFailed(&'static str),

    /// Digest of a card record did not match the expected hash
    #[error("Hash verification failed for {0}")]
    HashVerificationFailed(&'static str),

    /// The card's root certificate is not an accepted trust anchor
    #[error("Root certificate verification failed")]
    RootVerificationFailed,

    /// An OCSP or CRL exchange could not be completed
    #[error("Revocation check failed: {0}")]
    RevocationCheckFailed(String),

    /// A card file exceeded the space reserved for it
    #[error("Buffer too small: needed {needed} bytes, have {actual}")]
    BufferTooSmall {
        /// Bytes required
        needed: usize,
        /// Bytes available
        actual: usize,
    },

    /// PIN text is not a valid PIN
    #[error("Invalid PIN: {0}")]
    InvalidPin(&'static str),

    /// Card data violates an invariant
    #[error("Invalid data: {0}")]
    InvalidData(&'static str),

    /// A certificate could not be decoded
    #[error("Certificate error: {0}")]
    Certificate(String),
}

impl From<TransportError> for Error {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::NoReaders => Self::NoReadersFound,
            TransportError::NoCard(_) => Self::CardNotConnected(CardAbsence::NotPresent),
            TransportError::CardRemoved => Self::CardNotConnected(CardAbsence::Removed),
            TransportError::CardReset => Self::CardNotConnected(CardAbsence::Reset),
            e => Self::Transport(e),
        }
    }
}

impl From<beid_apdu_core::Error> for Error {
    fn from(error: beid_apdu_core::Error) -> Self {
        match error {
            beid_apdu_core::Error::Transport(e) => e.into(),
            beid_apdu_core::Error::StatusError { status, .. } => Self::InvalidStatusWord(status),
            e => match e.transport_error() {
                Some(t) if t.is_card_gone() => t.clone().into(),
                _ => Self::Apdu(e),
            },
        }
    }
}

impl From<x509_parser::nom::Err<x509_parser::error::X509Error>> for Error {
    fn from(error: x509_parser::nom::Err<x509_parser::error::X509Error>) -> Self {
        Self::Certificate(error.to_string())
    }
}

impl Error {
    /// Remaining PIN attempts, when this is a wrong-PIN error
    pub const fn pin_tries_remaining(&self) -> Option<u8> {
        match self {
            Self::WrongPin { remaining } => Some(*remaining),
            _ => None,
        }
    }

    /// Whether this error means the card is no longer reachable
    pub const fn is_card_gone(&self) -> bool {
        matches!(self, Self::CardNotConnected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_lift_card_absence() {
        assert!(matches!(
            Error::from(TransportError::CardRemoved),
            Error::CardNotConnected(CardAbsence::Removed)
        ));
        assert!(matches!(
            Error::from(TransportError::NoCard("reader".into())),
            Error::CardNotConnected(CardAbsence::NotPresent)
        ));
        assert!(matches!(Error::from(TransportError::NoReaders), Error::NoReadersFound));
        assert!(matches!(
            Error::from(TransportError::Timeout),
            Error::Transport(TransportError::Timeout)
        ));
    }

    #[test]
    fn test_apdu_errors_unwrap() {
        let err = beid_apdu_core::Error::Transport(TransportError::CardReset).with_context("reading");
        assert!(matches!(Error::from(err), Error::CardNotConnected(CardAbsence::Reset)));

        let err = beid_apdu_core::Error::status(0x6A, 0x82);
        assert!(matches!(
            Error::from(err),
            Error::InvalidStatusWord(sw) if sw == StatusWord::new(0x6A, 0x82)
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::CardNotConnected(CardAbsence::Removed).to_string(),
            "Card removed"
        );
        assert_eq!(
            Error::InvalidStatusWord(StatusWord::new(0x6A, 0x82)).to_string(),
            "Invalid status word 6A 82: File not found"
        );
        assert_eq!(Error::WrongPin { remaining: 2 }.pin_tries_remaining(), Some(2));
    }
}
