//! Core error type for all APDU operations
//!
//! This module provides a centralized error type used throughout the beid_apdu_core crate.
//! Transport failures are wrapped rather than flattened so that callers can still tell a
//! removed card apart from a malformed response.

use crate::response::status::StatusWord;
use crate::transport::TransportError;

/// Core error type that encompasses all possible errors in the crate
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    //
    // Transport related errors
    //
    /// Error raised by the underlying card transport
    #[error(transparent)]
    Transport(#[from] TransportError),

    //
    // Response related errors
    //
    /// Parse error when processing response
    #[error("Parse error: {0}")]
    ParseError(&'static str),

    /// Status error from response
    #[error("Status error {status}, message: {message:?}")]
    StatusError {
        /// Status word that caused the error
        status: StatusWord,
        /// Optional error message
        message: Option<&'static str>,
    },

    //
    // General errors
    //
    /// Context error with message and source error
    #[error("{context}: {source}")]
    Context {
        /// Contextual message
        context: String,
        /// Source error
        source: Box<Self>,
    },
}

impl Error {
    /// Create a new error with context information
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a new status error
    pub const fn status(sw1: u8, sw2: u8) -> Self {
        Self::StatusError {
            status: StatusWord::new(sw1, sw2),
            message: None,
        }
    }

    /// Create a new parse error
    pub const fn parse(message: &'static str) -> Self {
        Self::ParseError(message)
    }

    /// The transport error at the root of this error, looking through context wrappers
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Context { source, .. } => source.transport_error(),
            _ => None,
        }
    }
}

/// Result type for APDU operations
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for Result with APDU Errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, context: S) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context<S: Into<String>>(self, context: S) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_transport_source() {
        let result: std::result::Result<(), TransportError> = Err(TransportError::CardRemoved);
        let err = result.context("reading identity file").unwrap_err();

        assert_eq!(err.transport_error(), Some(&TransportError::CardRemoved));
        assert_eq!(err.to_string(), "reading identity file: Card was removed");
    }

    #[test]
    fn test_status_error_display() {
        let err = Error::status(0x6A, 0x82);
        assert_eq!(err.to_string(), "Status error 6A 82, message: None");
        assert!(err.transport_error().is_none());
    }
}
