//! Error types specific to card transport

use thiserror::Error;

/// Transport error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection error
    #[error("Failed to connect to device")]
    Connection,

    /// Transmission error
    #[error("Failed to transmit data")]
    Transmission,

    /// Device error
    #[error("Device error")]
    Device,

    /// No card readers are attached
    #[error("No readers available")]
    NoReaders,

    /// The named reader is unknown to the device manager
    #[error("Reader not found: {0}")]
    ReaderNotFound(String),

    /// The reader holds no card
    #[error("No card present in reader: {0}")]
    NoCard(String),

    /// The card was removed while connected
    #[error("Card was removed")]
    CardRemoved,

    /// The card was reset by another party while connected
    #[error("Card was reset")]
    CardReset,

    /// Another application holds the card exclusively
    #[error("Sharing violation")]
    SharingViolation,

    /// Driver error (with code)
    #[error("Driver error code: {0}")]
    Driver(i32),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Other error with message
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Create a new driver error
    pub const fn driver(code: i32) -> Self {
        Self::Driver(code)
    }

    /// Create a general other error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }

    /// Whether this error means the card is no longer reachable through the current connection
    pub const fn is_card_gone(&self) -> bool {
        matches!(self, Self::NoCard(_) | Self::CardRemoved | Self::CardReset)
    }
}
