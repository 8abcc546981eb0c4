//! Error types for PC/SC transport

use std::fmt;

use beid_apdu_core::TransportError;

/// PC/SC-specific errors
#[derive(Debug, thiserror::Error)]
pub enum PcscError {
    /// PC/SC error
    Pcsc(#[from] pcsc::Error),

    /// No readers available
    NoReadersAvailable,

    /// Reader not found
    ReaderNotFound(String),

    /// No card present in reader
    NoCard(String),

    /// Card was reset
    CardReset,

    /// Card was removed
    CardRemoved,

    /// Other error
    Other(String),
}

impl fmt::Display for PcscError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pcsc(e) => write!(f, "PC/SC error: {e}"),
            Self::NoReadersAvailable => write!(f, "No readers available"),
            Self::ReaderNotFound(r) => write!(f, "Reader not found: {r}"),
            Self::NoCard(r) => write!(f, "No card present in reader: {r}"),
            Self::CardReset => write!(f, "Card was reset"),
            Self::CardRemoved => write!(f, "Card was removed"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<PcscError> for TransportError {
    fn from(error: PcscError) -> Self {
        match error {
            PcscError::Pcsc(pcsc::Error::NoSmartcard) => Self::NoCard(String::new()),
            PcscError::Pcsc(pcsc::Error::RemovedCard) => Self::CardRemoved,
            PcscError::Pcsc(pcsc::Error::ResetCard) => Self::CardReset,
            PcscError::Pcsc(pcsc::Error::Timeout) => Self::Timeout,
            PcscError::Pcsc(pcsc::Error::SharingViolation) => Self::SharingViolation,
            PcscError::Pcsc(pcsc::Error::NoReadersAvailable) => Self::NoReaders,
            PcscError::Pcsc(pcsc::Error::NoService | pcsc::Error::ServiceStopped) => Self::Device,
            PcscError::Pcsc(e) => Self::Other(format!("PC/SC error: {e}")),
            PcscError::NoReadersAvailable => Self::NoReaders,
            PcscError::ReaderNotFound(r) => Self::ReaderNotFound(r),
            PcscError::NoCard(r) => Self::NoCard(r),
            PcscError::CardReset => Self::CardReset,
            PcscError::CardRemoved => Self::CardRemoved,
            PcscError::Other(msg) => Self::Other(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_mapping() {
        assert_eq!(
            TransportError::from(PcscError::Pcsc(pcsc::Error::RemovedCard)),
            TransportError::CardRemoved
        );
        assert_eq!(
            TransportError::from(PcscError::Pcsc(pcsc::Error::ResetCard)),
            TransportError::CardReset
        );
        assert_eq!(
            TransportError::from(PcscError::NoCard("ACS ACR38U".into())),
            TransportError::NoCard("ACS ACR38U".into())
        );
        assert!(TransportError::from(PcscError::Pcsc(pcsc::Error::NoSmartcard)).is_card_gone());
    }
}
