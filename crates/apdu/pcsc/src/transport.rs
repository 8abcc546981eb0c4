//! PC/SC transport implementation

use beid_apdu_core::{Bytes, CardTransport, TransportError};

use pcsc::{Card, Context, Disposition};
use std::{ffi::CString, fmt};
use tracing::{debug, trace, warn};

use crate::config::{PcscConfig, ShareMode, TransactionMode};
use crate::error::PcscError;

/// Largest short-APDU response: 256 data bytes plus the status word
const MAX_RESPONSE_SIZE: usize = 258;

/// Transport implementation using PC/SC
pub struct PcscTransport {
    /// PC/SC context
    context: Context,
    /// Card connection, if established
    card: Option<Card>,
    /// Reader name
    reader_name: String,
    /// Configuration
    config: PcscConfig,
    /// Whether a transaction is active
    transaction_active: bool,
}

impl fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTransport")
            .field("reader_name", &self.reader_name)
            .field("has_card", &self.card.is_some())
            .field("config", &self.config)
            .field("transaction_active", &self.transaction_active)
            .finish()
    }
}

impl PcscTransport {
    /// Create a new PC/SC transport connected to the card in the specified reader
    pub(crate) fn new(
        context: Context,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<Self, PcscError> {
        let mut transport = Self {
            context,
            card: None,
            reader_name: reader_name.to_string(),
            config,
            transaction_active: false,
        };

        transport.connect_card()?;
        debug!(reader = %transport.reader_name, "Connected to card");

        Ok(transport)
    }

    /// Try to connect to the card
    fn connect_card(&mut self) -> Result<(), PcscError> {
        if self.card.is_some() {
            return Ok(());
        }

        let Ok(reader_cstr) = CString::new(self.reader_name.clone()) else {
            return Err(PcscError::ReaderNotFound(self.reader_name.clone()));
        };

        match self.context.connect(
            &reader_cstr,
            self.config.share_mode.into(),
            self.config.protocols,
        ) {
            Ok(card) => {
                self.card = Some(card);
                Ok(())
            }
            Err(pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard) => {
                Err(PcscError::NoCard(self.reader_name.clone()))
            }
            Err(pcsc::Error::UnknownReader | pcsc::Error::ReaderUnavailable) => {
                Err(PcscError::ReaderNotFound(self.reader_name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get the ATR of the current card
    pub fn atr_bytes(&self) -> Result<Vec<u8>, PcscError> {
        self.card.as_ref().map_or_else(
            || Err(PcscError::NoCard(self.reader_name.clone())),
            |card| {
                card.get_attribute_owned(pcsc::Attribute::AtrString)
                    .map_err(Into::into)
            },
        )
    }

    /// Get the reader name
    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    /// Check if the transport is connected to a card
    pub const fn has_card(&self) -> bool {
        self.card.is_some()
    }

    /// Whether an exclusive transaction is currently held
    pub const fn transaction_active(&self) -> bool {
        self.transaction_active
    }

    /// Reconnect the card handle with a different share mode, leaving the card powered
    fn reconnect_as(&mut self, mode: ShareMode) -> Result<(), PcscError> {
        let card = self
            .card
            .as_mut()
            .ok_or_else(|| PcscError::NoCard(self.reader_name.clone()))?;
        card.reconnect(mode.into(), self.config.protocols, Disposition::LeaveCard)
            .map_err(|e| self.forget_card_on(e))
    }

    /// Drop the card handle when the error means it is no longer usable
    fn forget_card_on(&mut self, error: pcsc::Error) -> PcscError {
        match error {
            pcsc::Error::ResetCard => {
                self.card = None;
                self.transaction_active = false;
                PcscError::CardReset
            }
            pcsc::Error::RemovedCard | pcsc::Error::NoSmartcard => {
                self.card = None;
                self.transaction_active = false;
                PcscError::CardRemoved
            }
            e => e.into(),
        }
    }

    /// Transmit a command to the card
    fn transmit_command(&mut self, command: &[u8]) -> Result<Bytes, PcscError> {
        self.connect_card()?;

        let card = match &mut self.card {
            Some(card) => card,
            None => return Err(PcscError::NoCard(self.reader_name.clone())),
        };

        let mut response_buffer = [0u8; MAX_RESPONSE_SIZE];

        match card.transmit(command, &mut response_buffer) {
            Ok(response) => Ok(Bytes::copy_from_slice(response)),
            Err(e) => {
                let reset = e == pcsc::Error::ResetCard;
                let in_transaction = self.transaction_active;
                let error = self.forget_card_on(e);

                // A reset outside a transaction loses no card state we depend on
                if reset && self.config.auto_reconnect && !in_transaction && self.connect_card().is_ok() {
                    debug!(reader = %self.reader_name, "Card was reset, reconnected");
                    return self.transmit_command(command);
                }

                Err(error)
            }
        }
    }
}

impl CardTransport for PcscTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.transmit_command(command).map_err(TransportError::from)
    }

    fn is_connected(&self) -> bool {
        self.card.is_some()
    }

    fn atr(&self) -> Result<Bytes, TransportError> {
        self.atr_bytes().map(Bytes::from).map_err(Into::into)
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.transaction_active = false;

        if let Some(card) = self.card.take() {
            if let Err((_, e)) = card.disconnect(Disposition::ResetCard) {
                warn!(error = %e, "Failed to reset card on disconnect");
            }
        }

        self.connect_card().map_err(Into::into)
    }

    fn begin_transaction(&mut self) -> Result<(), TransportError> {
        if self.config.transaction_mode == TransactionMode::Disabled {
            return Ok(());
        }
        if self.transaction_active {
            return Err(TransportError::other("Transaction already in progress"));
        }

        self.connect_card()?;
        if self.config.share_mode != ShareMode::Exclusive {
            self.reconnect_as(ShareMode::Exclusive)?;
        }
        self.transaction_active = true;
        trace!(reader = %self.reader_name, "Exclusive access acquired");
        Ok(())
    }

    fn end_transaction(&mut self) -> Result<(), TransportError> {
        if !self.transaction_active {
            return Ok(());
        }
        self.transaction_active = false;

        if self.config.share_mode != ShareMode::Exclusive && self.card.is_some() {
            self.reconnect_as(self.config.share_mode)?;
        }
        trace!(reader = %self.reader_name, "Exclusive access released");
        Ok(())
    }
}

impl Drop for PcscTransport {
    fn drop(&mut self) {
        self.transaction_active = false;

        if let Some(card) = self.card.take() {
            let _ = card.disconnect(Disposition::LeaveCard);
        }
    }
}
