//! Connection state shared by the controller and the presence monitor

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use beid_apdu_core::{CardExecutor, CardTransport, DeviceManager};
use bytes::Bytes;
use parking_lot::{MappedMutexGuard, Mutex};
use tracing::debug;

use crate::card::EidCard;
use crate::error::{CardAbsence, Error, Result};

/// Session guarded for use from several threads
pub type SharedSession<T> = Arc<Mutex<Session<T>>>;

/// Locked handle on a connected card
pub type CardGuard<'a, T> = MappedMutexGuard<'a, ConnectedCard<T>>;

/// A card connected in a named reader
#[derive(Debug)]
pub struct ConnectedCard<T: CardTransport> {
    reader: String,
    atr: Bytes,
    card: EidCard<CardExecutor<T>>,
}

impl<T: CardTransport> ConnectedCard<T> {
    /// Name of the reader holding the card
    pub fn reader(&self) -> &str {
        &self.reader
    }

    /// Answer To Reset captured at connection
    pub const fn atr(&self) -> &Bytes {
        &self.atr
    }
}

impl<T: CardTransport> Deref for ConnectedCard<T> {
    type Target = EidCard<CardExecutor<T>>;

    fn deref(&self) -> &Self::Target {
        &self.card
    }
}

impl<T: CardTransport> DerefMut for ConnectedCard<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.card
    }
}

/// Connection state
#[derive(Debug)]
pub enum Session<T: CardTransport> {
    /// No card connected
    Disconnected,
    /// Connected to a card
    Connected(ConnectedCard<T>),
}

impl<T: CardTransport> Default for Session<T> {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl<T: CardTransport> Session<T> {
    /// Create a disconnected session behind a lock
    pub fn shared() -> SharedSession<T> {
        Arc::new(Mutex::new(Self::Disconnected))
    }

    /// Whether a card is connected
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    /// The connected card, if any
    pub const fn card(&self) -> Option<&ConnectedCard<T>> {
        match self {
            Self::Connected(card) => Some(card),
            Self::Disconnected => None,
        }
    }

    /// The connected card, if any, mutably
    pub const fn card_mut(&mut self) -> Option<&mut ConnectedCard<T>> {
        match self {
            Self::Connected(card) => Some(card),
            Self::Disconnected => None,
        }
    }

    /// Name of the connected reader
    pub fn reader_name(&self) -> Option<&str> {
        self.card().map(ConnectedCard::reader)
    }

    /// Connect unless already connected
    ///
    /// Readers are tried in system order, restricted to `reader_name` when
    /// given; the first card that answers is kept.
    pub fn connect<M>(
        &mut self,
        manager: &M,
        reader_name: Option<&str>,
        read_settle_delay: Duration,
    ) -> Result<&mut ConnectedCard<T>>
    where
        M: DeviceManager<Transport = T>,
    {
        if !self.is_connected() {
            let candidates: Vec<String> = manager
                .reader_names()?
                .into_iter()
                .filter(|name| reader_name.is_none_or(|wanted| wanted == name.as_str()))
                .collect();
            if candidates.is_empty() {
                return Err(Error::NoReadersFound);
            }

            let mut last_error = Error::CardNotConnected(CardAbsence::NotPresent);
            for reader in &candidates {
                match open(manager, reader, read_settle_delay) {
                    Ok(card) => {
                        *self = Self::Connected(card);
                        break;
                    }
                    Err(e) => {
                        debug!(reader, error = %e, "Reader skipped");
                        last_error = e;
                    }
                }
            }
            if !self.is_connected() {
                return Err(last_error);
            }
        }

        self.card_mut()
            .ok_or(Error::CardNotConnected(CardAbsence::NotConnected))
    }

    /// Connect to the card in `reader`, replacing any current connection
    pub fn connect_reader<M>(
        &mut self,
        manager: &M,
        reader: &str,
        read_settle_delay: Duration,
    ) -> Result<&mut ConnectedCard<T>>
    where
        M: DeviceManager<Transport = T>,
    {
        self.disconnect();
        *self = Self::Connected(open(manager, reader, read_settle_delay)?);
        self.card_mut()
            .ok_or(Error::CardNotConnected(CardAbsence::NotConnected))
    }

    /// Drop the connection, if any
    pub fn disconnect(&mut self) {
        if let Self::Connected(card) = std::mem::take(self) {
            debug!(reader = card.reader(), "Disconnected");
        }
    }
}

fn open<M>(manager: &M, reader: &str, read_settle_delay: Duration) -> Result<ConnectedCard<M::Transport>>
where
    M: DeviceManager,
{
    let transport = manager.connect(reader)?;
    let atr = transport.atr()?;
    debug!(reader, atr = %hex::encode(&atr), "Connected");

    Ok(ConnectedCard {
        reader: reader.to_string(),
        atr,
        card: EidCard::new(CardExecutor::new(transport)).with_read_settle_delay(read_settle_delay),
    })
}
