use std::fmt;
use std::time::Duration;

use super::{CardTransport, TransportError};

/// Discovery of card readers and the cards inserted in them
///
/// A device manager is shared between the thread that talks to a card and a
/// presence monitor, so every method takes `&self`.
pub trait DeviceManager: Send + Sync + fmt::Debug {
    /// Transport produced when connecting to a reader
    type Transport: CardTransport + 'static;

    /// Names of the readers currently attached, in system order
    fn reader_names(&self) -> Result<Vec<String>, TransportError>;

    /// Connect to the card in `reader`
    fn connect(&self, reader: &str) -> Result<Self::Transport, TransportError>;

    /// Block up to `timeout` until a card is present in `reader`
    ///
    /// Returns `Ok(false)` when the timeout elapses with the reader still empty.
    fn wait_for_card_present(&self, reader: &str, timeout: Duration)
    -> Result<bool, TransportError>;

    /// Block up to `timeout` until `reader` is empty
    ///
    /// Returns `Ok(false)` when the timeout elapses with a card still inserted.
    fn wait_for_card_absent(&self, reader: &str, timeout: Duration)
    -> Result<bool, TransportError>;
}
