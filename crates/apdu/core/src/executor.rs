//! Executor for APDU command execution
//!
//! This module provides the executor that drives a card transport, and the
//! [`Transaction`] guard that scopes exclusive card access.

use std::fmt;
use std::ops::{Deref, DerefMut};

use bytes::Bytes;
use tracing::{debug, instrument, trace, warn};

use crate::command::ApduCommand;
use crate::response::Response;
use crate::transport::CardTransport;
use crate::{Error, Result};

/// Trait for APDU command execution
pub trait Executor: Send + Sync + fmt::Debug {
    /// Transmit an APDU command
    #[instrument(level = "trace", skip(self), fields(executor = std::any::type_name::<Self>()))]
    fn transmit(&mut self, command: &[u8]) -> Result<Bytes> {
        trace!(command = ?hex::encode(command), "Transmitting command");
        let response = self.do_transmit(command);
        match &response {
            Ok(bytes) => {
                trace!(response = ?hex::encode(bytes), "Received response");
            }
            Err(err) => {
                debug!(error = ?err, "Error during transmission");
            }
        }
        response
    }

    /// Internal implementation of transmit
    fn do_transmit(&mut self, command: &[u8]) -> Result<Bytes>;

    /// Execute a typed APDU command and parse the card's answer
    fn execute<C: ApduCommand>(&mut self, command: &C) -> Result<Response>
    where
        Self: Sized,
    {
        let response_bytes = self.transmit(&command.to_bytes())?;
        let response = Response::from_bytes(&response_bytes)?;
        trace!(
            status = %response.status(),
            description = response.status().description(),
            "Command completed"
        );
        Ok(response)
    }

    /// Acquire exclusive access to the card
    fn begin_transaction(&mut self) -> Result<()>;

    /// Release exclusive access to the card
    fn end_transaction(&mut self) -> Result<()>;

    /// Begin a transaction that ends when the returned guard is dropped
    fn transaction(&mut self) -> Result<Transaction<'_, Self>>
    where
        Self: Sized,
    {
        self.begin_transaction()?;
        Ok(Transaction { executor: self })
    }

    /// Reset the executor, including the transport
    fn reset(&mut self) -> Result<()>;
}

/// Exclusive access to a card, released on drop
///
/// Dereferences to the executor so commands can be sent while it is held.
#[derive(Debug)]
pub struct Transaction<'a, E: Executor> {
    executor: &'a mut E,
}

impl<E: Executor> Deref for Transaction<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.executor
    }
}

impl<E: Executor> DerefMut for Transaction<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.executor
    }
}

impl<E: Executor> Drop for Transaction<'_, E> {
    fn drop(&mut self) {
        if let Err(e) = self.executor.end_transaction() {
            warn!(error = %e, "Failed to end card transaction");
        }
    }
}

/// Card executor implementation that drives a transport directly
#[derive(Debug)]
pub struct CardExecutor<T: CardTransport> {
    /// The transport used for communication
    transport: T,
}

impl<T: CardTransport> CardExecutor<T> {
    /// Create a new card executor with the given transport
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Get a reference to the underlying transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Take ownership of the transport and return it
    pub fn into_transport(self) -> T {
        self.transport
    }
}

impl<T: CardTransport> Executor for CardExecutor<T> {
    fn do_transmit(&mut self, command: &[u8]) -> Result<Bytes> {
        self.transport.transmit_raw(command).map_err(Error::Transport)
    }

    fn begin_transaction(&mut self) -> Result<()> {
        trace!("Beginning card transaction");
        self.transport.begin_transaction().map_err(Error::Transport)
    }

    fn end_transaction(&mut self) -> Result<()> {
        trace!("Ending card transaction");
        self.transport.end_transaction().map_err(Error::Transport)
    }

    fn reset(&mut self) -> Result<()> {
        self.transport.reset().map_err(Error::Transport)
    }
}
