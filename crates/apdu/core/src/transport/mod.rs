//! Transport traits for APDU communication with cards
//!
//! This module provides abstractions for communicating with smart cards through
//! different transport mechanisms, and for discovering the readers they sit in.

pub mod error;
mod manager;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

use std::fmt;

use bytes::Bytes;
pub use error::TransportError;
pub use manager::DeviceManager;
use tracing::{debug, trace};

/// Trait for basic card transports
///
/// A transport is responsible for sending and receiving raw APDU bytes.
/// It has no knowledge of command structure or protocol details.
pub trait CardTransport: Send + Sync + fmt::Debug {
    /// Send raw APDU bytes to card and return response bytes
    ///
    /// This method should handle the low-level communication with the card
    /// but should not interpret the contents.
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        trace!(command = ?hex::encode(command), "Transmitting raw command");
        let result = self.do_transmit_raw(command);
        match &result {
            Ok(response) => {
                trace!(response = ?hex::encode(response), "Received raw response");
            }
            Err(e) => {
                debug!(error = ?e, "Transport error during transmission");
            }
        }
        result
    }

    /// Internal implementation of transmit_raw
    /// This is the method that concrete implementations should override
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError>;

    /// Check if the transport is connected to a physical card
    fn is_connected(&self) -> bool;

    /// Answer To Reset of the connected card
    fn atr(&self) -> Result<Bytes, TransportError>;

    /// Reset the transport connection
    fn reset(&mut self) -> Result<(), TransportError>;

    /// Acquire exclusive access to the card until [`CardTransport::end_transaction`]
    ///
    /// Transports without a notion of sharing may keep the default no-op.
    fn begin_transaction(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Release exclusive access acquired by [`CardTransport::begin_transaction`]
    fn end_transaction(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
