//! Core traits and types for APDU (Application Protocol Data Unit) operations
//!
//! This crate provides the foundational types and traits for working with smart card
//! APDU commands and responses according to ISO/IEC 7816-4.
//!
//! ## Overview
//!
//! APDU (Application Protocol Data Unit) is the communication format used by smart cards.
//! This crate provides abstractions for:
//!
//! - Creating and parsing APDU commands and responses
//! - Communicating with smart cards through different transport layers
//! - Enumerating readers and waiting for card presence through a [`DeviceManager`]
//! - Scoping exclusive card access with RAII [`Transaction`] guards
//! - Error handling and status word interpretation
//!
//! With the `mock` feature enabled, in-memory [`MockTransport`] and [`MockDeviceManager`]
//! implementations are exported for use in downstream test suites.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

// Main modules
pub mod command;
pub mod executor;
pub mod response;
pub mod transport;

// Core error types
mod error;
pub use error::{Error, Result, ResultExt};

// Re-exports for common types
pub use command::{ApduCommand, Command};
pub use executor::{CardExecutor, Executor, Transaction};
pub use response::Response;
pub use response::status::StatusWord;
pub use transport::{CardTransport, DeviceManager, TransportError};

#[cfg(any(test, feature = "mock"))]
pub use transport::mock::{MockDeviceManager, MockTransport};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        Bytes, BytesMut, Command, Error, Response, Result, ResultExt,
        command::ApduCommand,
        executor::{CardExecutor, Executor, Transaction},
        response::status::{StatusWord, common as status},
        transport::{CardTransport, DeviceManager, TransportError},
    };
}
