//! PC/SC transport implementation for APDU operations
//!
//! This crate provides implementations of the `CardTransport` and `DeviceManager`
//! traits from `beid-apdu-core` using the PC/SC API for communication with smart cards.
//!
//! # Examples
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use beid_apdu_core::prelude::*;
//! use beid_apdu_transport_pcsc::PcscDeviceManager;
//!
//! let manager = PcscDeviceManager::new()?;
//!
//! let readers = manager.list_readers()?;
//! let Some(reader) = readers.iter().find(|r| r.has_card()) else {
//!     println!("No card inserted");
//!     return Ok(());
//! };
//!
//! let transport = manager.connect(reader.name())?;
//! let mut executor = CardExecutor::new(transport);
//!
//! // GET CHALLENGE
//! let response = executor.execute(&Command::new_with_le(0x00, 0x84, 0x00, 0x00, 0x14))?;
//! println!("Challenge: {:02X?}", response.data());
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

// Core modules
mod config;
mod error;
mod manager;
mod reader;
mod transport;

// Public exports
pub use config::{PcscConfig, ShareMode, TransactionMode};
pub use error::PcscError;
pub use manager::PcscDeviceManager;
pub use reader::PcscReader;
pub use transport::PcscTransport;

// Re-export some pcsc types for convenience
pub use pcsc::{Protocol, Protocols};
