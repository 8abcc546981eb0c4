//! Belgian electronic identity card access
//!
//! This crate reads the identity, address, photo and certificates stored on a
//! Belgian eID card and checks them against the card's trust chain before
//! handing them out.
//!
//! ## Overview
//!
//! - [`TlvRecord`] decodes the tag-length-value records stored on the card
//! - [`EidCard`] drives the card's APDU commands over any [`Executor`]
//! - [`Certificate`] and [`CertificateChain`] carry the card's certificates and
//!   their verification status, with OCSP and CRL checks in [`revocation`]
//! - [`BeId`] connects to readers on demand and returns verified records
//! - [`PresenceMonitor`] follows card insertion and removal on a background thread
//!
//! ```no_run
//! # #[cfg(feature = "pcsc")]
//! # fn main() -> beid::Result<()> {
//! use beid::{BeId, BeIdConfig, TrustAnchors};
//!
//! let root = std::fs::read("belgiumrs4.crt").map_err(|_| beid::Error::InvalidData("root"))?;
//! let config = BeIdConfig::new().with_trust_anchors(TrustAnchors::new().with_primary(root));
//! let eid = BeId::pcsc(config)?;
//!
//! let identity = eid.identity()?;
//! println!("{} {}", identity.first_names, identity.name);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "pcsc"))]
//! # fn main() {}
//! ```
//!
//! [`Executor`]: beid_apdu_core::Executor
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod application;
mod card;
pub mod certificate;
pub mod commands;
mod config;
pub mod constants;
pub mod crypto;
mod error;
pub mod monitor;
pub mod pin;
pub mod revocation;
pub mod session;
pub mod snapshot;
pub mod tlv;
pub mod types;

pub use application::BeId;
pub use card::EidCard;
pub use certificate::{
    Certificate, CertificateChain, CertificateRole, CertificateStatus, TrustAnchors, Verdict,
};
pub use commands::SignatureKind;
pub use config::BeIdConfig;
pub use error::{CardAbsence, Error, Result};
pub use monitor::{CardEvent, CardEventReceiver, PresenceMonitor};
pub use pin::PinBlock;
pub use revocation::{HttpFetcher, OcspStatus, RevocationFetcher};
pub use session::{CardGuard, ConnectedCard, Session, SharedSession};
pub use snapshot::{CertificateSnapshot, ChainSnapshot};
pub use tlv::TlvRecord;
pub use types::{
    AddressRecord, IdentityRecord, PhotoRecord, Sex, SpecialStatus, TokenInfo, VersionRecord,
};

#[cfg(feature = "pcsc")]
pub use beid_apdu_transport_pcsc::{PcscConfig, PcscDeviceManager, PcscTransport};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        AddressRecord, BeId, BeIdConfig, CardEvent, Certificate, CertificateChain, CertificateRole,
        CertificateStatus, Error, IdentityRecord, PhotoRecord, Result, SignatureKind, TrustAnchors,
        VersionRecord,
    };
    pub use beid_apdu_core::{CardTransport, DeviceManager};
}
