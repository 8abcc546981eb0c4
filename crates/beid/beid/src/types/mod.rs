//! Records read from the card

mod address;
mod identity;
mod photo;
mod version;

pub use address::{AddressRecord, trim_padding};
pub use identity::{IdentityRecord, Sex, SpecialStatus};
pub use photo::PhotoRecord;
pub use version::{TokenInfo, VersionRecord};
