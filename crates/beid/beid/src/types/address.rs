use serde::{Deserialize, Serialize};

use crate::Result;
use crate::constants::address_tags as tags;
use crate::tlv::TlvRecord;

/// Address file `DF01/4033`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    /// Street and house number
    pub street: String,
    /// Postal code
    pub zip_code: String,
    /// Municipality
    pub municipality: String,
}

impl AddressRecord {
    /// Decode the raw address file, ignoring trailing zero padding
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::from_tlv(&TlvRecord::decode(trim_padding(data)))
    }

    /// Build the record from decoded TLV elements
    pub fn from_tlv(tlv: &TlvRecord) -> Result<Self> {
        Ok(Self {
            street: tlv.string(tags::STREET)?,
            zip_code: tlv.string(tags::ZIP_CODE)?,
            municipality: tlv.string(tags::MUNICIPALITY)?,
        })
    }
}

/// Strip the zero bytes padding the address file
pub fn trim_padding(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &data[..end]
}
