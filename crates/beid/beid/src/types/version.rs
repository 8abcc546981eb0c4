use serde::{Deserialize, Serialize};

use crate::constants::limits;
use crate::{Error, Result};

const CHIP_NUMBER_LENGTH: usize = 16;

/// Personalisation bytes of the token info file `DF00/5032`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Graphical personalisation version
    pub graphical_personalisation: u8,
    /// Electrical personalisation version
    pub electrical_personalisation: u8,
    /// Electrical personalisation interface version
    pub electrical_personalisation_interface: u8,
    /// Reserved
    pub reserved: u8,
}

impl TokenInfo {
    /// Parse the token info file
    pub fn parse(data: &[u8]) -> Result<Self> {
        let bytes = data
            .get(limits::TOKEN_INFO_OFFSET..limits::TOKEN_INFO)
            .ok_or(Error::BufferTooSmall {
                needed: limits::TOKEN_INFO,
                actual: data.len(),
            })?;

        Ok(Self {
            graphical_personalisation: bytes[0],
            electrical_personalisation: bytes[1],
            electrical_personalisation_interface: bytes[2],
            reserved: bytes[3],
        })
    }
}

/// Chip and applet versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Chip serial number
    pub chip_number: [u8; CHIP_NUMBER_LENGTH],
    /// Component code
    pub component_code: u8,
    /// Operating system number
    pub os_number: u8,
    /// Operating system version
    pub os_version: u8,
    /// Softmask number
    pub softmask_number: u8,
    /// Softmask version
    pub softmask_version: u8,
    /// Applet version
    pub applet_version: u8,
    /// Global operating system version
    pub global_os_version: u8,
    /// Applet interface version
    pub applet_interface_version: u8,
    /// PKCS#1 support flags
    pub pkcs1_support: u8,
    /// Key exchange version
    pub key_exchange_version: u8,
    /// Application life cycle state
    pub application_life_cycle: u8,
    /// Personalisation versions
    pub token_info: TokenInfo,
}

impl VersionRecord {
    /// Parse the GET CARD DATA block and the token info file
    pub fn parse(card_data: &[u8], token_info: &[u8]) -> Result<Self> {
        if card_data.len() < limits::CARD_DATA {
            return Err(Error::BufferTooSmall {
                needed: limits::CARD_DATA,
                actual: card_data.len(),
            });
        }

        let mut chip_number = [0; CHIP_NUMBER_LENGTH];
        chip_number.copy_from_slice(&card_data[..CHIP_NUMBER_LENGTH]);

        Ok(Self {
            chip_number,
            component_code: card_data[16],
            os_number: card_data[17],
            os_version: card_data[18],
            softmask_number: card_data[19],
            softmask_version: card_data[20],
            applet_version: card_data[21],
            // byte 22 is not used
            global_os_version: card_data[23],
            applet_interface_version: card_data[24],
            pkcs1_support: card_data[25],
            key_exchange_version: card_data[26],
            application_life_cycle: card_data[27],
            token_info: TokenInfo::parse(token_info)?,
        })
    }

    /// Chip serial number as uppercase hex
    pub fn chip_number_hex(&self) -> String {
        hex::encode_upper(self.chip_number)
    }
}
