use chrono::{NaiveDate, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::constants::identity_tags as tags;
use crate::tlv::TlvRecord;
use crate::{Error, Result};

const VALIDITY_FORMAT: &str = "%d.%m.%Y";
const BIRTH_DATE_FORMATS: &[&str] = &["%d %b %Y", "%d.%b.%Y"];
const PHOTO_HASH_LENGTH: usize = 20;

/// Sex of the card holder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Sex {
    /// `M`
    #[display("male")]
    Male,
    /// `V`, `F` or `W`
    #[display("female")]
    Female,
}

impl Sex {
    /// Interpret the letter written on the card
    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'M' => Some(Self::Male),
            'V' | 'F' | 'W' => Some(Self::Female),
            _ => None,
        }
    }
}

/// Special status of the card holder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum SpecialStatus {
    /// No special status
    #[default]
    #[display("none")]
    None,
    /// White cane
    #[display("white cane")]
    WhiteCane,
    /// Extended minority
    #[display("extended minority")]
    ExtendedMinority,
    /// White cane and extended minority
    #[display("white cane, extended minority")]
    WhiteCaneExtendedMinority,
    /// Yellow cane
    #[display("yellow cane")]
    YellowCane,
    /// Yellow cane and extended minority
    #[display("yellow cane, extended minority")]
    YellowCaneExtendedMinority,
}

impl SpecialStatus {
    /// Status for the numeric code on the card; unknown codes mean none
    pub const fn from_code(code: u32) -> Self {
        match code {
            1 => Self::WhiteCane,
            2 => Self::ExtendedMinority,
            3 => Self::WhiteCaneExtendedMinority,
            4 => Self::YellowCane,
            5 => Self::YellowCaneExtendedMinority,
            _ => Self::None,
        }
    }

    /// Whether the holder has a white or yellow cane
    pub const fn has_cane(&self) -> bool {
        !matches!(self, Self::None | Self::ExtendedMinority)
    }

    /// Whether the holder has extended minority
    pub const fn is_extended_minority(&self) -> bool {
        matches!(
            self,
            Self::ExtendedMinority | Self::WhiteCaneExtendedMinority | Self::YellowCaneExtendedMinority
        )
    }
}

/// Identity file `DF01/4031`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Card number
    pub card_number: String,
    /// Chip number, uppercase hex
    pub chip_number: String,
    /// First day of validity
    pub valid_from: NaiveDate,
    /// Last day of validity
    pub valid_to: NaiveDate,
    /// Municipality that delivered the card
    pub delivery_municipality: String,
    /// National register number
    pub national_number: String,
    /// Surname
    pub name: String,
    /// First two first names
    pub first_names: String,
    /// Initial of the third first name, possibly empty
    pub third_initial: String,
    /// Nationality
    pub nationality: String,
    /// Place of birth
    pub birth_place: String,
    /// Date of birth
    pub birth_date: NaiveDate,
    /// Sex letter as written on the card
    pub sex: char,
    /// Noble condition, possibly empty
    pub noble_condition: String,
    /// Document type code
    pub document_type: u32,
    /// Special status
    pub special_status: SpecialStatus,
    /// SHA-1 of the photo file
    pub photo_hash: [u8; PHOTO_HASH_LENGTH],
}

impl IdentityRecord {
    /// Decode the raw identity file
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::from_tlv(&TlvRecord::decode(data))
    }

    /// Build the record from decoded TLV elements, checked against today's date
    pub fn from_tlv(tlv: &TlvRecord) -> Result<Self> {
        Self::from_tlv_at(tlv, Utc::now().date_naive())
    }

    /// Build the record from decoded TLV elements, checked against `today`
    pub fn from_tlv_at(tlv: &TlvRecord, today: NaiveDate) -> Result<Self> {
        let photo_hash = tlv
            .bytes(tags::PHOTO_HASH)?
            .try_into()
            .map_err(|_| Error::InvalidData("photo hash must be 20 bytes"))?;

        let record = Self {
            card_number: tlv.string(tags::CARD_NUMBER)?,
            chip_number: tlv.hex(tags::CHIP_NUMBER)?,
            valid_from: tlv.date(tags::VALIDITY_BEGIN, VALIDITY_FORMAT)?,
            valid_to: tlv.date(tags::VALIDITY_END, VALIDITY_FORMAT)?,
            delivery_municipality: tlv.string(tags::DELIVERY_MUNICIPALITY)?,
            national_number: tlv.string(tags::NATIONAL_NUMBER)?,
            name: tlv.string(tags::NAME)?,
            first_names: tlv.string(tags::FIRST_NAMES)?,
            third_initial: optional_string(tlv, tags::THIRD_INITIAL)?,
            nationality: tlv.string(tags::NATIONALITY)?,
            birth_place: tlv.string(tags::BIRTH_PLACE)?,
            birth_date: tlv.date_with_formats(tags::BIRTH_DATE, BIRTH_DATE_FORMATS)?,
            sex: tlv
                .string(tags::SEX)?
                .chars()
                .next()
                .ok_or(Error::InvalidData("sex is empty"))?,
            noble_condition: optional_string(tlv, tags::NOBLE_CONDITION)?,
            document_type: tlv.long(tags::DOCUMENT_TYPE)?,
            special_status: if tlv.contains(tags::SPECIAL_STATUS) {
                SpecialStatus::from_code(tlv.integer(tags::SPECIAL_STATUS)?)
            } else {
                SpecialStatus::None
            },
            photo_hash,
        };

        record.validate(today)?;
        Ok(record)
    }

    fn validate(&self, today: NaiveDate) -> Result<()> {
        if self.valid_from > self.valid_to {
            return Err(Error::InvalidData("validity begins after it ends"));
        }
        if self.birth_date > today {
            return Err(Error::InvalidData("birth date is in the future"));
        }
        if Sex::from_letter(self.sex).is_none() {
            return Err(Error::InvalidData("unknown sex"));
        }
        Ok(())
    }

    /// Sex of the holder
    pub fn sex(&self) -> Sex {
        Sex::from_letter(self.sex).unwrap_or(Sex::Male)
    }

    /// Whether the card is valid on `date`
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && date <= self.valid_to
    }
}

fn optional_string(tlv: &TlvRecord, tag: u8) -> Result<String> {
    if tlv.contains(tag) {
        tlv.string(tag)
    } else {
        Ok(String::new())
    }
}
