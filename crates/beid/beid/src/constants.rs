use derive_more::Display;

/// Elementary file on the card, addressed below the master file `3F00`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("3F00/{:04X}/{:04X}", df, ef)]
pub struct FileId {
    /// Dedicated file
    pub df: u16,
    /// Elementary file
    pub ef: u16,
}

impl FileId {
    /// Create a file identifier
    pub const fn new(df: u16, ef: u16) -> Self {
        Self { df, ef }
    }

    /// Absolute path used by SELECT: `3F00 || DF || EF`
    pub const fn path(&self) -> [u8; 6] {
        let [df_hi, df_lo] = self.df.to_be_bytes();
        let [ef_hi, ef_lo] = self.ef.to_be_bytes();
        [0x3F, 0x00, df_hi, df_lo, ef_hi, ef_lo]
    }
}

/// Files on the eID card
pub mod files {
    use super::FileId;

    /// Identity record
    pub const IDENTITY: FileId = FileId::new(0xDF01, 0x4031);
    /// National register signature over the identity record
    pub const IDENTITY_SIGNATURE: FileId = FileId::new(0xDF01, 0x4032);
    /// Address record
    pub const ADDRESS: FileId = FileId::new(0xDF01, 0x4033);
    /// National register signature over the address record and identity signature
    pub const ADDRESS_SIGNATURE: FileId = FileId::new(0xDF01, 0x4034);
    /// JPEG photo
    pub const PHOTO: FileId = FileId::new(0xDF01, 0x4035);

    /// PKCS#15 token info
    pub const TOKEN_INFO: FileId = FileId::new(0xDF00, 0x5032);
    /// Authentication certificate
    pub const AUTHENTICATION_CERTIFICATE: FileId = FileId::new(0xDF00, 0x5038);
    /// Non-repudiation signature certificate
    pub const SIGNATURE_CERTIFICATE: FileId = FileId::new(0xDF00, 0x5039);
    /// Citizen CA certificate
    pub const CA_CERTIFICATE: FileId = FileId::new(0xDF00, 0x503A);
    /// Belgium root certificate
    pub const ROOT_CERTIFICATE: FileId = FileId::new(0xDF00, 0x503B);
    /// National register certificate
    pub const NATIONAL_REGISTER_CERTIFICATE: FileId = FileId::new(0xDF00, 0x503C);
}

/// Maximum sizes reserved for card files
pub mod limits {
    /// Identity record
    pub const IDENTITY: usize = 1024;
    /// Address record
    pub const ADDRESS: usize = 512;
    /// Photo
    pub const PHOTO: usize = 4096;
    /// Record signature
    pub const SIGNATURE: usize = 256;
    /// Certificate
    pub const CERTIFICATE: usize = 2048;
    /// Token info; only the four bytes at [`TOKEN_INFO_OFFSET`] are used
    pub const TOKEN_INFO: usize = TOKEN_INFO_OFFSET + 4;
    /// Offset of the personalisation bytes in the token info file
    pub const TOKEN_INFO_OFFSET: usize = 0x25;
    /// Card data block returned by GET CARD DATA
    pub const CARD_DATA: usize = 0x1C;
}

/// Instruction bytes
pub mod ins {
    /// SELECT FILE
    pub const SELECT: u8 = 0xA4;
    /// READ BINARY
    pub const READ_BINARY: u8 = 0xB0;
    /// VERIFY
    pub const VERIFY: u8 = 0x20;
    /// CHANGE REFERENCE DATA
    pub const CHANGE_REFERENCE_DATA: u8 = 0x24;
    /// RESET RETRY COUNTER
    pub const RESET_RETRY_COUNTER: u8 = 0x2C;
    /// GET CHALLENGE
    pub const GET_CHALLENGE: u8 = 0x84;
    /// INTERNAL AUTHENTICATE
    pub const INTERNAL_AUTHENTICATE: u8 = 0x88;
    /// MANAGE SECURITY ENVIRONMENT
    pub const MANAGE_SECURITY_ENVIRONMENT: u8 = 0x22;
    /// PERFORM SECURITY OPERATION
    pub const PERFORM_SECURITY_OPERATION: u8 = 0x2A;
    /// Proprietary GET CARD DATA
    pub const GET_CARD_DATA: u8 = 0xE4;
}

/// Block size requested by each READ BINARY
pub const READ_BLOCK_SIZE: u8 = 0xF8;

/// Length of the random value returned by GET CHALLENGE
pub const CHALLENGE_LENGTH: u8 = 0x14;

/// Upper bound on the INTERNAL AUTHENTICATE response
pub const CHALLENGE_RESPONSE_LENGTH: u8 = 0x80;

/// Tag introducing the challenge in INTERNAL AUTHENTICATE
pub const CHALLENGE_TAG: u8 = 0x94;

/// Reference of the cardholder PIN
pub const PIN_REFERENCE: u8 = 0x01;

/// Length of an encoded PIN block
pub const PIN_BLOCK_LENGTH: usize = 8;

/// Remaining tries reported after a successful PIN verification
pub const PIN_TRIES_AFTER_SUCCESS: u8 = 3;

/// CN, O and C of the national register certificate subject, concatenated
pub const NATIONAL_REGISTER_NAME: &str = "RRNRRNBE";

/// Tags of the identity record
pub mod identity_tags {
    /// Card number
    pub const CARD_NUMBER: u8 = 0x01;
    /// Chip number
    pub const CHIP_NUMBER: u8 = 0x02;
    /// Start of card validity
    pub const VALIDITY_BEGIN: u8 = 0x03;
    /// End of card validity
    pub const VALIDITY_END: u8 = 0x04;
    /// Municipality that delivered the card
    pub const DELIVERY_MUNICIPALITY: u8 = 0x05;
    /// National number
    pub const NATIONAL_NUMBER: u8 = 0x06;
    /// Surname
    pub const NAME: u8 = 0x07;
    /// First two first names
    pub const FIRST_NAMES: u8 = 0x08;
    /// Initial of the third first name
    pub const THIRD_INITIAL: u8 = 0x09;
    /// Nationality
    pub const NATIONALITY: u8 = 0x0A;
    /// Place of birth
    pub const BIRTH_PLACE: u8 = 0x0B;
    /// Date of birth
    pub const BIRTH_DATE: u8 = 0x0C;
    /// Sex
    pub const SEX: u8 = 0x0D;
    /// Noble condition
    pub const NOBLE_CONDITION: u8 = 0x0E;
    /// Document type
    pub const DOCUMENT_TYPE: u8 = 0x0F;
    /// Special status
    pub const SPECIAL_STATUS: u8 = 0x10;
    /// SHA-1 of the photo file
    pub const PHOTO_HASH: u8 = 0x11;
}

/// Tags of the address record
pub mod address_tags {
    /// Street and number
    pub const STREET: u8 = 0x01;
    /// Zip code
    pub const ZIP_CODE: u8 = 0x02;
    /// Municipality
    pub const MUNICIPALITY: u8 = 0x03;
}
