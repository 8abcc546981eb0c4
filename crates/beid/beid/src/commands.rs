//! APDU commands understood by the eID applet
//!
//! Every command is a typed wrapper around a [`Command`], paired with the
//! decoding of the card's answer through [`EidCommand`].

use beid_apdu_core::{ApduCommand, Command, Response};
use bytes::{BufMut, Bytes, BytesMut};
use derive_more::Display;

use crate::certificate::CertificateRole;
use crate::constants::{
    CHALLENGE_LENGTH, CHALLENGE_RESPONSE_LENGTH, CHALLENGE_TAG, FileId, PIN_BLOCK_LENGTH,
    PIN_REFERENCE, READ_BLOCK_SIZE, ins, limits,
};
use crate::pin::{self, PinBlock};
use crate::Result;

/// A card command paired with the decoding of its answer
pub trait EidCommand: ApduCommand {
    /// Name used in logs and error context
    const NAME: &'static str;

    /// Decoded answer
    type Output;

    /// Decode the card's answer
    fn parse(response: Response) -> Result<Self::Output>;
}

macro_rules! eid_commands {
    ($(
        $(#[$meta:meta])*
        pub struct $name:ident {
            ins: $ins:expr,
            response: $output:ty => $parse:expr $(,)?
        }
    )+) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(Command);

        impl $name {
            /// Instruction byte
            pub const INS: u8 = $ins;
        }

        impl ApduCommand for $name {
            fn class(&self) -> u8 {
                self.0.cla
            }

            fn instruction(&self) -> u8 {
                self.0.ins
            }

            fn p1(&self) -> u8 {
                self.0.p1
            }

            fn p2(&self) -> u8 {
                self.0.p2
            }

            fn data(&self) -> Option<&[u8]> {
                self.0.data.as_deref()
            }

            fn expected_length(&self) -> Option<u8> {
                self.0.le
            }
        }

        impl EidCommand for $name {
            const NAME: &'static str = stringify!($name);

            type Output = $output;

            fn parse(response: Response) -> Result<$output> {
                let parse: fn(Response) -> Result<$output> = $parse;
                parse(response)
            }
        }
    )+};
}

/// Payload of a 90 00 answer
fn payload(response: Response) -> Result<Bytes> {
    Ok(response.into_bytes_result()?)
}

eid_commands! {
    /// SELECT FILE by absolute path
    pub struct SelectFile {
        ins: ins::SELECT,
        response: Bytes => payload,
    }

    /// READ BINARY from the selected file
    ///
    /// The raw answer is returned since `6B 00` and `6C XX` end a file read.
    pub struct ReadBinary {
        ins: ins::READ_BINARY,
        response: Response => Ok,
    }

    /// Proprietary GET CARD DATA returning the chip and applet versions
    pub struct GetCardData {
        ins: ins::GET_CARD_DATA,
        response: Bytes => payload,
    }

    /// GET CHALLENGE
    pub struct GetChallenge {
        ins: ins::GET_CHALLENGE,
        response: Bytes => payload,
    }

    /// INTERNAL AUTHENTICATE over a host challenge
    pub struct InternalAuthenticate {
        ins: ins::INTERNAL_AUTHENTICATE,
        response: Bytes => payload,
    }

    /// VERIFY the cardholder PIN, answering the remaining tries
    pub struct Verify {
        ins: ins::VERIFY,
        response: u8 => |response| pin::tries_remaining(response.status()),
    }

    /// CHANGE REFERENCE DATA, answering the remaining tries
    pub struct ChangeReferenceData {
        ins: ins::CHANGE_REFERENCE_DATA,
        response: u8 => |response| pin::tries_remaining(response.status()),
    }

    /// RESET RETRY COUNTER with the combined citizen and government PUK
    pub struct ResetRetryCounter {
        ins: ins::RESET_RETRY_COUNTER,
        response: () => |response| payload(response).map(drop),
    }

    /// MANAGE SECURITY ENVIRONMENT selecting a signing key
    pub struct ManageSecurityEnvironment {
        ins: ins::MANAGE_SECURITY_ENVIRONMENT,
        response: () => |response| payload(response).map(drop),
    }

    /// PERFORM SECURITY OPERATION
    pub struct PerformSecurityOperation {
        ins: ins::PERFORM_SECURITY_OPERATION,
        response: Bytes => payload,
    }
}

/// Key used by the card to sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SignatureKind {
    /// Authentication key, certified by the authentication certificate
    #[display("authentication")]
    Authentication,
    /// Non-repudiation key, certified by the signature certificate
    #[display("non-repudiation")]
    NonRepudiation,
}

impl SignatureKind {
    /// Key reference selected by MANAGE SECURITY ENVIRONMENT
    pub const fn key_reference(&self) -> u8 {
        match self {
            Self::Authentication => 0x82,
            Self::NonRepudiation => 0x83,
        }
    }

    /// Role of the certificate certifying the key
    pub const fn certificate_role(&self) -> CertificateRole {
        match self {
            Self::Authentication => CertificateRole::Authentication,
            Self::NonRepudiation => CertificateRole::Signature,
        }
    }
}

impl SelectFile {
    /// Select `file` by its path from the master file
    pub fn new(file: FileId) -> Self {
        Self(Command::new_with_data_and_le(0x00, Self::INS, 0x08, 0x0C, file.path().to_vec(), 0x00))
    }
}

impl ReadBinary {
    /// Read `length` bytes at `offset`
    pub const fn new(offset: u16, length: u8) -> Self {
        let [p1, p2] = offset.to_be_bytes();
        Self(Command::new_with_le(0x00, Self::INS, p1, p2, length))
    }

    /// Read a full block at `offset`
    pub const fn block(offset: u16) -> Self {
        Self::new(offset, READ_BLOCK_SIZE)
    }
}

impl GetCardData {
    /// Request the card data block
    pub const fn new() -> Self {
        Self(Command::new_with_le(0x80, Self::INS, 0x00, 0x00, limits::CARD_DATA as u8))
    }
}

impl Default for GetCardData {
    fn default() -> Self {
        Self::new()
    }
}

impl GetChallenge {
    /// Request a random challenge from the card
    pub const fn new() -> Self {
        Self(Command::new_with_le(0x00, Self::INS, 0x00, 0x00, CHALLENGE_LENGTH))
    }
}

impl Default for GetChallenge {
    fn default() -> Self {
        Self::new()
    }
}

impl InternalAuthenticate {
    /// Ask the card to sign `challenge` with the authentication key
    pub fn new(challenge: &[u8]) -> Self {
        let mut data = BytesMut::with_capacity(challenge.len() + 2);
        data.put_u8(CHALLENGE_TAG);
        data.put_u8(challenge.len() as u8);
        data.put_slice(challenge);
        Self(Command::new_with_data_and_le(
            0x00,
            Self::INS,
            0x02,
            0x81,
            data.freeze(),
            CHALLENGE_RESPONSE_LENGTH,
        ))
    }
}

impl Verify {
    /// Verify the cardholder PIN
    pub fn new(pin: &PinBlock) -> Self {
        Self(Command::new_with_data(0x00, Self::INS, 0x00, PIN_REFERENCE, pin.to_bytes()))
    }
}

impl ChangeReferenceData {
    /// Change the cardholder PIN from `current` to `new`
    pub fn new(current: &PinBlock, new: &PinBlock) -> Self {
        let mut data = BytesMut::with_capacity(2 * PIN_BLOCK_LENGTH);
        data.put_slice(current.as_ref());
        data.put_slice(new.as_ref());
        Self(Command::new_with_data(0x00, Self::INS, 0x00, PIN_REFERENCE, data.freeze()))
    }
}

impl ResetRetryCounter {
    /// Unblock the cardholder PIN with the combined PUK
    pub fn new(puk: &PinBlock) -> Self {
        Self(Command::new_with_data(0x00, Self::INS, 0x00, PIN_REFERENCE, puk.to_bytes()))
    }
}

impl ManageSecurityEnvironment {
    /// Select the key for `kind` before a signature
    pub fn signing(kind: SignatureKind) -> Self {
        Self(Command::new_with_data(
            0x00,
            Self::INS,
            0x41,
            0xB6,
            Bytes::copy_from_slice(&[0x04, 0x80, 0x02, 0x84, kind.key_reference()]),
        ))
    }
}

impl PerformSecurityOperation {
    /// COMPUTE DIGITAL SIGNATURE over `digest`
    pub fn compute_signature(digest: &[u8]) -> Self {
        Self(Command::new_with_data(
            0x00,
            Self::INS,
            0x9E,
            0x9A,
            Bytes::copy_from_slice(digest),
        ))
    }
}
