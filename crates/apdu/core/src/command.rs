//! APDU command definitions and traits
//!
//! This module provides types and traits for working with APDU commands
//! according to ISO/IEC 7816-4. Only short APDUs are supported: Lc and Le
//! are single bytes, and an Le of `0x00` requests up to 256 bytes.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};


/// Expected length type for APDU commands
pub type ExpectedLength = u8;

/// Core trait for APDU commands
pub trait ApduCommand {
    /// Command class (CLA)
    fn class(&self) -> u8;

    /// Instruction code (INS)
    fn instruction(&self) -> u8;

    /// First parameter (P1)
    fn p1(&self) -> u8;

    /// Second parameter (P2)
    fn p2(&self) -> u8;

    /// Command payload data (optional)
    fn data(&self) -> Option<&[u8]>;

    /// Expected response length (optional)
    fn expected_length(&self) -> Option<ExpectedLength>;

    /// Convert to raw APDU bytes
    fn to_bytes(&self) -> Bytes {
        let length = 4
            + self.data().map_or(0, |data| 1 + data.len())
            + usize::from(self.expected_length().is_some());
        let mut buffer = BytesMut::with_capacity(length);

        // Header: CLA, INS, P1, P2
        buffer.put_u8(self.class());
        buffer.put_u8(self.instruction());
        buffer.put_u8(self.p1());
        buffer.put_u8(self.p2());

        // Add Lc and data if present
        if let Some(data) = self.data() {
            buffer.put_u8(data.len() as u8);
            buffer.put_slice(data);
        }

        if let Some(le) = self.expected_length() {
            buffer.put_u8(le);
        }

        buffer.freeze()
    }
}

/// Generic APDU command structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data (optional)
    pub data: Option<Bytes>,
    /// Expected length (optional)
    pub le: Option<ExpectedLength>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a new command with expected response length (Le)
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: ExpectedLength) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: Some(le),
        }
    }

    /// Create a new command with data payload
    pub fn new_with_data<T: Into<Bytes>>(cla: u8, ins: u8, p1: u8, p2: u8, data: T) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Some(data.into()),
            le: None,
        }
    }

    /// Create a new command with both data and expected length
    pub fn new_with_data_and_le<T: Into<Bytes>>(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: T,
        le: ExpectedLength,
    ) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Some(data.into()),
            le: Some(le),
        }
    }
}

impl ApduCommand for Command {
    fn class(&self) -> u8 {
        self.cla
    }

    fn instruction(&self) -> u8 {
        self.ins
    }

    fn p1(&self) -> u8 {
        self.p1
    }

    fn p2(&self) -> u8 {
        self.p2
    }

    fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    fn expected_length(&self) -> Option<ExpectedLength> {
        self.le
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CLA={:02X} INS={:02X} P1={:02X} P2={:02X}",
            self.cla, self.ins, self.p1, self.p2
        )?;
        if let Some(data) = &self.data {
            write!(f, " Lc={:02X}", data.len())?;
        }
        if let Some(le) = self.le {
            write!(f, " Le={le:02X}")?;
        }
        Ok(())
    }
}
