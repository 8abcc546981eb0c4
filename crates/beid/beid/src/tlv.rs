//! Tag-length-value records as stored on the eID card
//!
//! Each element is a one-byte tag, a length and the value bytes. Lengths of
//! 255 or more are written as a run of `0xFF` bytes followed by a final byte
//! below `0xFF`; the length is the sum of the run.

use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::NaiveDate;

use crate::{Error, Result};

const CONTINUATION: u8 = 0xFF;

/// Month names as written on Belgian cards, mapped to their English abbreviation
///
/// Applied in order, first occurrence only, after uppercasing.
const MONTH_REPLACEMENTS: &[(&str, &str)] = &[
    ("FEV", "FEB"),
    ("MARS", "MAR"),
    ("MAAR", "MAR"),
    ("MARZ", "MAR"),
    ("MÄRZ", "MAR"),
    ("MÄR", "MAR"),
    ("AVR", "APR"),
    ("MEI", "MAY"),
    ("MAI", "MAY"),
    ("JUIN", "JUN"),
    ("JUIL", "JUL"),
    ("AOÛT", "AUG"),
    ("AOUT", "AUG"),
    ("SEPT", "SEP"),
    ("OKT", "OCT"),
    ("DEZ", "DEC"),
];

/// Decoded TLV record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlvRecord {
    elements: BTreeMap<u8, Bytes>,
}

impl TlvRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a record from a buffer
    pub fn decode(buffer: &[u8]) -> Self {
        let mut record = Self::new();
        record.merge(buffer);
        record
    }

    /// Decode `buffer` into this record
    ///
    /// A tag already present is only replaced by a declaration with a
    /// non-zero length. Decoding stops at the end of the buffer; a value
    /// running past the end is truncated to the bytes available.
    pub fn merge(&mut self, buffer: &[u8]) {
        let mut pos = 0;

        while pos < buffer.len() {
            let tag = buffer[pos];
            pos += 1;

            let Some(&first) = buffer.get(pos) else {
                break;
            };

            if first == 0 && self.elements.contains_key(&tag) {
                pos += 1;
                continue;
            }

            let mut length = 0usize;
            loop {
                let Some(&byte) = buffer.get(pos) else {
                    return;
                };
                pos += 1;
                length += byte as usize;
                if byte != CONTINUATION {
                    break;
                }
            }

            let end = pos.saturating_add(length).min(buffer.len());
            self.elements
                .insert(tag, Bytes::copy_from_slice(&buffer[pos..end]));
            pos = end;
        }
    }

    /// Encode the record, tags in ascending order
    pub fn encode(&self) -> Bytes {
        let mut buffer = BytesMut::new();
        for (&tag, value) in &self.elements {
            buffer.put_u8(tag);
            let mut remaining = value.len();
            while remaining >= CONTINUATION as usize {
                buffer.put_u8(CONTINUATION);
                remaining -= CONTINUATION as usize;
            }
            buffer.put_u8(remaining as u8);
            buffer.put_slice(value);
        }
        buffer.freeze()
    }

    /// Set the value of `tag`
    pub fn insert(&mut self, tag: u8, value: impl Into<Bytes>) {
        self.elements.insert(tag, value.into());
    }

    /// Raw value of `tag`, if present
    pub fn value(&self, tag: u8) -> Option<&[u8]> {
        self.elements.get(&tag).map(Bytes::as_ref)
    }

    /// Whether `tag` is present
    pub fn contains(&self, tag: u8) -> bool {
        self.elements.contains_key(&tag)
    }

    /// Number of tags in the record
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the record holds no tags
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate over `(tag, value)` pairs in tag order
    pub fn iter(&self) -> impl Iterator<Item = (u8, &[u8])> {
        self.elements.iter().map(|(&tag, value)| (tag, value.as_ref()))
    }

    /// Raw value of `tag`
    pub fn bytes(&self, tag: u8) -> Result<&[u8]> {
        self.value(tag).ok_or(Error::TagNotFound(tag))
    }

    /// Value of `tag` as text
    ///
    /// Invalid UTF-8 is read as ISO-8859-1.
    pub fn string(&self, tag: u8) -> Result<String> {
        let bytes = self.bytes(tag)?;
        Ok(match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
        })
    }

    /// Value of `tag` as uppercase hexadecimal
    pub fn hex(&self, tag: u8) -> Result<String> {
        self.bytes(tag).map(hex::encode_upper)
    }

    /// Rightmost two ASCII digits of `tag`, left-padded with `'0'`
    pub fn integer(&self, tag: u8) -> Result<u32> {
        ascii_decimal(self.bytes(tag)?, 2)
    }

    /// Rightmost four ASCII digits of `tag`, left-padded with `'0'`
    pub fn long(&self, tag: u8) -> Result<u32> {
        ascii_decimal(self.bytes(tag)?, 4)
    }

    /// Value of `tag` as a date written in `format` (chrono syntax)
    ///
    /// Dutch, French and German month names are normalised to English and
    /// a single-digit day is zero-padded before parsing.
    pub fn date(&self, tag: u8, format: &str) -> Result<NaiveDate> {
        self.date_with_formats(tag, &[format])
    }

    /// Value of `tag` as a date matching the first format that parses
    pub fn date_with_formats(&self, tag: u8, formats: &[&str]) -> Result<NaiveDate> {
        let text = normalize_date(&self.string(tag)?);
        formats
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(&text, format).ok())
            .ok_or(Error::DateParse { tag, value: text })
    }
}

impl FromIterator<(u8, Bytes)> for TlvRecord {
    fn from_iter<I: IntoIterator<Item = (u8, Bytes)>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

/// Replace localized month names and zero-pad the day
pub(crate) fn normalize_date(text: &str) -> String {
    let mut data = text.to_uppercase();
    for (from, to) in MONTH_REPLACEMENTS {
        if let Some(pos) = data.find(from) {
            data.replace_range(pos..pos + from.len(), to);
        }
    }
    if data.chars().nth(1) == Some(' ') {
        data.insert(0, '0');
    }
    data
}

fn ascii_decimal(value: &[u8], width: usize) -> Result<u32> {
    let tail = &value[value.len().saturating_sub(width)..];
    let mut result = 0;
    for &byte in std::iter::repeat_n(&b'0', width - tail.len()).chain(tail) {
        if !byte.is_ascii_digit() {
            return Err(Error::InvalidData("numeric field holds a non-digit"));
        }
        result = result * 10 + u32::from(byte - b'0');
    }
    Ok(result)
}
