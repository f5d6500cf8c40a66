//! Line-oriented object records shared by the assembler and the simulator.
//!
//! Two textual encodings are supported:
//! - **S-records** (`S1`/`S3` data, non-standard `S4`/`S6` label records)
//! - **Intel HEX** (type `00` data, `01` end of file, non-standard `0A` label records)
//!
//! Label records carry a symbol name in place of raw data. The assembler
//! writes one per symbol after pass 2 so that a later `isa` import can
//! recover named addresses from an object file.

mod ihex;
mod srec;

use thiserror::Error;

/// Largest payload (in bytes) a single record can carry in either format.
pub const MAX_RECORD_PAYLOAD: usize = 0xFF - 5;

/// Textual record encoding used for an object file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RecordFormat {
    /// Motorola S-records (`S1`/`S3`/`S4`/`S6`).
    #[default]
    SRecord,
    /// Intel HEX (`:`-prefixed, 16-bit addresses only).
    IntelHex,
}

impl RecordFormat {
    /// Detects the format of a record line from its leading marker.
    #[must_use]
    pub fn detect(line: &str) -> Option<Self> {
        match line.trim_start().chars().next()? {
            'S' | 's' => Some(Self::SRecord),
            ':' => Some(Self::IntelHex),
            _ => None,
        }
    }

    /// Returns the record that terminates an object file, if the format has one.
    #[must_use]
    pub const fn end_of_file(self) -> Option<&'static str> {
        match self {
            Self::SRecord => None,
            Self::IntelHex => Some(ihex::END_OF_FILE),
        }
    }
}

/// Contents of a decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Raw bytes to be placed at the record address.
    Data(Vec<u8>),
    /// A symbol name whose value is the record address.
    Label(String),
}

/// A decoded data or label record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Load address (data) or symbol value (label).
    pub address: u32,
    /// Record contents.
    pub payload: Payload,
}

impl Record {
    /// Returns the label name when this is a label record.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match &self.payload {
            Payload::Label(name) => Some(name),
            Payload::Data(_) => None,
        }
    }
}

/// Errors raised while encoding or decoding records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The line is empty or carries no recognised record marker.
    #[error("not a record: '{0}'")]
    NotARecord(String),
    /// The record type field is not one this codec understands.
    #[error("unsupported record type '{0}'")]
    UnsupportedType(String),
    /// A field contained something other than hexadecimal digit pairs.
    #[error("invalid hexadecimal digits in record")]
    InvalidHex,
    /// The declared length disagrees with the amount of data present.
    #[error("record length mismatch: declared {declared}, found {found}")]
    LengthMismatch {
        /// Length byte as written in the record.
        declared: usize,
        /// Length implied by the characters present.
        found: usize,
    },
    /// The trailing checksum byte is wrong.
    #[error("record checksum mismatch: expected {expected:#04x}, found {found:#04x}")]
    Checksum {
        /// Checksum computed from the record contents.
        expected: u8,
        /// Checksum written in the record.
        found: u8,
    },
    /// The payload does not fit in one record.
    #[error("record payload of {0} bytes is too long")]
    PayloadTooLong(usize),
    /// The address does not fit in the format's address field.
    #[error("address {0:#x} does not fit in the record address field")]
    AddressTooWide(u32),
    /// A label record's payload is not valid UTF-8.
    #[error("label record does not contain valid text")]
    InvalidLabel,
}

/// Encodes a data record carrying `bytes` at `address`.
///
/// # Errors
///
/// Returns [`RecordError::PayloadTooLong`] or [`RecordError::AddressTooWide`]
/// when the record cannot be represented in the chosen format.
pub fn encode(format: RecordFormat, address: u32, bytes: &[u8]) -> Result<String, RecordError> {
    match format {
        RecordFormat::SRecord => srec::encode(address, bytes, srec::Kind::Data),
        RecordFormat::IntelHex => ihex::encode(address, bytes, ihex::DATA),
    }
}

/// Encodes a non-standard label record binding `label` to `address`.
///
/// # Errors
///
/// Same conditions as [`encode`].
pub fn encode_label(format: RecordFormat, address: u32, label: &str) -> Result<String, RecordError> {
    match format {
        RecordFormat::SRecord => srec::encode(address, label.as_bytes(), srec::Kind::Label),
        RecordFormat::IntelHex => ihex::encode(address, label.as_bytes(), ihex::LABEL),
    }
}

/// Decodes one record line.
///
/// Returns `Ok(None)` for records that carry neither data nor a label
/// (headers, counts, start addresses, end of file).
///
/// # Errors
///
/// Returns a [`RecordError`] for malformed or unsupported records.
pub fn decode(line: &str) -> Result<Option<Record>, RecordError> {
    let line = line.trim();
    match RecordFormat::detect(line) {
        Some(RecordFormat::SRecord) => srec::decode(line),
        Some(RecordFormat::IntelHex) => ihex::decode(line),
        None => Err(RecordError::NotARecord(line.to_string())),
    }
}

fn parse_hex_bytes(digits: &str) -> Result<Vec<u8>, RecordError> {
    if digits.len() % 2 != 0 || !digits.is_ascii() {
        return Err(RecordError::InvalidHex);
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| RecordError::InvalidHex))
        .collect()
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn decode_label(bytes: Vec<u8>) -> Result<String, RecordError> {
    String::from_utf8(bytes).map_err(|_| RecordError::InvalidLabel)
}
