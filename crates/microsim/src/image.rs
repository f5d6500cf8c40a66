//! Loading assembled object files into memory and the control store.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::control::CONTROL_WORD_BYTES;
use crate::error::SimError;
use crate::execute::ControlUnit;
use crate::records::{self, Payload, Record};

/// Counts gathered while loading one object file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Data records placed.
    pub data_records: usize,
    /// Payload bytes placed.
    pub bytes: usize,
    /// Symbols carried by label records.
    pub labels: BTreeMap<String, u32>,
}

/// Decodes every non-blank line of an object file.
///
/// # Errors
///
/// Returns [`SimError::Record`] for the first malformed line.
pub fn parse_object(text: &str) -> Result<Vec<Record>, SimError> {
    let mut out = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match records::decode(line) {
            Ok(Some(record)) => out.push(record),
            Ok(None) => {}
            Err(source) => {
                return Err(SimError::Record {
                    line: index + 1,
                    source,
                })
            }
        }
    }
    Ok(out)
}

fn load_records(
    text: &str,
    mut place: impl FnMut(u32, &[u8]) -> Result<(), SimError>,
) -> Result<LoadSummary, SimError> {
    let mut summary = LoadSummary::default();
    for record in parse_object(text)? {
        match record.payload {
            Payload::Data(bytes) => {
                place(record.address, &bytes)?;
                summary.data_records += 1;
                summary.bytes += bytes.len();
            }
            Payload::Label(name) => {
                summary.labels.insert(name, record.address);
            }
        }
    }
    Ok(summary)
}

impl ControlUnit {
    /// Loads a program object file into memory at the record addresses.
    ///
    /// # Errors
    ///
    /// Returns a [`SimError`] for malformed records or data outside the image.
    pub fn load_program(&mut self, text: &str) -> Result<LoadSummary, SimError> {
        let summary = load_records(text, |address, bytes| {
            self.memory_mut().load(address, bytes)
        })?;
        info!(
            records = summary.data_records,
            bytes = summary.bytes,
            "program loaded"
        );
        Ok(summary)
    }

    /// Loads a microcode object file into the control store.
    ///
    /// Record addresses are control-store word addresses and every
    /// [`CONTROL_WORD_BYTES`] payload bytes form one little-endian control word.
    ///
    /// # Errors
    ///
    /// Returns a [`SimError`] for malformed records or words outside the store.
    pub fn load_microcode(&mut self, text: &str) -> Result<LoadSummary, SimError> {
        let summary = load_records(text, |address, bytes| {
            debug!(address, len = bytes.len(), "control words");
            let address = usize::try_from(address)
                .map_err(|_| SimError::Load(format!("control address {address:#x} out of range")))?;
            self.control_store_mut().load_bytes(address, bytes)
        })?;
        info!(
            records = summary.data_records,
            words = summary.bytes / CONTROL_WORD_BYTES,
            "microcode loaded"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{encode, encode_label, RecordFormat};

    #[test]
    fn program_records_land_at_their_addresses() {
        let text = [
            encode(RecordFormat::SRecord, 0x0010, &[0xA9, 0x05]).unwrap(),
            encode_label(RecordFormat::SRecord, 0x0010, "start").unwrap(),
        ]
        .join("\n");
        let mut unit = ControlUnit::default();
        let summary = unit.load_program(&text).unwrap();

        assert_eq!(summary.data_records, 1);
        assert_eq!(summary.bytes, 2);
        assert_eq!(summary.labels.get("start"), Some(&0x0010));
        assert_eq!(unit.memory().read_word(0x0010), 0x05A9);
    }

    #[test]
    fn microcode_records_fill_control_words() {
        let text = format!(
            "{}\n{}\n",
            encode(RecordFormat::IntelHex, 8, &[1, 0, 0, 0, 0, 0, 0, 0x08]).unwrap(),
            RecordFormat::IntelHex.end_of_file().unwrap()
        );
        let mut unit = ControlUnit::default();
        unit.load_microcode(&text).unwrap();
        assert_eq!(unit.control_store().raw(8), Ok(0x0800_0000_0000_0001));
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let text = "\nS1051000a92a17\nS1051000a92a18\n";
        assert!(matches!(
            parse_object(text),
            Err(SimError::Record { line: 3, .. })
        ));
    }
}
