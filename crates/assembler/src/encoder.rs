//! Code generation (pass 2).
//!
//! Turns a resolved line into output units and the output into object
//! records. Memory lines produce bytes; `mc` lines produce full-width control
//! words, one per control-store address.

use microsim::{RecordError, RecordFormat, CONTROL_WORD_BYTES, MAX_RECORD_PAYLOAD};

use crate::table::{InstructionRecord, OperandWidth};

/// Bytes in one control-store unit as written to the object file.
pub const UNIT_BYTES: usize = CONTROL_WORD_BYTES;

/// Encoded output of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Bytes at consecutive memory addresses.
    Bytes(Vec<u8>),
    /// Control words at consecutive control-store addresses.
    Units(Vec<u64>),
}

impl Output {
    /// Returns `true` when the line emits nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::Units(units) => units.is_empty(),
        }
    }

    /// Number of addresses the output occupies.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(bytes) => bytes.len(),
            Self::Units(units) => units.len(),
        }
    }

    /// Serialized bytes; units are little-endian.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Bytes(bytes) => bytes.clone(),
            Self::Units(units) => units.iter().flat_map(|u| u.to_le_bytes()).collect(),
        }
    }
}

fn push_operand(out: &mut Vec<u8>, value: i64, width: OperandWidth) {
    out.extend_from_slice(&value.to_le_bytes()[..width.bytes()]);
}

/// Encodes one line's resolved operands under its instruction record.
#[must_use]
pub fn encode_line(record: InstructionRecord, operands: &[i64]) -> Output {
    match record {
        InstructionRecord::NoOperand(_) => Output::Bytes(Vec::new()),
        InstructionRecord::OperandsOnly(width) => {
            let mut bytes = Vec::with_capacity(operands.len() * width.bytes());
            for &value in operands {
                push_operand(&mut bytes, value, width);
            }
            Output::Bytes(bytes)
        }
        #[allow(clippy::cast_sign_loss)]
        InstructionRecord::OneUnitPerOperand => {
            Output::Units(operands.iter().map(|&value| value as u64).collect())
        }
        InstructionRecord::Instruction { opcode, width } => {
            let mut bytes = vec![opcode];
            if let Some(width) = width {
                for &value in operands {
                    push_operand(&mut bytes, value, width);
                }
            }
            Output::Bytes(bytes)
        }
    }
}

/// Writes `output` starting at `address` as one or more object records.
///
/// Byte output is split into records of at most [`MAX_RECORD_PAYLOAD`] bytes.
/// Unit output keeps whole units per record and addresses each record by its
/// first unit.
///
/// # Errors
///
/// Returns a [`RecordError`] when an address does not fit the format.
pub fn object_records(
    format: RecordFormat,
    address: u32,
    output: &Output,
) -> Result<Vec<String>, RecordError> {
    let (bytes, unit) = match output {
        Output::Bytes(bytes) => (bytes.clone(), 1),
        Output::Units(_) => (output.to_bytes(), UNIT_BYTES),
    };
    let chunk_len = MAX_RECORD_PAYLOAD - MAX_RECORD_PAYLOAD % unit;

    bytes
        .chunks(chunk_len)
        .enumerate()
        .map(|(index, chunk)| {
            let offset = u32::try_from(index * chunk_len / unit)
                .map_err(|_| RecordError::AddressTooWide(address))?;
            let start = address
                .checked_add(offset)
                .ok_or(RecordError::AddressTooWide(address))?;
            microsim::encode(format, start, chunk)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Directive;
    use microsim::{decode, Payload};

    const LDA_IMM: InstructionRecord = InstructionRecord::Instruction {
        opcode: 0x21,
        width: Some(OperandWidth::Byte),
    };

    #[test]
    fn instruction_is_opcode_then_operands() {
        assert_eq!(encode_line(LDA_IMM, &[5]), Output::Bytes(vec![0x21, 5]));
        let jsr = InstructionRecord::Instruction { opcode: 3, width: Some(OperandWidth::Word) };
        assert_eq!(encode_line(jsr, &[0x1234]), Output::Bytes(vec![3, 0x34, 0x12]));
    }

    #[test]
    fn operand_bytes_are_masked() {
        assert_eq!(encode_line(LDA_IMM, &[0x1FF]), Output::Bytes(vec![0x21, 0xFF]));
        let dc_w = InstructionRecord::OperandsOnly(OperandWidth::Word);
        assert_eq!(encode_line(dc_w, &[-1]), Output::Bytes(vec![0xFF, 0xFF]));
    }

    #[test]
    fn operandless_instruction_is_just_opcode() {
        let nop = InstructionRecord::Instruction { opcode: 0, width: None };
        assert_eq!(encode_line(nop, &[]), Output::Bytes(vec![0]));
    }

    #[test]
    fn data_directive_has_no_opcode() {
        let dc_b = InstructionRecord::OperandsOnly(OperandWidth::Byte);
        assert_eq!(encode_line(dc_b, &[1, 2, 3]), Output::Bytes(vec![1, 2, 3]));
        let dword = InstructionRecord::OperandsOnly(OperandWidth::Dword);
        assert_eq!(
            encode_line(dword, &[0x0102_0304]),
            Output::Bytes(vec![4, 3, 2, 1])
        );
    }

    #[test]
    fn microcode_words_are_full_width_units() {
        let out = encode_line(InstructionRecord::OneUnitPerOperand, &[0x0800_0000_0000_0001, 7]);
        assert_eq!(out, Output::Units(vec![0x0800_0000_0000_0001, 7]));
        assert_eq!(out.len(), 2);
        assert_eq!(
            out.to_bytes(),
            [1, 0, 0, 0, 0, 0, 0, 0x08, 7, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn directives_emit_nothing() {
        let out = encode_line(InstructionRecord::NoOperand(Directive::Org), &[0x10]);
        assert!(out.is_empty());
    }

    #[test]
    fn long_output_is_split_into_records() {
        let output = Output::Bytes((0..=255).collect());
        let records = object_records(RecordFormat::SRecord, 0x100, &output).unwrap();
        assert_eq!(records.len(), 2);

        let first = decode(&records[0]).unwrap().unwrap();
        let second = decode(&records[1]).unwrap().unwrap();
        assert_eq!(first.address, 0x100);
        let Payload::Data(head) = first.payload else { panic!("data record") };
        assert_eq!(head.len(), MAX_RECORD_PAYLOAD);
        assert_eq!(second.address, 0x100 + u32::try_from(MAX_RECORD_PAYLOAD).unwrap());
        let Payload::Data(tail) = second.payload else { panic!("data record") };
        assert_eq!(head.len() + tail.len(), 256);
    }

    #[test]
    fn unit_records_are_addressed_by_unit() {
        let output = Output::Units((0..100).collect());
        let records = object_records(RecordFormat::SRecord, 8, &output).unwrap();
        let per_record = MAX_RECORD_PAYLOAD / UNIT_BYTES;
        assert_eq!(records.len(), 2);

        let second = decode(&records[1]).unwrap().unwrap();
        assert_eq!(second.address, 8 + u32::try_from(per_record).unwrap());
        let Payload::Data(bytes) = second.payload else { panic!("data record") };
        assert_eq!(bytes.len(), (100 - per_record) * UNIT_BYTES);
        assert_eq!(bytes[..UNIT_BYTES], u64::try_from(per_record).unwrap().to_le_bytes());
    }

    #[test]
    fn intel_hex_rejects_wide_addresses() {
        let output = Output::Bytes(vec![1]);
        assert_eq!(
            object_records(RecordFormat::IntelHex, 0x1_0000, &output),
            Err(RecordError::AddressTooWide(0x1_0000))
        );
    }
}
