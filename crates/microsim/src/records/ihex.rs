use super::{decode_label, hex_string, parse_hex_bytes, Payload, Record, RecordError};

pub(super) const DATA: u8 = 0x00;
pub(super) const END: u8 = 0x01;
pub(super) const LABEL: u8 = 0x0A;

pub(super) const END_OF_FILE: &str = ":00000001FF";

/// Two's complement of the byte sum of every field before the checksum.
fn checksum(fields: &[u8]) -> u8 {
    fields
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b))
        .wrapping_neg()
}

pub(super) fn encode(address: u32, payload: &[u8], record_type: u8) -> Result<String, RecordError> {
    let address = u16::try_from(address).map_err(|_| RecordError::AddressTooWide(address))?;
    let length = u8::try_from(payload.len()).map_err(|_| RecordError::PayloadTooLong(payload.len()))?;

    let mut fields = Vec::with_capacity(payload.len() + 4);
    fields.push(length);
    fields.extend_from_slice(&address.to_be_bytes());
    fields.push(record_type);
    fields.extend_from_slice(payload);

    Ok(format!(":{}{:02x}", hex_string(&fields), checksum(&fields)))
}

pub(super) fn decode(line: &str) -> Result<Option<Record>, RecordError> {
    let bytes = parse_hex_bytes(&line[1..])?;
    if bytes.len() < 5 {
        return Err(RecordError::LengthMismatch {
            declared: bytes.first().map_or(0, |&b| usize::from(b)),
            found: bytes.len().saturating_sub(5),
        });
    }

    let (fields, found) = bytes.split_at(bytes.len() - 1);
    let declared = usize::from(fields[0]);
    if declared != fields.len() - 4 {
        return Err(RecordError::LengthMismatch {
            declared,
            found: fields.len() - 4,
        });
    }
    let expected = checksum(fields);
    if expected != found[0] {
        return Err(RecordError::Checksum {
            expected,
            found: found[0],
        });
    }

    let address = u32::from(u16::from_be_bytes([fields[1], fields[2]]));
    let payload = &fields[4..];
    match fields[3] {
        DATA => Ok(Some(Record {
            address,
            payload: Payload::Data(payload.to_vec()),
        })),
        LABEL => Ok(Some(Record {
            address,
            payload: Payload::Label(decode_label(payload.to_vec())?),
        })),
        END => Ok(None),
        other => Err(RecordError::UnsupportedType(format!("{other:02X}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_data_record() {
        // 02 + 10 + 00 + 00 + a9 + 2a = 0xe5, negated = 0x1b
        assert_eq!(
            encode(0x1000, &[0xa9, 0x2a], DATA).unwrap(),
            ":02100000a92a1b"
        );
    }

    #[test]
    fn end_of_file_checksum_is_valid() {
        assert_eq!(decode(END_OF_FILE), Ok(None));
        assert_eq!(encode(0, &[], END).unwrap().to_uppercase(), END_OF_FILE);
    }

    #[test]
    fn label_records_use_type_0a() {
        let line = encode(0x0040, b"start", LABEL).unwrap();
        assert_eq!(&line[7..9], "0a");
        let record = decode(&line).unwrap().unwrap();
        assert_eq!(record.address, 0x40);
        assert_eq!(record.label(), Some("start"));
    }

    #[test]
    fn rejects_addresses_beyond_sixteen_bits() {
        assert_eq!(
            encode(0x1_0000, &[1], DATA),
            Err(RecordError::AddressTooWide(0x1_0000))
        );
    }

    #[test]
    fn detects_bad_checksum() {
        assert!(matches!(
            decode(":02100000a92a1c"),
            Err(RecordError::Checksum {
                expected: 0x1b,
                found: 0x1c
            })
        ));
    }

    #[test]
    fn rejects_unknown_type() {
        let line = encode(0, &[], 0x04).unwrap();
        assert!(matches!(decode(&line), Err(RecordError::UnsupportedType(_))));
    }
}
