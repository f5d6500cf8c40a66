use super::{decode_label, hex_string, parse_hex_bytes, Payload, Record, RecordError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Kind {
    Data,
    Label,
}

/// Record type digit, upgraded to the 32-bit form when the address needs it.
const fn type_digit(kind: Kind, wide: bool) -> char {
    match (kind, wide) {
        (Kind::Data, false) => '1',
        (Kind::Data, true) => '3',
        (Kind::Label, false) => '4',
        (Kind::Label, true) => '6',
    }
}

fn checksum(length: u8, address: &[u8], payload: &[u8]) -> u8 {
    let sum = address
        .iter()
        .chain(payload)
        .fold(u32::from(length), |acc, &b| acc + u32::from(b));
    // Only the low byte participates; truncation is intended.
    #[allow(clippy::cast_possible_truncation)]
    let low = (sum & 0xFF) as u8;
    0xFF - low
}

pub(super) fn encode(address: u32, payload: &[u8], kind: Kind) -> Result<String, RecordError> {
    let wide = address > 0xFFFF;
    let address_bytes: Vec<u8> = if wide {
        address.to_be_bytes().to_vec()
    } else {
        address.to_be_bytes()[2..].to_vec()
    };
    let length = payload.len() + address_bytes.len() + 1;
    let length = u8::try_from(length).map_err(|_| RecordError::PayloadTooLong(payload.len()))?;

    Ok(format!(
        "S{}{length:02x}{}{}{:02x}",
        type_digit(kind, wide),
        hex_string(&address_bytes),
        hex_string(payload),
        checksum(length, &address_bytes, payload)
    ))
}

pub(super) fn decode(line: &str) -> Result<Option<Record>, RecordError> {
    let mut chars = line.chars();
    chars.next();
    let type_char = chars.next().ok_or_else(|| RecordError::NotARecord(line.to_string()))?;

    let (address_len, kind) = match type_char {
        '1' => (2, Some(Kind::Data)),
        '3' => (4, Some(Kind::Data)),
        '4' => (2, Some(Kind::Label)),
        '6' => (4, Some(Kind::Label)),
        '0' | '5' | '7' | '8' | '9' => (0, None),
        other => return Err(RecordError::UnsupportedType(format!("S{other}"))),
    };

    let bytes = parse_hex_bytes(chars.as_str())?;
    let Some((&length, rest)) = bytes.split_first() else {
        return Err(RecordError::LengthMismatch {
            declared: 0,
            found: 0,
        });
    };
    if usize::from(length) != rest.len() {
        return Err(RecordError::LengthMismatch {
            declared: usize::from(length),
            found: rest.len(),
        });
    }
    let Some(kind) = kind else {
        return Ok(None);
    };
    if rest.len() < address_len + 1 {
        return Err(RecordError::LengthMismatch {
            declared: usize::from(length),
            found: rest.len(),
        });
    }

    let (address_bytes, rest) = rest.split_at(address_len);
    let (payload, found) = rest.split_at(rest.len() - 1);
    let expected = checksum(length, address_bytes, payload);
    if expected != found[0] {
        return Err(RecordError::Checksum {
            expected,
            found: found[0],
        });
    }

    let address = address_bytes
        .iter()
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
    let payload = match kind {
        Kind::Data => Payload::Data(payload.to_vec()),
        Kind::Label => Payload::Label(decode_label(payload.to_vec())?),
    };
    Ok(Some(Record { address, payload }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_short_data_record() {
        // len = 2 data + 2 address + 1 = 5; sum = 5 + 0x10 + 0x00 + 0xa9 + 0x2a = 0xe8
        let line = encode(0x1000, &[0xa9, 0x2a], Kind::Data).unwrap();
        assert_eq!(line, "S1051000a92a17");
    }

    #[test]
    fn upgrades_to_wide_address() {
        let line = encode(0x0001_0000, &[0xff], Kind::Data).unwrap();
        assert!(line.starts_with("S306"));
        let line = encode(0x0001_0000, b"x", Kind::Label).unwrap();
        assert!(line.starts_with("S606"));
    }

    #[test]
    fn label_record_uses_type_four() {
        let line = encode(0x0008, b"lda.#", Kind::Label).unwrap();
        assert!(line.starts_with("S408"));
        let record = decode(&line).unwrap().unwrap();
        assert_eq!(record.payload, Payload::Label("lda.#".into()));
    }

    #[test]
    fn rejects_oversized_payload() {
        let payload = vec![0u8; 253];
        assert_eq!(
            encode(0, &payload, Kind::Data),
            Err(RecordError::PayloadTooLong(253))
        );
        assert!(encode(0, &payload[..252], Kind::Data).is_ok());
    }

    #[test]
    fn detects_bad_checksum() {
        let err = decode("S1051000a92a18").unwrap_err();
        assert_eq!(
            err,
            RecordError::Checksum {
                expected: 0x17,
                found: 0x18
            }
        );
    }

    #[test]
    fn detects_length_mismatch() {
        assert!(matches!(
            decode("S1061000a92a17"),
            Err(RecordError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn header_and_termination_records_carry_nothing() {
        assert_eq!(decode("S0030000fc"), Ok(None));
        assert_eq!(decode("S9030000fc"), Ok(None));
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(matches!(
            decode("S2030000fc"),
            Err(RecordError::UnsupportedType(_))
        ));
    }
}
