use crate::error::FixtureError;

/// Formats bytes as uppercase hexadecimal pairs separated by spaces.
pub(crate) fn format_hex(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "<empty>".to_string();
    }

    bytes
        .iter()
        .map(|byte| hex::encode_upper([*byte]))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses hex bytes, ignoring whitespace and `:` separators.
pub(crate) fn parse_hex(raw_value: &str) -> Result<Vec<u8>, FixtureError> {
    let cleaned: String = raw_value
        .chars()
        .filter(|character| !character.is_whitespace() && *character != ':')
        .collect();
    Ok(hex::decode(cleaned)?)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn format_hex_handles_empty_payload() {
        assert_eq!("<empty>", format_hex(&[]));
    }

    #[test]
    fn format_hex_formats_uppercase_pairs() {
        assert_eq!("02 F1 01 02 07 00", format_hex(&[0x02, 0xF1, 0x01, 0x02, 0x07, 0x00]));
    }

    #[rstest]
    #[case("02F1010207", vec![0x02, 0xF1, 0x01, 0x02, 0x07])]
    #[case("02 f1 01", vec![0x02, 0xF1, 0x01])]
    #[case("02:F1", vec![0x02, 0xF1])]
    #[case("", vec![])]
    fn parse_hex_accepts_common_spellings(#[case] raw: &str, #[case] expected: Vec<u8>) {
        assert_eq!(expected, parse_hex(raw).expect("hex should parse"));
    }

    #[rstest]
    #[case("ABC")]
    #[case("ZZ")]
    fn parse_hex_rejects_invalid_input(#[case] raw: &str) {
        assert_matches!(parse_hex(raw), Err(FixtureError::InvalidHex(_)));
    }
}
