use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

/// Error returned when a Bluetooth address string is malformed.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[error("invalid Bluetooth address `{value}`: expected six colon-separated hex bytes")]
pub struct AddressParseError {
    value: String,
}

/// A Bluetooth device address (`BD_ADDR`), most significant byte first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct BdAddr([u8; 6]);

impl BdAddr {
    /// Creates an address from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Returns the raw address bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Derives the LE random static address used by the HID identity.
    ///
    /// The two most significant bits are set, as required for static random
    /// addresses, and the last bit is flipped so the LE identity never equals
    /// the Classic one.
    ///
    /// ```
    /// use knob_link::BdAddr;
    ///
    /// let classic: BdAddr = "24:0A:C4:12:34:56".parse()?;
    /// assert_eq!("E4:0A:C4:12:34:57", classic.random_static().to_string());
    /// # Ok::<(), knob_link::AddressParseError>(())
    /// ```
    #[must_use]
    pub const fn random_static(&self) -> Self {
        let mut bytes = self.0;
        bytes[0] |= 0xC0;
        bytes[5] ^= 0x01;
        Self(bytes)
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl fmt::Debug for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BdAddr({self})")
    }
}

impl FromStr for BdAddr {
    type Err = AddressParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressParseError {
            value: value.to_string(),
        };

        let mut bytes = [0u8; 6];
        let mut parts = value.trim().split(':');
        for byte in &mut bytes {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_error| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }
}

impl From<[u8; 6]> for BdAddr {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

impl From<BdAddr> for [u8; 6] {
    fn from(address: BdAddr) -> Self {
        address.0
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn formats_as_uppercase_colon_hex() {
        let address = BdAddr::new([0x0A, 0xB1, 0x2C, 0xD3, 0x4E, 0xF5]);
        assert_eq!("0A:B1:2C:D3:4E:F5", address.to_string());
    }

    #[test]
    fn parses_lowercase_hex() {
        let address: BdAddr = "aa:bb:cc:dd:ee:ff".parse().expect("address should parse");
        assert_eq!(&[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF], address.as_bytes());
    }

    #[rstest]
    #[case::short("AA:BB:CC:DD:EE")]
    #[case::long("AA:BB:CC:DD:EE:FF:00")]
    #[case::wide_part("AAA:BB:CC:DD:EE:FF")]
    #[case::not_hex("GG:BB:CC:DD:EE:FF")]
    #[case::empty("")]
    fn rejects_malformed_addresses(#[case] value: &str) {
        assert_matches!(value.parse::<BdAddr>(), Err(AddressParseError { .. }));
    }

    #[test]
    fn random_static_differs_from_base() {
        let base = BdAddr::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        let random = base.random_static();
        assert_eq!(&[0xC0, 0x11, 0x22, 0x33, 0x44, 0x54], random.as_bytes());
        assert_ne!(base, random);
    }
}
