use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

/// How a characteristic write is acknowledged.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, StrumDisplay)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    #[strum(to_string = "with_response")]
    WithResponse,
    #[strum(to_string = "without_response")]
    WithoutResponse,
}

/// Wire encoding of a characteristic value.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, EnumString, IntoStaticStr, StrumDisplay,
)]
#[strum(serialize_all = "snake_case")]
pub enum ValueEncoding {
    Int32,
    Uint8,
    Utf8,
    Float32,
}

/// A typed characteristic value.
#[derive(Debug, Clone, PartialEq)]
pub enum CharacteristicValue {
    /// Signed 32-bit integer, sent as four little-endian bytes.
    Int32(i32),
    /// One unsigned byte.
    Uint8(u8),
    /// UTF-8 text, sent without a terminator.
    Utf8(String),
    /// 32-bit float, sent as its IEEE-754 bit pattern in a little-endian u32.
    Float32(f32),
}

impl CharacteristicValue {
    /// Builds a `Uint8` value from a wider integer by keeping its low byte.
    ///
    /// ```
    /// use blecentral::CharacteristicValue;
    ///
    /// assert_eq!(CharacteristicValue::Uint8(0x34), CharacteristicValue::uint8_from_low_byte(0x1234));
    /// ```
    #[must_use]
    pub fn uint8_from_low_byte(value: i64) -> Self {
        Self::Uint8(value.to_le_bytes()[0])
    }

    /// Returns the encoding of this value.
    #[must_use]
    pub fn encoding(&self) -> ValueEncoding {
        match self {
            Self::Int32(_) => ValueEncoding::Int32,
            Self::Uint8(_) => ValueEncoding::Uint8,
            Self::Utf8(_) => ValueEncoding::Utf8,
            Self::Float32(_) => ValueEncoding::Float32,
        }
    }

    /// Encodes the value into its wire bytes.
    ///
    /// ```
    /// use blecentral::CharacteristicValue;
    ///
    /// let bytes = CharacteristicValue::Float32(1.0).encode();
    /// assert_eq!(vec![0x00, 0x00, 0x80, 0x3F], bytes);
    /// ```
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Int32(value) => value.to_le_bytes().to_vec(),
            Self::Uint8(value) => vec![*value],
            Self::Utf8(value) => value.as_bytes().to_vec(),
            Self::Float32(value) => value.to_bits().to_le_bytes().to_vec(),
        }
    }

    /// Decodes wire bytes with the given encoding.
    ///
    /// Returns `None` when the byte count does not match a fixed-width
    /// encoding or the text is not valid UTF-8.
    #[must_use]
    pub fn decode(encoding: ValueEncoding, bytes: &[u8]) -> Option<Self> {
        match encoding {
            ValueEncoding::Int32 => {
                let raw: [u8; 4] = bytes.try_into().ok()?;
                Some(Self::Int32(i32::from_le_bytes(raw)))
            }
            ValueEncoding::Uint8 => match bytes {
                [value] => Some(Self::Uint8(*value)),
                _ => None,
            },
            ValueEncoding::Utf8 => std::str::from_utf8(bytes)
                .ok()
                .map(|text| Self::Utf8(text.to_string())),
            ValueEncoding::Float32 => {
                let raw: [u8; 4] = bytes.try_into().ok()?;
                Some(Self::Float32(f32::from_bits(u32::from_le_bytes(raw))))
            }
        }
    }
}

impl Display for CharacteristicValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int32(value) => write!(f, "{value}"),
            Self::Uint8(value) => write!(f, "{value}"),
            Self::Utf8(value) => write!(f, "{value:?}"),
            Self::Float32(value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn float_encodes_as_little_endian_bit_pattern() {
        let value = 3.14_f32;
        let bytes = CharacteristicValue::Float32(value).encode();

        assert_eq!(value.to_bits().to_le_bytes().to_vec(), bytes);
        assert_eq!(vec![0xC3, 0xF5, 0x48, 0x40], bytes);
    }

    #[test]
    fn float_decodes_back_exactly() {
        let bytes = CharacteristicValue::Float32(3.14).encode();
        let decoded = CharacteristicValue::decode(ValueEncoding::Float32, &bytes);

        assert_matches!(decoded, Some(CharacteristicValue::Float32(value)) if value.to_bits() == 3.14_f32.to_bits());
    }

    #[rstest]
    #[case(CharacteristicValue::Int32(1), vec![0x01, 0x00, 0x00, 0x00])]
    #[case(CharacteristicValue::Int32(-2), vec![0xFE, 0xFF, 0xFF, 0xFF])]
    #[case(CharacteristicValue::Uint8(0xAB), vec![0xAB])]
    #[case(CharacteristicValue::Utf8("hi".to_string()), vec![0x68, 0x69])]
    fn fixed_encodings_match_wire_layout(
        #[case] value: CharacteristicValue,
        #[case] expected: Vec<u8>,
    ) {
        assert_eq!(expected, value.encode());
    }

    #[test]
    fn uint8_keeps_only_low_byte() {
        assert_eq!(
            CharacteristicValue::Uint8(0xFF),
            CharacteristicValue::uint8_from_low_byte(-1)
        );
        assert_eq!(
            CharacteristicValue::Uint8(0x00),
            CharacteristicValue::uint8_from_low_byte(256)
        );
    }

    #[rstest]
    #[case(ValueEncoding::Int32, &[0x01, 0x02])]
    #[case(ValueEncoding::Uint8, &[])]
    #[case(ValueEncoding::Float32, &[0x00, 0x00, 0x00, 0x00, 0x00])]
    #[case(ValueEncoding::Utf8, &[0xFF, 0xFE])]
    fn decode_rejects_mismatched_lengths(#[case] encoding: ValueEncoding, #[case] bytes: &[u8]) {
        assert_eq!(None, CharacteristicValue::decode(encoding, bytes));
    }

    #[test]
    fn encoding_names_are_snake_case() {
        assert_eq!("float32", ValueEncoding::Float32.to_string());
        assert_eq!(Ok(ValueEncoding::Uint8), "uint8".parse::<ValueEncoding>());
    }
}
