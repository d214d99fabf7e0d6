use crate::errors::{Error, Result};

/// Width, in bytes, of an encoded lookup code.
pub const CODE_WIDTH: usize = 4;

/// Encodes a lookup code as its fixed-width little-endian byte pattern.
///
/// The width is fixed at [`CODE_WIDTH`] bytes; the `u32` domain guarantees
/// every code fits without truncation.
pub fn encode_code(code: u32) -> [u8; CODE_WIDTH] {
    code.to_le_bytes()
}

/// Decodes a fixed-width little-endian byte pattern back into a lookup code.
pub fn decode_code(bytes: [u8; CODE_WIDTH]) -> u32 {
    u32::from_le_bytes(bytes)
}

/// Renders a byte sequence as lowercase hexadecimal text.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parses hexadecimal text back into bytes.
///
/// Fails with [`Error::InvalidHex`] on odd-length input or any non-hex
/// character; round-trips losslessly with [`to_hex`] for even-length strings.
pub fn from_hex(hex: &str) -> Result<Vec<u8>> {
    let raw = hex.as_bytes();
    if raw.len() % 2 != 0 {
        return Err(Error::InvalidHex(format!(
            "odd length {} in '{hex}'",
            raw.len()
        )));
    }
    let mut bytes = Vec::with_capacity(raw.len() / 2);
    for pair in raw.chunks_exact(2) {
        let hi = nibble(pair[0]);
        let lo = nibble(pair[1]);
        match (hi, lo) {
            (Some(hi), Some(lo)) => bytes.push((hi << 4) | lo),
            _ => return Err(Error::InvalidHex(format!("non-hex character in '{hex}'"))),
        }
    }
    Ok(bytes)
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Appends two trailing decimal digits to a numeric payload.
///
/// The payload is interpreted as a little-endian `u32`; appending two decimal
/// digits is a checked multiplication by 100. Fails with
/// [`Error::PayloadWidthMismatch`] when the payload is not exactly
/// [`CODE_WIDTH`] bytes and with [`Error::Overflow`] when the scaled value no
/// longer fits the width.
pub fn append_decimal_digits(payload: &[u8]) -> Result<Vec<u8>> {
    let value = numeric_value(payload)?;
    let scaled = value
        .checked_mul(100)
        .ok_or_else(|| Error::Overflow(format!("{value} * 100 exceeds u32")))?;
    Ok(scaled.to_le_bytes().to_vec())
}

/// Strips two trailing decimal digits from a numeric payload.
///
/// The inverse of [`append_decimal_digits`]: integer division by 100 on the
/// little-endian value.
pub fn strip_decimal_digits(payload: &[u8]) -> Result<Vec<u8>> {
    let value = numeric_value(payload)?;
    Ok((value / 100).to_le_bytes().to_vec())
}

fn numeric_value(payload: &[u8]) -> Result<u32> {
    let bytes: [u8; CODE_WIDTH] =
        payload
            .try_into()
            .map_err(|_| Error::PayloadWidthMismatch {
                expected: CODE_WIDTH,
                actual: payload.len(),
            })?;
    Ok(decode_code(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_little_endian() {
        assert_eq!(encode_code(0x0403_0201), [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(encode_code(1), [0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_encode_decode_round_trip() {
        for code in [0u32, 1, 255, 333_600_100, u32::MAX] {
            assert_eq!(decode_code(encode_code(code)), code);
        }
    }

    #[test]
    fn test_hex_round_trip() {
        let bytes = vec![0x00, 0x9e, 0x78, 0xff, 0x0a];
        assert_eq!(from_hex(&to_hex(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn test_hex_accepts_uppercase() {
        assert_eq!(from_hex("AA78").unwrap(), vec![0xaa, 0x78]);
    }

    #[test]
    fn test_from_hex_rejects_odd_length() {
        assert!(matches!(from_hex("abc"), Err(Error::InvalidHex(_))));
    }

    #[test]
    fn test_from_hex_rejects_non_hex() {
        assert!(matches!(from_hex("zz"), Err(Error::InvalidHex(_))));
        // Multi-byte UTF-8 must not panic on slicing
        assert!(matches!(from_hex("日本"), Err(Error::InvalidHex(_))));
    }

    #[test]
    fn test_append_digits_scales_by_hundred() {
        let payload = encode_code(4321);
        let scaled = append_decimal_digits(&payload).unwrap();
        assert_eq!(scaled, encode_code(432_100).to_vec());
    }

    #[test]
    fn test_append_digits_overflow() {
        let payload = encode_code(u32::MAX / 50);
        assert!(matches!(
            append_decimal_digits(&payload),
            Err(Error::Overflow(_))
        ));
    }

    #[test]
    fn test_strip_digits_inverts_append() {
        let payload = encode_code(98_700);
        let stripped = strip_decimal_digits(&payload).unwrap();
        assert_eq!(stripped, encode_code(987).to_vec());
    }

    #[test]
    fn test_scaling_rejects_wrong_width() {
        assert!(matches!(
            append_decimal_digits(&[0x01, 0x02]),
            Err(Error::PayloadWidthMismatch {
                expected: 4,
                actual: 2
            })
        ));
    }
}
