//! Text encodings for fingerprints.
//!
//! - dHash: lowercase hex, one digit per 4 bits, most significant bit first.
//!   A 64-bit hash is exactly 16 digits. When the bit count is not a multiple
//!   of four the last digit is left-aligned and zero-padded.
//! - HSV-mean: comma-separated decimals in shortest round-trip form.
//!
//! Both forms are stable across processes: the client that extracts a
//! fingerprint and the server that stores it agree bit for bit.

use super::{square_side, DHashBits, Fingerprint, FingerprintKind};
use crate::error::CodecError;

const VECTOR_SEPARATOR: char = ',';

/// Encode any fingerprint according to its kind
pub fn encode(fingerprint: &Fingerprint) -> String {
    match fingerprint {
        Fingerprint::DHash(bits) => encode_hex(bits),
        Fingerprint::HsvMean(values) => encode_vector(values),
    }
}

/// Decode a fingerprint of a known kind
pub fn decode(kind: FingerprintKind, text: &str) -> Result<Fingerprint, CodecError> {
    match kind {
        FingerprintKind::DHash => decode_hex(text).map(Fingerprint::DHash),
        FingerprintKind::HsvMean => decode_vector(text).map(Fingerprint::HsvMean),
    }
}

/// Pack a dHash into hex digits
pub fn encode_hex(bits: &DHashBits) -> String {
    let digits = (bits.bit_count() as usize).div_ceil(4);
    let mut out = String::with_capacity(digits);

    for chunk in 0..digits {
        let mut nibble = 0u32;
        for offset in 0..4 {
            nibble <<= 1;
            if bits.bit((chunk * 4 + offset) as u32) {
                nibble |= 1;
            }
        }
        // nibble < 16
        out.push(char::from_digit(nibble, 16).unwrap_or('0'));
    }

    out
}

/// Expand hex digits back into a dHash
///
/// The bit count is the only perfect square that fits in the digits without a
/// whole spare digit, so `k` digits carry a square number of bits in
/// `(4(k-1), 4k]`.
pub fn decode_hex(text: &str) -> Result<DHashBits, CodecError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CodecError::Empty);
    }

    let digits = text.chars().count();
    let bit_count = square_bit_count(digits).ok_or(CodecError::InvalidLength { length: digits })?;

    let mut bits = Vec::with_capacity(digits * 4);
    for (position, digit) in text.chars().enumerate() {
        let value = digit
            .to_digit(16)
            .ok_or(CodecError::InvalidHexDigit { position, digit })?;
        for shift in (0..4).rev() {
            bits.push((value >> shift) & 1 == 1);
        }
    }

    if bits[bit_count..].iter().any(|&bit| bit) {
        return Err(CodecError::NonCanonicalPadding);
    }
    bits.truncate(bit_count);

    Ok(DHashBits::pack(bits))
}

fn square_bit_count(digits: usize) -> Option<usize> {
    let capacity = digits * 4;
    let side = square_side(capacity);
    let bits = side * side;
    (bits > capacity - 4).then_some(bits)
}

/// Render a dHash as a '0'/'1' string in generation order
pub fn to_bit_string(bits: &DHashBits) -> String {
    bits.bits().map(|bit| if bit { '1' } else { '0' }).collect()
}

/// Parse a '0'/'1' string into a dHash
///
/// The string must hold a square number of bits, like every hash the
/// extractor produces.
pub fn decode_bit_string(text: &str) -> Result<DHashBits, CodecError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CodecError::Empty);
    }

    let bits = text
        .chars()
        .enumerate()
        .map(|(position, bit)| match bit {
            '0' => Ok(false),
            '1' => Ok(true),
            _ => Err(CodecError::InvalidBit { position, bit }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    DHashBits::from_bits(bits)
}

/// Write an HSV-mean vector as delimited decimals
pub fn encode_vector(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(&VECTOR_SEPARATOR.to_string())
}

/// Parse delimited decimals into an HSV-mean vector
pub fn decode_vector(text: &str) -> Result<Vec<f64>, CodecError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CodecError::Empty);
    }

    text.split(VECTOR_SEPARATOR)
        .enumerate()
        .map(|(position, token)| {
            token
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| CodecError::InvalidNumber {
                    position,
                    value: token.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_ones_encodes_to_f() {
        let bits = DHashBits::from_bits(vec![true; 64]).unwrap();
        assert_eq!(encode_hex(&bits), "ffffffffffffffff");
    }

    #[test]
    fn all_zeros_encodes_to_zero() {
        let bits = DHashBits::from_bits(vec![false; 64]).unwrap();
        assert_eq!(encode_hex(&bits), "0000000000000000");
    }

    #[test]
    fn hex_digits_follow_bit_order() {
        let text = format!("1010{}1", "0".repeat(59));
        let bits = decode_bit_string(&text).unwrap();
        assert_eq!(encode_hex(&bits), "a000000000000001");
    }

    #[test]
    fn hex_round_trip() {
        let bits = DHashBits::from_u64(0xdead_beef_0123_4567);
        let text = encode_hex(&bits);
        assert_eq!(text, "deadbeef01234567");
        assert_eq!(decode_hex(&text).unwrap(), bits);
    }

    #[test]
    fn decode_accepts_uppercase() {
        let bits = decode_hex("DEADBEEF01234567").unwrap();
        assert_eq!(bits.as_u64(), Some(0xdead_beef_0123_4567));
    }

    #[test]
    fn odd_grid_uses_padded_last_digit() {
        // 9x9 = 81 bits -> 21 digits, last digit carries one bit
        let bits = DHashBits::from_bits(vec![true; 81]).unwrap();
        let text = encode_hex(&bits);
        assert_eq!(text.len(), 21);
        assert!(text.ends_with('8'));

        let decoded = decode_hex(&text).unwrap();
        assert_eq!(decoded.bit_count(), 81);
        assert_eq!(decoded.hash_size(), 9);
        assert_eq!(decoded, bits);
    }

    #[test]
    fn non_square_length_is_rejected() {
        assert_eq!(
            decode_hex("fffff"),
            Err(CodecError::InvalidLength { length: 5 })
        );
    }

    #[test]
    fn padding_bits_must_be_zero() {
        let mut text = "f".repeat(20);
        text.push('9');
        assert_eq!(decode_hex(&text), Err(CodecError::NonCanonicalPadding));
    }

    #[test]
    fn bad_hex_digit_reports_position() {
        assert_eq!(
            decode_hex("ffffffffffffffzf"),
            Err(CodecError::InvalidHexDigit {
                position: 14,
                digit: 'z'
            })
        );
    }

    #[test]
    fn empty_text_is_rejected() {
        assert_eq!(decode_hex("  "), Err(CodecError::Empty));
        assert_eq!(decode_vector(""), Err(CodecError::Empty));
    }

    #[test]
    fn bit_string_round_trip() {
        let text = "0110".repeat(16);
        let bits = decode_bit_string(&text).unwrap();
        assert_eq!(to_bit_string(&bits), text);
        assert_eq!(encode_hex(&bits), "6666666666666666");
    }

    #[test]
    fn bit_string_rejects_other_characters() {
        assert_eq!(
            decode_bit_string("0120"),
            Err(CodecError::InvalidBit {
                position: 2,
                bit: '2'
            })
        );
    }

    #[test]
    fn bit_string_must_form_a_square_grid() {
        assert_eq!(
            decode_bit_string(&"1".repeat(10)),
            Err(CodecError::InvalidLength { length: 10 })
        );
        assert_eq!(
            decode_bit_string(&"0".repeat(72)),
            Err(CodecError::InvalidLength { length: 72 })
        );

        // every accepted bit string survives the hex form
        let bits = decode_bit_string(&"1".repeat(81)).unwrap();
        assert_eq!(decode_hex(&encode_hex(&bits)).unwrap(), bits);
    }

    #[test]
    fn vector_round_trip_is_exact() {
        let values = vec![-0.5, 0.1 + 0.2, 1.0 / 3.0, 0.0, 42.0];
        let text = encode_vector(&values);
        assert_eq!(decode_vector(&text).unwrap(), values);
    }

    #[test]
    fn vector_reports_bad_token() {
        assert_eq!(
            decode_vector("0.5,abc"),
            Err(CodecError::InvalidNumber {
                position: 1,
                value: "abc".to_string()
            })
        );
    }

    #[test]
    fn vector_rejects_non_finite_values() {
        assert_eq!(
            decode_vector("inf,0"),
            Err(CodecError::InvalidNumber {
                position: 0,
                value: "inf".to_string()
            })
        );
        assert_eq!(
            decode_vector("0.5, NaN"),
            Err(CodecError::InvalidNumber {
                position: 1,
                value: " NaN".to_string()
            })
        );
        assert!(decode_vector("-infinity").is_err());
    }

    #[test]
    fn decode_dispatches_on_kind() {
        let fingerprint = decode(FingerprintKind::HsvMean, "0.25,-0.25").unwrap();
        assert_eq!(fingerprint, Fingerprint::HsvMean(vec![0.25, -0.25]));

        let fingerprint = decode(FingerprintKind::DHash, "0000000000000000").unwrap();
        assert_eq!(fingerprint.kind(), FingerprintKind::DHash);
        assert_eq!(fingerprint.len(), 64);
    }
}
