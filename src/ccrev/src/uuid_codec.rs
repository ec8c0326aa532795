//! Asset identifier transcoding.
//!
//! Cocos Creator keeps three encodings of the same asset UUID alive at once:
//!
//! - `RandomId22`: 22 characters. The first two are kept verbatim, the
//!   remaining 20 are base64 digits packing 30 hex nibbles.
//! - `CanonicalUuid36`: the usual `8-4-4-4-12` lowercase hex form.
//! - `CompressedId23`: a 5 character hex header followed by 18 base64 digits.
//!
//! Every function here is total. Input of the wrong shape is handed back
//! unchanged and a diagnostic is logged, since foreign or already-canonical
//! identifiers routinely flow through the same call sites.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// Base64 digits in value order
const BASE64_KEYS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Value assigned to characters outside the alphabet (the `=` slot)
const PADDING_VALUE: u8 = 64;

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

/// Dash-templated skeleton of a canonical UUID
const UUID_TEMPLATE: &[u8; 36] = b"xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx";

/// Hex digit appended before packing a canonical UUID tail into bytes
const PAD_NIBBLE: char = 'f';

/// Lenient decoder: accepts missing padding and non-zero trailing bits
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Padding must be exactly right, trailing bits are ignored
const PADDED: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical)
        .with_decode_allow_trailing_bits(true),
);

/// The three identifier encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum UuidForm {
    RandomId22,
    CanonicalUuid36,
    CompressedId23,
}

impl UuidForm {
    /// Guess the encoding of an identifier from its shape
    pub fn classify(id: &str) -> Option<Self> {
        match id.len() {
            22 if id.bytes().all(is_base64_digit) => Some(Self::RandomId22),
            36 if is_canonical(id) => Some(Self::CanonicalUuid36),
            23 if id.bytes().take(5).all(|b| b.is_ascii_hexdigit())
                && id.bytes().skip(5).all(is_base64_digit) =>
            {
                Some(Self::CompressedId23)
            }
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RandomId22 => "RandomId22",
            Self::CanonicalUuid36 => "CanonicalUuid36",
            Self::CompressedId23 => "CompressedId23",
        }
    }
}

fn is_base64_digit(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/'
}

fn is_canonical(id: &str) -> bool {
    id.bytes().zip(UUID_TEMPLATE.iter()).all(|(b, &t)| {
        if t == b'-' {
            b == b'-'
        } else {
            b.is_ascii_hexdigit()
        }
    })
}

fn base64_value(c: u8) -> u8 {
    BASE64_KEYS
        .iter()
        .position(|&k| k == c)
        .map(|i| i as u8)
        .unwrap_or(PADDING_VALUE)
}

/// Expand a 22 character id into canonical UUID form
///
/// Example: `fcmR3XADNLgJ1ByKhqcC5Z` -> `fc991dd7-0033-4b80-9d41-c8a86a702e59`
pub fn decode(id22: &str) -> String {
    if id22.len() != 22 || !id22.is_ascii() {
        return id22.to_string();
    }

    let input = id22.as_bytes();
    let mut out = *UUID_TEMPLATE;
    out[0] = input[0];
    out[1] = input[1];

    let mut slots = (0..out.len()).filter(|&i| UUID_TEMPLATE[i] != b'-').skip(2);

    for pair in input[2..].chunks(2) {
        let lhs = base64_value(pair[0]);
        let rhs = base64_value(pair[1]);
        let nibbles = [lhs >> 2, ((lhs & 3) << 2) | (rhs >> 4), rhs & 0xF];

        for nibble in nibbles {
            let Some(&hex) = HEX_CHARS.get(nibble as usize) else {
                tracing::warn!("cannot decode uuid {}: invalid character in pair", id22);
                return id22.to_string();
            };
            // 10 pairs * 3 nibbles == 30 remaining slots
            if let Some(slot) = slots.next() {
                out[slot] = hex;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Pack hex digit pairs into bytes, dropping a trailing odd digit
fn hex_pairs(text: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let even = &text[..text.len() - text.len() % 2];
    hex::decode(even)
}

/// Compress a canonical UUID into the 23 character form
pub fn compress(canonical36: &str) -> String {
    if !canonical36.is_ascii() || canonical36.len() < 5 {
        tracing::warn!("cannot compress uuid {}: too short", canonical36);
        return canonical36.to_string();
    }

    let (header, rest) = canonical36.split_at(5);
    let mut content = rest.replace('-', "");
    content.push(PAD_NIBBLE);

    let bytes = match hex_pairs(&content) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("cannot compress uuid {}: {}", canonical36, e);
            return canonical36.to_string();
        }
    };

    let encoded = STANDARD.encode(bytes);
    let kept = encoded.len().saturating_sub(2);
    format!("{}{}", header, &encoded[..kept])
}

/// Base64-decode everything after a two character header and hex-encode it
pub fn decompress(compressed: &str) -> String {
    if !compressed.is_ascii() || compressed.len() < 2 {
        tracing::warn!("cannot decompress uuid {}: too short", compressed);
        return compressed.to_string();
    }

    let (header, rest) = compressed.split_at(2);
    match LENIENT.decode(rest) {
        Ok(bytes) => format!("{}{}", header, hex::encode(bytes)),
        Err(e) => {
            tracing::warn!("cannot decompress uuid {}: {}", compressed, e);
            compressed.to_string()
        }
    }
}

/// Rebuild a 22 character id from the 23 character compressed form
///
/// This mirrors the framework tooling operation literally, including its
/// `len % 3` padding rule. For the standard 18 character tail that rule adds
/// no padding, decoding fails and the input comes back unchanged.
pub fn shorten_from_compressed(compressed23: &str) -> String {
    if !compressed23.is_ascii() || compressed23.len() < 5 {
        tracing::warn!("cannot shorten uuid {}: too short", compressed23);
        return compressed23.to_string();
    }

    let (header, tail) = compressed23.split_at(5);
    let padding = match tail.len() % 3 {
        1 => "==",
        2 => "=",
        _ => "",
    };

    let bytes = match PADDED.decode(format!("{}{}", tail, padding)) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("cannot shorten uuid {}: {}", compressed23, e);
            return compressed23.to_string();
        }
    };

    let long = format!("{}{}", header, hex::encode(bytes));
    match repack_hex_tail(&long) {
        Some(repacked) if repacked.len() >= 4 => format!("{}{}", &repacked[..4], tail),
        _ => {
            tracing::warn!("cannot shorten uuid {}: header is not hex", compressed23);
            compressed23.to_string()
        }
    }
}

/// Header of two characters followed by the base64 of the remaining hex pairs
fn repack_hex_tail(long: &str) -> Option<String> {
    let (header, rest) = long.split_at(2);
    let mut content = rest.replace('-', "");
    content.push(PAD_NIBBLE);
    let bytes = hex_pairs(&content).ok()?;
    Some(format!("{}{}", header, STANDARD.encode(bytes)))
}

/// Best-effort canonical form of any recognized identifier
pub fn to_canonical(id: &str) -> Option<String> {
    match UuidForm::classify(id)? {
        UuidForm::CanonicalUuid36 => Some(id.to_ascii_lowercase()),
        UuidForm::RandomId22 => Some(decode(id)),
        UuidForm::CompressedId23 => {
            let short = shorten_from_compressed(id);
            (short.len() == 22).then(|| decode(&short))
        }
    }
    .filter(|canonical| is_canonical(canonical))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: &str = "fcmR3XADNLgJ1ByKhqcC5Z";
    const CANONICAL: &str = "fc991dd7-0033-4b80-9d41-c8a86a702e59";

    #[test]
    fn test_decode_worked_example() {
        assert_eq!(decode(SHORT), CANONICAL);
    }

    #[test]
    fn test_decode_wrong_length_is_identity() {
        assert_eq!(decode(""), "");
        assert_eq!(decode("abc"), "abc");
        assert_eq!(decode(CANONICAL), CANONICAL);
        assert_eq!(decode("fcmR3XADNLgJ1ByKhqcC5Zx"), "fcmR3XADNLgJ1ByKhqcC5Zx");
    }

    #[test]
    fn test_decode_shape_over_alphabet() {
        let samples = [
            "AAAAAAAAAAAAAAAAAAAAAA",
            "//////////////////////",
            "abcdefghijklmnopqrstuv",
            "0123456789+/ABCDEFGHIJ",
            "zZ9+yY8/xX7wW6vV5uU4tT",
        ];
        for sample in samples {
            let decoded = decode(sample);
            assert_eq!(decoded.len(), 36, "{}", sample);
            for (i, c) in decoded.chars().enumerate() {
                if [8, 13, 18, 23].contains(&i) {
                    assert_eq!(c, '-');
                } else if i >= 2 {
                    assert!(c.is_ascii_hexdigit(), "{} at {}", decoded, i);
                }
            }
        }
    }

    #[test]
    fn test_decode_foreign_character_in_left_slot() {
        // `!` maps to the padding value; 64 >> 2 has no hex digit
        let input = "ab!AAAAAAAAAAAAAAAAAAA";
        assert_eq!(decode(input), input);
    }

    #[test]
    fn test_decode_foreign_character_in_right_slot() {
        let decoded = decode("abA!AAAAAAAAAAAAAAAAAA");
        assert_eq!(decoded.len(), 36);
        assert!(decoded.starts_with("ab040"));
    }

    #[test]
    fn test_compress_canonical() {
        assert_eq!(compress(CANONICAL), "fc9913XADNLgJ1ByKhqcC5Z");
    }

    #[test]
    fn test_compress_rejects_non_hex() {
        let input = "zzzzzzzz-not-a-uuid";
        assert_eq!(compress(input), input);
    }

    #[test]
    fn test_decompress() {
        assert_eq!(decompress("abAQL/"), "ab0102ff");
    }

    #[test]
    fn test_decompress_invalid_is_identity() {
        // 21 base64 digits cannot be decoded
        assert_eq!(
            decompress("fc9913XADNLgJ1ByKhqcC5Z"),
            "fc9913XADNLgJ1ByKhqcC5Z"
        );
    }

    #[test]
    fn test_shorten_standard_tail_is_identity() {
        assert_eq!(
            shorten_from_compressed("fc9913XADNLgJ1ByKhqcC5Z"),
            "fc9913XADNLgJ1ByKhqcC5Z"
        );
    }

    #[test]
    fn test_shorten_recoverable_vector() {
        assert_eq!(
            shorten_from_compressed("fc991AAECAwQFBgcICQoLDA0ODw"),
            "fcmRAAECAwQFBgcICQoLDA0ODw"
        );
    }

    #[test]
    fn test_classify() {
        assert_eq!(UuidForm::classify(SHORT), Some(UuidForm::RandomId22));
        assert_eq!(UuidForm::classify(CANONICAL), Some(UuidForm::CanonicalUuid36));
        assert_eq!(
            UuidForm::classify("fc9913XADNLgJ1ByKhqcC5Z"),
            Some(UuidForm::CompressedId23)
        );
        assert_eq!(UuidForm::classify("background"), None);
    }

    #[test]
    fn test_to_canonical() {
        assert_eq!(to_canonical(SHORT).as_deref(), Some(CANONICAL));
        assert_eq!(
            to_canonical("FC991DD7-0033-4B80-9D41-C8A86A702E59").as_deref(),
            Some(CANONICAL)
        );
        assert_eq!(to_canonical("fc9913XADNLgJ1ByKhqcC5Z"), None);
        assert_eq!(to_canonical("player"), None);
    }
}
