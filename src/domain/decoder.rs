//! Packed vote-record decoder.
//!
//! The ledger's `getVote(uint256)` returns a dynamic tuple that the RPC
//! interface layer does not decode for us, so this module parses the raw
//! ABI words by hand. Layout, in 32-byte big-endian words:
//!
//! ```text
//! word 0   outer tuple offset
//! word 1   string offset within the tuple
//! word 2   choice id
//! word 3   timestamp (unix seconds)
//! word 4   tag string byte length
//! word 5+  tag string bytes, null-padded to a word boundary
//! ```
//!
//! Structural problems (truncation, non-hex input, a length no real tag
//! could have) are decode failures, never panics or out-of-bounds reads.
//! If a future ledger exposes typed reads, this module becomes a thin
//! adapter; nothing outside it depends on the byte layout.

use thiserror::Error;

/// 32-byte ABI word size.
const WORD: usize = 32;
/// Byte offset of the choice-id word within the payload.
const CHOICE_OFFSET: usize = 2 * WORD;
/// Byte offset of the timestamp word.
const TIMESTAMP_OFFSET: usize = 3 * WORD;
/// Byte offset of the string-length word.
const LENGTH_OFFSET: usize = 4 * WORD;
/// Byte offset of the first string byte.
const STRING_OFFSET: usize = 5 * WORD;

/// Tag ids longer than this are treated as corrupt rather than read.
pub const MAX_TAG_BYTES: u64 = 100;

/// A record parsed out of the packed payload.
///
/// `tag_id` is `None` when the stored string decoded to nothing (all
/// padding); callers that render records must substitute a synthetic
/// placeholder and keep it distinguishable from real data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    pub tag_id: Option<String>,
    pub choice_id: u64,
    pub cast_at: u64,
}

/// Ways a packed record can fail to parse.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Input was not valid hexadecimal.
    #[error("payload is not valid hex: {0}")]
    NonHex(String),

    /// Payload ends before the layout says it should.
    #[error("payload truncated: need {expected} bytes, have {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Declared string length exceeds [`MAX_TAG_BYTES`]; reading it would
    /// mean trusting a corrupt length field.
    #[error("implausible tag length {0} (limit {MAX_TAG_BYTES})")]
    ImplausibleLength(u64),

    /// A numeric word does not fit in u64.
    #[error("word at byte offset {offset} overflows u64")]
    WordOverflow { offset: usize },

    /// Tag bytes were not valid UTF-8 after padding removal.
    #[error("tag bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// Decode one record from a hex string, with or without a `0x` prefix.
pub fn decode_record_hex(payload: &str) -> Result<DecodedRecord, DecodeError> {
    let stripped = payload.strip_prefix("0x").unwrap_or(payload);
    let bytes = hex::decode(stripped).map_err(|e| DecodeError::NonHex(e.to_string()))?;
    decode_record(&bytes)
}

/// Decode one record from raw payload bytes.
pub fn decode_record(payload: &[u8]) -> Result<DecodedRecord, DecodeError> {
    if payload.len() < STRING_OFFSET {
        return Err(DecodeError::Truncated {
            expected: STRING_OFFSET,
            actual: payload.len(),
        });
    }

    let choice_id = read_u64_word(payload, CHOICE_OFFSET)?;
    let cast_at = read_u64_word(payload, TIMESTAMP_OFFSET)?;
    let declared_len = read_u64_word(payload, LENGTH_OFFSET)?;

    if declared_len >= MAX_TAG_BYTES {
        return Err(DecodeError::ImplausibleLength(declared_len));
    }

    let len = declared_len as usize;
    let end = STRING_OFFSET + len;
    if payload.len() < end {
        return Err(DecodeError::Truncated {
            expected: end,
            actual: payload.len(),
        });
    }

    // Null padding can appear anywhere in the declared range when the
    // ledger rounds the string up to a word boundary.
    let tag_bytes: Vec<u8> = payload[STRING_OFFSET..end]
        .iter()
        .copied()
        .filter(|b| *b != 0)
        .collect();

    let tag = String::from_utf8(tag_bytes).map_err(|_| DecodeError::InvalidUtf8)?;

    Ok(DecodedRecord {
        tag_id: if tag.is_empty() { None } else { Some(tag) },
        choice_id,
        cast_at,
    })
}

/// Read a 32-byte big-endian word as u64, rejecting values that overflow.
fn read_u64_word(payload: &[u8], offset: usize) -> Result<u64, DecodeError> {
    let word = &payload[offset..offset + WORD];
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(DecodeError::WordOverflow { offset });
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[WORD - 8..]);
    Ok(u64::from_be_bytes(tail))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a well-formed payload for the given fields.
    fn encode_payload(choice_id: u64, cast_at: u64, declared_len: u64, tag: &[u8]) -> Vec<u8> {
        let mut payload = Vec::new();
        for value in [0x20u64, 0x60, choice_id, cast_at, declared_len] {
            let mut word = [0u8; 32];
            word[24..].copy_from_slice(&value.to_be_bytes());
            payload.extend_from_slice(&word);
        }
        let mut data = tag.to_vec();
        while data.len() % 32 != 0 {
            data.push(0);
        }
        payload.extend_from_slice(&data);
        payload
    }

    #[test]
    fn test_decodes_documented_vector() {
        let payload = encode_payload(3, 1_700_000_000, 6, b"TAG007");
        let record = decode_record(&payload).unwrap();
        assert_eq!(record.tag_id.as_deref(), Some("TAG007"));
        assert_eq!(record.choice_id, 3);
        assert_eq!(record.cast_at, 1_700_000_000);
    }

    #[test]
    fn test_decodes_hex_with_prefix() {
        let payload = encode_payload(1, 1_700_000_001, 4, b"A1B2");
        let hex_payload = format!("0x{}", hex::encode(&payload));
        let record = decode_record_hex(&hex_payload).unwrap();
        assert_eq!(record.tag_id.as_deref(), Some("A1B2"));
    }

    #[test]
    fn test_implausible_length_is_rejected_without_reading() {
        // Declared length 250 with no string bytes at all: a naive decoder
        // would read out of bounds.
        let payload = encode_payload(1, 1, 250, b"");
        assert_eq!(
            decode_record(&payload[..160]),
            Err(DecodeError::ImplausibleLength(250))
        );
    }

    #[test]
    fn test_all_null_tag_yields_empty_outcome() {
        let payload = encode_payload(2, 1_700_000_000, 8, &[0u8; 8]);
        let record = decode_record(&payload).unwrap();
        assert_eq!(record.tag_id, None);
        assert_eq!(record.choice_id, 2);
    }

    #[test]
    fn test_truncated_header_is_rejected() {
        let payload = encode_payload(1, 1, 4, b"TAGX");
        assert!(matches!(
            decode_record(&payload[..100]),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_truncated_string_is_rejected() {
        let mut payload = encode_payload(1, 1, 6, b"TAG007");
        payload.truncate(162); // two bytes of a six-byte string
        assert_eq!(
            decode_record(&payload),
            Err(DecodeError::Truncated {
                expected: 166,
                actual: 162
            })
        );
    }

    #[test]
    fn test_non_hex_input_is_rejected() {
        assert!(matches!(
            decode_record_hex("0xzz"),
            Err(DecodeError::NonHex(_))
        ));
    }

    #[test]
    fn test_overflowing_word_is_rejected() {
        let mut payload = encode_payload(1, 1, 4, b"TAGX");
        payload[CHOICE_OFFSET] = 0xff; // high byte of the choice word
        assert_eq!(
            decode_record(&payload),
            Err(DecodeError::WordOverflow {
                offset: CHOICE_OFFSET
            })
        );
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let payload = encode_payload(1, 1, 2, &[0xc3, 0x28]);
        assert_eq!(decode_record(&payload), Err(DecodeError::InvalidUtf8));
    }

    #[test]
    fn test_interior_null_padding_is_stripped() {
        let payload = encode_payload(1, 1, 8, &[b'T', b'A', b'G', 0, 0, b'0', b'0', b'7']);
        let record = decode_record(&payload).unwrap();
        assert_eq!(record.tag_id.as_deref(), Some("TAG007"));
    }
}
