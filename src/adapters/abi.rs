//! Minimal ABI call encoding and return decoding.
//!
//! Covers exactly the shapes the vote contract uses: `string` and
//! `uint256` arguments, and `bool`/`uint256`/`address` returns. The packed
//! vote record itself is decoded by `domain::decoder`, not here.

use primitive_types::H160;
use sha3::{Digest, Keccak256};

use crate::domain::errors::LedgerError;

/// One call argument.
#[derive(Debug, Clone)]
pub enum Token<'a> {
    Uint(u64),
    Str(&'a str),
}

/// First four bytes of the keccak-256 hash of the canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

/// Encode a function call: selector, static head words, dynamic tails.
///
/// Dynamic arguments (strings) put an offset in their head slot; the
/// offset is measured from the start of the argument block, after the
/// selector.
pub fn encode_call(signature: &str, args: &[Token<'_>]) -> Vec<u8> {
    let head_len = args.len() * 32;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for arg in args {
        match arg {
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::Str(text) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u64));
                tail.extend_from_slice(&uint_word(text.len() as u64));
                let mut data = text.as_bytes().to_vec();
                while data.len() % 32 != 0 {
                    data.push(0);
                }
                tail.extend_from_slice(&data);
            }
        }
    }

    let mut call = selector(signature).to_vec();
    call.extend_from_slice(&head);
    call.extend_from_slice(&tail);
    call
}

/// Decode a single-word `bool` return.
pub fn decode_bool(payload: &[u8]) -> Result<bool, LedgerError> {
    let word = return_word(payload, 0)?;
    Ok(word[31] != 0)
}

/// Decode the `uint256` return at word `index`, rejecting values that
/// overflow u64.
pub fn decode_u64(payload: &[u8], index: usize) -> Result<u64, LedgerError> {
    let word = return_word(payload, index)?;
    if word[..24].iter().any(|b| *b != 0) {
        return Err(LedgerError::Response(format!(
            "uint return at word {index} overflows u64"
        )));
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(tail))
}

/// Decode a single-word `address` return as 0x-prefixed hex.
pub fn decode_address(payload: &[u8]) -> Result<String, LedgerError> {
    let word = return_word(payload, 0)?;
    let address = H160::from_slice(&word[12..]);
    Ok(format!("{address:#x}"))
}

fn return_word(payload: &[u8], index: usize) -> Result<&[u8], LedgerError> {
    let start = index * 32;
    payload.get(start..start + 32).ok_or_else(|| {
        LedgerError::Response(format!(
            "return payload too short: word {index} missing ({} bytes)",
            payload.len()
        ))
    })
}

fn uint_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}
