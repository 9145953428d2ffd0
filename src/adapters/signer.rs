//! Replay-protected legacy transaction signing.
//!
//! The vote contract lives on an EVM ledger, so writes are legacy
//! transactions signed locally and submitted via `eth_sendRawTransaction`.
//! Signing hash per EIP-155: `keccak(rlp([nonce, gasPrice, gasLimit, to,
//! value, data, chainId, 0, 0]))`, with `v = chainId * 2 + 35 + recId` in
//! the signed encoding.

use primitive_types::{H160, U256};
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};

use crate::domain::errors::LedgerError;

/// An unsigned legacy transaction.
#[derive(Debug, Clone)]
pub struct LegacyTx {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: H160,
    pub value: U256,
    pub data: Vec<u8>,
}

/// Holds the write key and produces raw signed transactions.
pub struct TxSigner {
    secp: Secp256k1<All>,
    secret: SecretKey,
    address: H160,
    chain_id: u64,
}

impl TxSigner {
    /// Build a signer from a 0x-prefixed 32-byte hex scalar.
    pub fn from_hex(key: &str, chain_id: u64) -> Result<Self, LedgerError> {
        let stripped = key.strip_prefix("0x").unwrap_or(key);
        let bytes =
            hex::decode(stripped).map_err(|e| LedgerError::Signer(format!("invalid key hex: {e}")))?;
        let secret = SecretKey::from_slice(&bytes)
            .map_err(|e| LedgerError::Signer(format!("invalid key scalar: {e}")))?;

        let secp = Secp256k1::new();
        let address = derive_address(&secp, &secret);
        Ok(Self {
            secp,
            secret,
            address,
            chain_id,
        })
    }

    /// The account address writes are sent from.
    pub fn address(&self) -> H160 {
        self.address
    }

    /// Sign a legacy transaction; returns the raw RLP ready for
    /// `eth_sendRawTransaction`.
    pub fn sign_legacy(&self, tx: &LegacyTx) -> Result<Vec<u8>, LedgerError> {
        let signing_hash = self.signing_hash(tx);
        let message = Message::from_digest_slice(&signing_hash)
            .map_err(|e| LedgerError::Signer(format!("invalid signing hash: {e}")))?;

        let signature = self.secp.sign_ecdsa_recoverable(&message, &self.secret);
        let (recovery_id, compact) = signature.serialize_compact();

        let v = self.chain_id * 2 + 35 + recovery_id.to_i32() as u64;
        let r = U256::from_big_endian(&compact[..32]);
        let s = U256::from_big_endian(&compact[32..]);

        let mut stream = rlp::RlpStream::new_list(9);
        append_body(&mut stream, tx);
        stream.append(&v);
        stream.append(&r);
        stream.append(&s);
        Ok(stream.out().to_vec())
    }

    /// EIP-155 signing hash for a legacy transaction.
    fn signing_hash(&self, tx: &LegacyTx) -> [u8; 32] {
        let mut stream = rlp::RlpStream::new_list(9);
        append_body(&mut stream, tx);
        stream.append(&self.chain_id);
        stream.append(&0u8);
        stream.append(&0u8);

        let mut hasher = Keccak256::new();
        hasher.update(stream.as_raw());
        hasher.finalize().into()
    }
}

/// The six body fields shared by the signing preimage and the signed
/// encoding.
fn append_body(stream: &mut rlp::RlpStream, tx: &LegacyTx) {
    stream.append(&tx.nonce);
    stream.append(&tx.gas_price);
    stream.append(&tx.gas_limit);
    stream.append(&tx.to);
    stream.append(&tx.value);
    stream.append(&tx.data);
}

/// Address = last 20 bytes of keccak-256 of the uncompressed public key
/// without its 0x04 prefix.
fn derive_address(secp: &Secp256k1<All>, secret: &SecretKey) -> H160 {
    let public_key = PublicKey::from_secret_key(secp, secret);
    let uncompressed = public_key.serialize_uncompressed();
    let mut hasher = Keccak256::new();
    hasher.update(&uncompressed[1..]);
    let digest = hasher.finalize();
    H160::from_slice(&digest[12..])
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn sample_tx() -> LegacyTx {
        LegacyTx {
            nonce: 9,
            gas_price: U256::from(20_000_000_000u64),
            gas_limit: 21_000,
            to: H160::from_slice(&[0x35u8; 20]),
            value: U256::zero(),
            data: vec![0xde, 0xad, 0xbe, 0xef],
        }
    }

    #[test]
    fn test_rejects_malformed_key() {
        assert!(matches!(
            TxSigner::from_hex("0x1234", 1),
            Err(LedgerError::Signer(_))
        ));
        assert!(matches!(
            TxSigner::from_hex("not hex at all", 1),
            Err(LedgerError::Signer(_))
        ));
    }

    #[test]
    fn test_address_derivation_is_stable() {
        let a = TxSigner::from_hex(TEST_KEY, 1).unwrap().address();
        let b = TxSigner::from_hex(TEST_KEY, 421_614).unwrap().address();
        assert_eq!(a, b, "chain id must not influence the account address");
        assert_ne!(a, H160::zero());
    }

    #[test]
    fn test_signed_tx_is_a_nine_item_list() {
        let signer = TxSigner::from_hex(TEST_KEY, 421_614).unwrap();
        let raw = signer.sign_legacy(&sample_tx()).unwrap();

        let decoded = rlp::Rlp::new(&raw);
        assert!(decoded.is_list());
        assert_eq!(decoded.item_count().unwrap(), 9);

        let nonce: u64 = decoded.val_at(0).unwrap();
        let to: Vec<u8> = decoded.val_at(3).unwrap();
        let data: Vec<u8> = decoded.val_at(5).unwrap();
        assert_eq!(nonce, 9);
        assert_eq!(to, vec![0x35u8; 20]);
        assert_eq!(data, vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_v_encodes_chain_id() {
        let chain_id = 421_614u64;
        let signer = TxSigner::from_hex(TEST_KEY, chain_id).unwrap();
        let raw = signer.sign_legacy(&sample_tx()).unwrap();

        let v: u64 = rlp::Rlp::new(&raw).val_at(6).unwrap();
        assert!(
            v == chain_id * 2 + 35 || v == chain_id * 2 + 36,
            "unexpected v: {v}"
        );
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = TxSigner::from_hex(TEST_KEY, 1).unwrap();
        let first = signer.sign_legacy(&sample_tx()).unwrap();
        let second = signer.sign_legacy(&sample_tx()).unwrap();
        // RFC 6979 nonces: same transaction, same signature.
        assert_eq!(first, second);
    }
}
