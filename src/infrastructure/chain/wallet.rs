// src/infrastructure/chain/wallet.rs
// Local ed25519 keypair and transaction signing.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::{Signer, SigningKey};

use crate::domain::errors::{ExecutionError, ExecutionResult};
use crate::domain::repository::WalletSigner;

const SIGNATURE_LEN: usize = 64;

pub struct Wallet {
    signing_key: SigningKey,
    address: String,
}

impl Wallet {
    /// Load a keypair from a base58-encoded private key. Accepts the common
    /// 64-byte secret+public export as well as a bare 32-byte seed.
    pub fn from_base58(private_key: &str) -> ExecutionResult<Self> {
        let bytes = bs58::decode(private_key.trim())
            .into_vec()
            .map_err(|e| ExecutionError::InvalidKey(e.to_string()))?;

        let seed: [u8; 32] = match bytes.len() {
            64 => bytes[..32]
                .try_into()
                .map_err(|_| ExecutionError::InvalidKey("truncated keypair".to_string()))?,
            32 => bytes[..]
                .try_into()
                .map_err(|_| ExecutionError::InvalidKey("truncated seed".to_string()))?,
            n => {
                return Err(ExecutionError::InvalidKey(format!(
                    "expected 32 or 64 key bytes, got {}",
                    n
                )))
            }
        };

        let signing_key = SigningKey::from_bytes(&seed);
        let address = bs58::encode(signing_key.verifying_key().to_bytes()).into_string();

        Ok(Self {
            signing_key,
            address,
        })
    }
}

impl WalletSigner for Wallet {
    fn address(&self) -> &str {
        &self.address
    }

    /// Sign a serialized Solana transaction. The wire format is a compact-u16
    /// signature count, the signature slots, then the message bytes; the fee
    /// payer's signature goes in the first slot.
    fn sign_transaction(&self, transaction_b64: &str) -> ExecutionResult<String> {
        let mut tx = BASE64
            .decode(transaction_b64)
            .map_err(|e| ExecutionError::Build(format!("invalid transaction encoding: {}", e)))?;

        let (sig_count, prefix_len) = decode_compact_u16(&tx)
            .ok_or_else(|| ExecutionError::Build("invalid signature count".to_string()))?;
        if sig_count == 0 {
            return Err(ExecutionError::Build(
                "transaction has no signature slots".to_string(),
            ));
        }

        let message_start = prefix_len + sig_count * SIGNATURE_LEN;
        if tx.len() <= message_start {
            return Err(ExecutionError::Build(
                "transaction shorter than its signature table".to_string(),
            ));
        }

        let signature = self.signing_key.sign(&tx[message_start..]);
        tx[prefix_len..prefix_len + SIGNATURE_LEN].copy_from_slice(&signature.to_bytes());

        Ok(BASE64.encode(tx))
    }
}

/// Decode a compact-u16 length prefix. Returns (value, bytes consumed).
fn decode_compact_u16(bytes: &[u8]) -> Option<(usize, usize)> {
    let mut value: usize = 0;
    for (i, &byte) in bytes.iter().take(3).enumerate() {
        value |= ((byte & 0x7f) as usize) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Verifier;

    fn test_wallet() -> Wallet {
        let seed = [7u8; 32];
        let encoded = bs58::encode(seed).into_string();
        Wallet::from_base58(&encoded).unwrap()
    }

    #[test]
    fn loads_64_byte_keypair_export() {
        let seed = [9u8; 32];
        let signing_key = SigningKey::from_bytes(&seed);
        let mut full = seed.to_vec();
        full.extend_from_slice(&signing_key.verifying_key().to_bytes());

        let wallet = Wallet::from_base58(&bs58::encode(full).into_string()).unwrap();
        assert_eq!(
            wallet.address(),
            bs58::encode(signing_key.verifying_key().to_bytes()).into_string()
        );
    }

    #[test]
    fn rejects_malformed_key() {
        assert!(Wallet::from_base58("not-base58!!").is_err());
        assert!(Wallet::from_base58(&bs58::encode([1u8; 10]).into_string()).is_err());
    }

    #[test]
    fn signs_first_signature_slot() {
        let wallet = test_wallet();

        // One empty signature slot followed by a fake message.
        let message = b"test message bytes".to_vec();
        let mut tx = vec![1u8];
        tx.extend_from_slice(&[0u8; SIGNATURE_LEN]);
        tx.extend_from_slice(&message);

        let signed = wallet.sign_transaction(&BASE64.encode(&tx)).unwrap();
        let signed_bytes = BASE64.decode(signed).unwrap();

        assert_eq!(signed_bytes.len(), tx.len());
        let signature =
            ed25519_dalek::Signature::from_bytes(signed_bytes[1..65].try_into().unwrap());
        wallet
            .signing_key
            .verifying_key()
            .verify(&message, &signature)
            .unwrap();
    }

    #[test]
    fn compact_u16_decoding() {
        assert_eq!(decode_compact_u16(&[1, 0]), Some((1, 1)));
        assert_eq!(decode_compact_u16(&[0x80, 0x01]), Some((128, 2)));
        assert_eq!(decode_compact_u16(&[0xff, 0xff, 0x03]), Some((65535, 3)));
        assert_eq!(decode_compact_u16(&[]), None);
    }
}
