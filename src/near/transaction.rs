//! NEAR transaction wire format
//!
//! Only what the relayer sends: a single `FunctionCall` action signed by an
//! ed25519 access key. Enum tags are written by hand so they match the
//! protocol's variant numbering.

use crate::encoding::bytearray_to_base58;
use crate::errors::{RelayError, RelayResult};
use crate::wallet::NearSigner;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use borsh::BorshSerialize;
use sha2::{Digest, Sha256};
use std::io::{Result as IoResult, Write};

const ED25519_KEY_TYPE: u8 = 0;
const FUNCTION_CALL_ACTION: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl BorshSerialize for Ed25519PublicKey {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        ED25519_KEY_TYPE.serialize(writer)?;
        writer.write_all(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

impl BorshSerialize for Ed25519Signature {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        ED25519_KEY_TYPE.serialize(writer)?;
        writer.write_all(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct FunctionCall {
    pub method_name: String,
    pub args: Vec<u8>,
    pub gas: u64,
    pub deposit: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    FunctionCall(FunctionCall),
}

impl BorshSerialize for Action {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        match self {
            Self::FunctionCall(call) => {
                FUNCTION_CALL_ACTION.serialize(writer)?;
                call.serialize(writer)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct Transaction {
    pub signer_id: String,
    pub public_key: Ed25519PublicKey,
    pub nonce: u64,
    pub receiver_id: String,
    pub block_hash: [u8; 32],
    pub actions: Vec<Action>,
}

impl Transaction {
    /// Single function call from `signer`
    pub fn function_call(
        signer: &NearSigner,
        nonce: u64,
        receiver_id: impl Into<String>,
        block_hash: [u8; 32],
        call: FunctionCall,
    ) -> Self {
        Self {
            signer_id: signer.account_id().to_string(),
            public_key: Ed25519PublicKey(signer.public_key()),
            nonce,
            receiver_id: receiver_id.into(),
            block_hash,
            actions: vec![Action::FunctionCall(call)],
        }
    }

    /// SHA-256 of the borsh encoding; the signed message and the tx hash
    pub fn digest(&self) -> RelayResult<[u8; 32]> {
        let bytes = borsh::to_vec(self).map_err(|e| RelayError::encoding(e.to_string()))?;
        Ok(Sha256::digest(&bytes).into())
    }

    pub fn sign(self, signer: &NearSigner) -> RelayResult<SignedTransaction> {
        let digest = self.digest()?;
        Ok(SignedTransaction {
            signature: Ed25519Signature(signer.sign(&digest)),
            hash: digest,
            transaction: self,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Ed25519Signature,
    hash: [u8; 32],
}

impl BorshSerialize for SignedTransaction {
    fn serialize<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        self.transaction.serialize(writer)?;
        self.signature.serialize(writer)
    }
}

impl SignedTransaction {
    /// Base58 transaction hash as reported by the chain
    pub fn hash(&self) -> String {
        bytearray_to_base58(&self.hash)
    }

    /// Base64 payload for `broadcast_tx_commit`
    pub fn to_base64(&self) -> RelayResult<String> {
        let bytes = borsh::to_vec(self).map_err(|e| RelayError::encoding(e.to_string()))?;
        Ok(BASE64.encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    fn signer() -> NearSigner {
        let secret = format!("ed25519:{}", bs58::encode([5u8; 32]).into_string());
        NearSigner::from_secret_key("relayer.near", &secret).unwrap()
    }

    fn call() -> FunctionCall {
        FunctionCall {
            method_name: "storage_deposit".into(),
            args: br#"{"account_id":"alice.near"}"#.to_vec(),
            gas: 100_000_000_000_000,
            deposit: 1_250_000_000_000_000_000_000,
        }
    }

    #[test]
    fn test_borsh_layout() {
        let signer = signer();
        let tx = Transaction::function_call(&signer, 42, "usdt.tether-token.near", [9u8; 32], call());
        let bytes = borsh::to_vec(&tx).unwrap();

        // signer id: u32 length prefix then utf-8
        assert_eq!(&bytes[..4], &12u32.to_le_bytes());
        assert_eq!(&bytes[4..16], b"relayer.near");
        // public key: type tag then 32 bytes
        assert_eq!(bytes[16], ED25519_KEY_TYPE);
        assert_eq!(&bytes[17..49], &signer.public_key());
        assert_eq!(&bytes[49..57], &42u64.to_le_bytes());

        let receiver_end = 57 + 4 + "usdt.tether-token.near".len();
        assert_eq!(&bytes[receiver_end..receiver_end + 32], &[9u8; 32]);
        // one action, function call tag
        assert_eq!(&bytes[receiver_end + 32..receiver_end + 36], &1u32.to_le_bytes());
        assert_eq!(bytes[receiver_end + 36], FUNCTION_CALL_ACTION);
        // deposit is the trailing u128
        assert_eq!(
            &bytes[bytes.len() - 16..],
            &1_250_000_000_000_000_000_000u128.to_le_bytes()
        );
    }

    #[test]
    fn test_signature_verifies_over_digest() {
        let signer = signer();
        let tx = Transaction::function_call(&signer, 1, "v2.ref-finance.near", [1u8; 32], call());
        let digest = tx.digest().unwrap();
        let signed = tx.sign(&signer).unwrap();

        let key = VerifyingKey::from_bytes(&signer.public_key()).unwrap();
        let signature = Signature::from_bytes(&signed.signature.0);
        assert!(key.verify(&digest, &signature).is_ok());
        assert_eq!(signed.hash(), bs58::encode(digest).into_string());
    }

    #[test]
    fn test_signed_payload_appends_signature() {
        let signer = signer();
        let tx = Transaction::function_call(&signer, 1, "v2.ref-finance.near", [1u8; 32], call());
        let unsigned_len = borsh::to_vec(&tx).unwrap().len();
        let signed = tx.sign(&signer).unwrap();

        let payload = BASE64.decode(signed.to_base64().unwrap()).unwrap();
        assert_eq!(payload.len(), unsigned_len + 1 + 64);
        assert_eq!(payload[unsigned_len], ED25519_KEY_TYPE);
        assert_eq!(&payload[unsigned_len + 1..], &signed.signature.0);
    }
}
