//! Relayer key material
//!
//! Keys are read on demand and handed out by value so each attempt holds
//! them only while it signs. Raw seed bytes are wiped as soon as the
//! signer is derived.

use crate::errors::{RelayError, RelayResult};
use ed25519_dalek::{Signer as _, SigningKey};
use serde::Deserialize;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::keypair::keypair_from_seed;
use std::path::Path;
use zeroize::Zeroizing;

const ED25519_PREFIX: &str = "ed25519:";

#[derive(Deserialize)]
struct SecretFile {
    #[serde(rename = "SOLANA_RELAYER_PRIVATE_KEY", default)]
    solana_relayer_private_key: Vec<u8>,
}

/// Load the Solana relayer keypair from the JSON secret file
///
/// The file carries `SOLANA_RELAYER_PRIVATE_KEY` as a byte array; its first
/// 32 bytes are the ed25519 seed.
pub fn load_solana_keypair(path: impl AsRef<Path>) -> RelayResult<Keypair> {
    let path = path.as_ref();
    let raw = Zeroizing::new(std::fs::read(path).map_err(|e| {
        RelayError::Signing(format!("Failed to read secret file {}: {}", path.display(), e))
    })?);

    let secrets: SecretFile = serde_json::from_slice(&raw)
        .map_err(|e| RelayError::Signing(format!("Failed to parse secret file: {}", e)))?;
    let key_bytes = Zeroizing::new(secrets.solana_relayer_private_key);

    if key_bytes.len() < 32 {
        return Err(RelayError::Signing(format!(
            "SOLANA_RELAYER_PRIVATE_KEY too short: {} bytes",
            key_bytes.len()
        )));
    }
    if key_bytes[..32].iter().all(|&b| b == 0) {
        return Err(RelayError::Signing("All-zero relayer seed rejected".to_string()));
    }

    keypair_from_seed(&key_bytes[..32]).map_err(|e| RelayError::Signing(e.to_string()))
}

/// NEAR access key of the relayer account
pub struct NearSigner {
    account_id: String,
    key: SigningKey,
}

impl NearSigner {
    /// Parse an `ed25519:<base58>` secret key (64-byte expanded or 32-byte seed)
    pub fn from_secret_key(account_id: impl Into<String>, secret_key: &str) -> RelayResult<Self> {
        let encoded = secret_key.strip_prefix(ED25519_PREFIX).unwrap_or(secret_key);
        let bytes = Zeroizing::new(
            bs58::decode(encoded)
                .into_vec()
                .map_err(|e| RelayError::Signing(format!("Invalid NEAR secret key: {}", e)))?,
        );

        if bytes.len() != 32 && bytes.len() != 64 {
            return Err(RelayError::Signing(format!(
                "NEAR secret key must be 32 or 64 bytes, got {}",
                bytes.len()
            )));
        }

        let mut seed = Zeroizing::new([0u8; 32]);
        seed.copy_from_slice(&bytes[..32]);

        Ok(Self {
            account_id: account_id.into(),
            key: SigningKey::from_bytes(&seed),
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    /// `ed25519:<base58>` form used by RPC queries
    pub fn public_key_string(&self) -> String {
        format!("{}{}", ED25519_PREFIX, bs58::encode(self.public_key()).into_string())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for NearSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NearSigner")
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signer::Signer;
    use std::io::Write;

    fn write_secret(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let body = serde_json::json!({ "SOLANA_RELAYER_PRIVATE_KEY": bytes });
        file.write_all(body.to_string().as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_keypair_uses_first_32_bytes() {
        let mut long = vec![7u8; 32];
        long.extend_from_slice(&[9u8; 32]);
        let a = load_solana_keypair(write_secret(&long).path()).unwrap();
        let b = load_solana_keypair(write_secret(&[7u8; 32]).path()).unwrap();
        assert_eq!(a.pubkey(), b.pubkey());
    }

    #[test]
    fn test_rejects_short_and_zero_keys() {
        assert!(matches!(
            load_solana_keypair(write_secret(&[1u8; 16]).path()),
            Err(RelayError::Signing(_))
        ));
        assert!(load_solana_keypair(write_secret(&[0u8; 64]).path()).is_err());
        assert!(load_solana_keypair("/nonexistent/secrets.json").is_err());
    }

    #[test]
    fn test_near_signer_from_seed_and_expanded() {
        let seed = [3u8; 32];
        let short = format!("ed25519:{}", bs58::encode(seed).into_string());
        let signer = NearSigner::from_secret_key("relayer.near", &short).unwrap();

        let mut expanded = seed.to_vec();
        expanded.extend_from_slice(&signer.public_key());
        let long = format!("ed25519:{}", bs58::encode(&expanded).into_string());
        let same = NearSigner::from_secret_key("relayer.near", &long).unwrap();

        assert_eq!(signer.public_key(), same.public_key());
        assert!(signer.public_key_string().starts_with("ed25519:"));
        assert_eq!(signer.account_id(), "relayer.near");
    }

    #[test]
    fn test_near_signature_verifies() {
        use ed25519_dalek::{Signature, Verifier, VerifyingKey};

        let seed = [5u8; 32];
        let signer =
            NearSigner::from_secret_key("a.near", &bs58::encode(seed).into_string()).unwrap();
        let sig = signer.sign(b"payload");
        let vk = VerifyingKey::from_bytes(&signer.public_key()).unwrap();
        assert!(vk.verify(b"payload", &Signature::from_bytes(&sig)).is_ok());
    }
}
