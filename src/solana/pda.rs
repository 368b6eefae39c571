//! Program-derived addresses of the bridge program
//!
//! Every seed list starts with the configured prefix followed by a
//! namespace tag. The bump search is `Pubkey::find_program_address`.

use solana_sdk::pubkey::Pubkey;

const CONFIG_TAG: &[u8] = b"config";
const RELAYER_TAG: &[u8] = b"relayer";
const TRANSACTION_TAG: &[u8] = b"transaction";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeAddresses {
    program_id: Pubkey,
    prefix: String,
}

impl BridgeAddresses {
    pub fn new(program_id: Pubkey, prefix: impl Into<String>) -> Self {
        Self {
            program_id,
            prefix: prefix.into(),
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// `[prefix, "config", version as u64 LE]`
    pub fn config(&self, version: u64) -> Pubkey {
        let version = version.to_le_bytes();
        self.find(&[self.prefix.as_bytes(), CONFIG_TAG, version.as_ref()])
    }

    /// `[prefix, "relayer", relayer pubkey]`
    pub fn relayer(&self, relayer: &Pubkey) -> Pubkey {
        self.find(&[self.prefix.as_bytes(), RELAYER_TAG, relayer.as_ref()])
    }

    /// `[prefix, "transaction", original tx hash]`
    pub fn transaction(&self, original_tx_hash: &[u8; 32]) -> Pubkey {
        self.find(&[self.prefix.as_bytes(), TRANSACTION_TAG, original_tx_hash.as_ref()])
    }

    fn find(&self, seeds: &[&[u8]]) -> Pubkey {
        Pubkey::find_program_address(seeds, &self.program_id).0
    }
}
