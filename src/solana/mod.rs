//! Solana submission path
//!
//! Pool resolution, receiver token accounts, the bridge instruction and its
//! submission with identical-payload resubmission.

pub mod instruction;
pub mod layout;
pub mod pda;
pub mod pools;
pub mod relay;
pub mod rpc;
pub mod submitter;
pub mod token_account;

pub use instruction::{build_relay_instruction, ProgramIds, RelayParams, TransferMode, TransferModeTable, TransferRoute};
pub use layout::{AmmInfoLayout, RelayInstructionData};
pub use pda::BridgeAddresses;
pub use pools::{HttpPoolSource, PoolInfo, PoolResolver, PoolSource, RawPoolAccount};
pub use relay::SolanaRelay;
pub use rpc::{SolanaRpc, SolanaRpcClient};
pub use submitter::{submit_and_confirm, ConfirmationPolicy};
pub use token_account::{ensure_token_account, AccountPolling};
