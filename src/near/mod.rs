//! NEAR submission path
//!
//! Receiver storage registration, router pool discovery, call arguments
//! and locally signed function calls over JSON-RPC.

pub mod args;
pub mod pools;
pub mod relay;
pub mod rpc;
pub mod transaction;

pub use args::{pool_hops, PoolHop, SwapToUserArgs};
pub use pools::PoolDiscovery;
pub use relay::NearRelay;
pub use rpc::{AccessKeyView, NearJsonRpcClient, NearRpc};
pub use transaction::{SignedTransaction, Transaction};
