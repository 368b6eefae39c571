//! Fixed binary layouts
//!
//! `RelayInstructionData` is the instruction payload of the bridge program
//! and `AmmInfoLayout` is the Raydium v4 AMM account. Both are borsh
//! little-endian with no padding, so field order is the wire order.

use crate::errors::{RelayError, RelayResult};
use borsh::{BorshDeserialize, BorshSerialize};

/// Encoded size of [`RelayInstructionData`]
pub const RELAY_INSTRUCTION_LEN: usize = 148;

/// Encoded size of [`AmmInfoLayout`]
pub const AMM_INFO_LEN: usize = 752;

/// Discriminator of the swap-to-user instruction
pub const SWAP_INSTRUCTION_NUMBER: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RelayInstructionData {
    pub instruction_number: u8,
    pub user: [u8; 32],
    pub amount_with_fee: u64,
    pub amount_out_min: u64,
    pub original_tx_hash: [u8; 32],
    pub validator_sign: [u8; 65],
    pub is_refund: bool,
    pub transfer_data_type: u8,
}

impl RelayInstructionData {
    pub fn encode(&self) -> RelayResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|e| RelayError::encoding(format!("Instruction encoding failed: {}", e)))
    }
}

/// Raydium liquidity state v4
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AmmInfoLayout {
    pub status: u64,
    pub nonce: u64,
    pub order_num: u64,
    pub depth: u64,
    pub coin_decimals: u64,
    pub pc_decimals: u64,
    pub state: u64,
    pub reset_flag: u64,
    pub min_size: u64,
    pub vol_max_cut_ratio: u64,
    pub amount_wave_ratio: u64,
    pub coin_lot_size: u64,
    pub pc_lot_size: u64,
    pub min_price_multiplier: u64,
    pub max_price_multiplier: u64,
    pub system_decimals_value: u64,
    pub min_separate_numerator: u64,
    pub min_separate_denominator: u64,
    pub trade_fee_numerator: u64,
    pub trade_fee_denominator: u64,
    pub pnl_numerator: u64,
    pub pnl_denominator: u64,
    pub swap_fee_numerator: u64,
    pub swap_fee_denominator: u64,
    pub need_take_pnl_coin: u64,
    pub need_take_pnl_pc: u64,
    pub total_pnl_pc: u64,
    pub total_pnl_coin: u64,
    pub pool_total_deposit_pc: u128,
    pub pool_total_deposit_coin: u128,
    pub swap_coin_in_amount: u128,
    pub swap_pc_out_amount: u128,
    pub swap_coin2_pc_fee: u64,
    pub swap_pc_in_amount: u128,
    pub swap_coin_out_amount: u128,
    pub swap_pc2_coin_fee: u64,
    pub pool_coin_token_account: [u8; 32],
    pub pool_pc_token_account: [u8; 32],
    pub coin_mint_address: [u8; 32],
    pub pc_mint_address: [u8; 32],
    pub lp_mint_address: [u8; 32],
    pub amm_open_orders: [u8; 32],
    pub serum_market: [u8; 32],
    pub serum_program_id: [u8; 32],
    pub amm_target_orders: [u8; 32],
    pub pool_withdraw_queue: [u8; 32],
    pub pool_temp_lp_token_account: [u8; 32],
    pub amm_owner: [u8; 32],
    pub pnl_owner: [u8; 32],
}

impl AmmInfoLayout {
    /// Decode the leading [`AMM_INFO_LEN`] bytes of an account blob
    ///
    /// Trailing bytes are ignored, short blobs are rejected.
    pub fn decode(data: &[u8]) -> RelayResult<Self> {
        if data.len() < AMM_INFO_LEN {
            return Err(RelayError::encoding(format!(
                "AMM account blob is {} bytes, expected at least {}",
                data.len(),
                AMM_INFO_LEN
            )));
        }
        let mut cursor = data;
        Self::deserialize(&mut cursor)
            .map_err(|e| RelayError::encoding(format!("AMM account decoding failed: {}", e)))
    }

    pub fn encode(&self) -> RelayResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|e| RelayError::encoding(format!("AMM account encoding failed: {}", e)))
    }
}
