//! Bridge relay instruction
//!
//! The account list depends on how the receiver is paid:
//!
//! | Mode | `transfer_data_type` | Tail after the common accounts |
//! |------|----|----------------------------------------------|
//! | Swap | 0 | receiver token account, token program, AMM route |
//! | Transfer | 1 | receiver token account, token program |
//! | Native | 2 | wrapped mint, wrapped PDA, token program x2, AMM route, receiver wallet |
//!
//! The common prefix is config PDA, relayer (signer), relayer PDA,
//! transaction PDA, system program and the two bridge pool accounts.

use super::layout::{RelayInstructionData, SWAP_INSTRUCTION_NUMBER};
use super::pda::BridgeAddresses;
use crate::config::{SerumMarket, SolanaConfig};
use crate::errors::{RelayError, RelayResult};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;
use std::collections::HashMap;
use std::str::FromStr;

/// Payout mode selected from the receive token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferMode {
    Swap,
    Transfer,
    Native,
}

impl TransferMode {
    pub fn transfer_data_type(self) -> u8 {
        match self {
            Self::Swap => 0,
            Self::Transfer => 1,
            Self::Native => 2,
        }
    }
}

/// Receive token -> payout mode, anything unlisted swaps
#[derive(Debug, Clone)]
pub struct TransferModeTable {
    modes: HashMap<String, TransferMode>,
}

impl TransferModeTable {
    pub fn new(transfer_token: &str, native_token: &str) -> Self {
        let modes = HashMap::from([
            (transfer_token.to_string(), TransferMode::Transfer),
            (native_token.to_string(), TransferMode::Native),
        ]);
        Self { modes }
    }

    pub fn mode_for(&self, receive_token: &str) -> TransferMode {
        self.modes.get(receive_token).copied().unwrap_or(TransferMode::Swap)
    }
}

/// Serum order book accounts of one market
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerumAccounts {
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub event_queue: Pubkey,
    pub coin_vault: Pubkey,
    pub pc_vault: Pubkey,
    pub vault_signer: Pubkey,
}

impl SerumAccounts {
    pub fn from_config(market: &SerumMarket) -> RelayResult<Self> {
        Ok(Self {
            bids: parse_pubkey("serumBids", &market.serum_bids)?,
            asks: parse_pubkey("serumAsks", &market.serum_asks)?,
            event_queue: parse_pubkey("serumEventQueue", &market.serum_event_queue)?,
            coin_vault: parse_pubkey("serumCoinVaultAccount", &market.serum_coin_vault_account)?,
            pc_vault: parse_pubkey("serumPcVaultAccount", &market.serum_pc_vault_account)?,
            vault_signer: parse_pubkey("serumVaultSigner", &market.serum_vault_signer)?,
        })
    }
}

/// Fully resolved AMM swap accounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmmRoute {
    pub amm_id: Pubkey,
    pub amm_open_orders: Pubkey,
    pub amm_target_orders: Pubkey,
    pub pool_coin_token_account: Pubkey,
    pub pool_pc_token_account: Pubkey,
    pub serum_market: Pubkey,
    pub serum: SerumAccounts,
}

/// Payout route with the accounts it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferRoute {
    Swap {
        receiver_token_account: Pubkey,
        amm: AmmRoute,
    },
    Transfer {
        receiver_token_account: Pubkey,
    },
    Native {
        wallet: Pubkey,
        amm: AmmRoute,
    },
}

impl TransferRoute {
    pub fn mode(&self) -> TransferMode {
        match self {
            Self::Swap { .. } => TransferMode::Swap,
            Self::Transfer { .. } => TransferMode::Transfer,
            Self::Native { .. } => TransferMode::Native,
        }
    }
}

/// Program and account ids the instruction references
#[derive(Debug, Clone)]
pub struct ProgramIds {
    pub bridge: BridgeAddresses,
    pub config_version: u64,
    pub token_program: Pubkey,
    pub amm_authority: Pubkey,
    pub serum_program: Pubkey,
    pub liquidity_pool_program: Pubkey,
    pub wrapped_mint: Pubkey,
    pub wrapped_pda: Pubkey,
    pub pool_pda: Pubkey,
    pub pool_vault: Pubkey,
}

impl ProgramIds {
    pub fn from_config(config: &SolanaConfig) -> RelayResult<Self> {
        Ok(Self {
            bridge: BridgeAddresses::new(
                parse_pubkey("program_id", &config.program_id)?,
                config.seed_prefix.clone(),
            ),
            config_version: config.config_version,
            token_program: spl_token::id(),
            amm_authority: parse_pubkey("amm_authority", &config.amm_authority)?,
            serum_program: parse_pubkey("serum_program_id", &config.serum_program_id)?,
            liquidity_pool_program: parse_pubkey(
                "liquidity_pool_program_id",
                &config.liquidity_pool_program_id,
            )?,
            wrapped_mint: parse_pubkey("wrapped_token_address", &config.wrapped_token_address)?,
            wrapped_pda: parse_pubkey("wrapped_pda", &config.wrapped_pda)?,
            pool_pda: parse_pubkey("pool_pda", &config.pool_pda)?,
            pool_vault: parse_pubkey("pool_vault", &config.pool_vault)?,
        })
    }
}

fn parse_pubkey(name: &str, value: &str) -> RelayResult<Pubkey> {
    Pubkey::from_str(value)
        .map_err(|e| RelayError::configuration(format!("Invalid {} '{}': {}", name, value, e)))
}

/// Instruction fields that come from the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayParams {
    pub user: Pubkey,
    pub amount_with_fee: u64,
    pub amount_out_min: u64,
    pub original_tx_hash: [u8; 32],
    pub validator_sign: [u8; 65],
}

fn amm_accounts(ids: &ProgramIds, amm: &AmmRoute) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(amm.amm_id, false),
        AccountMeta::new_readonly(ids.amm_authority, false),
        AccountMeta::new(amm.amm_open_orders, false),
        AccountMeta::new(amm.amm_target_orders, false),
        AccountMeta::new(amm.pool_coin_token_account, false),
        AccountMeta::new(amm.pool_pc_token_account, false),
        AccountMeta::new_readonly(ids.serum_program, false),
        AccountMeta::new(amm.serum_market, false),
        AccountMeta::new(amm.serum.bids, false),
        AccountMeta::new(amm.serum.asks, false),
        AccountMeta::new(amm.serum.event_queue, false),
        AccountMeta::new(amm.serum.coin_vault, false),
        AccountMeta::new(amm.serum.pc_vault, false),
        AccountMeta::new_readonly(amm.serum.vault_signer, false),
        AccountMeta::new_readonly(ids.liquidity_pool_program, false),
    ]
}

/// Ordered account list for `route`
pub fn relay_accounts(
    ids: &ProgramIds,
    relayer: &Pubkey,
    original_tx_hash: &[u8; 32],
    route: &TransferRoute,
) -> Vec<AccountMeta> {
    let mut accounts = vec![
        AccountMeta::new_readonly(ids.bridge.config(ids.config_version), false),
        AccountMeta::new_readonly(*relayer, true),
        AccountMeta::new_readonly(ids.bridge.relayer(relayer), false),
        AccountMeta::new(ids.bridge.transaction(original_tx_hash), false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new(ids.pool_pda, false),
        AccountMeta::new(ids.pool_vault, false),
    ];

    match route {
        TransferRoute::Swap {
            receiver_token_account,
            amm,
        } => {
            accounts.push(AccountMeta::new(*receiver_token_account, false));
            accounts.push(AccountMeta::new_readonly(ids.token_program, false));
            accounts.extend(amm_accounts(ids, amm));
        }
        TransferRoute::Transfer {
            receiver_token_account,
        } => {
            accounts.push(AccountMeta::new(*receiver_token_account, false));
            accounts.push(AccountMeta::new_readonly(ids.token_program, false));
        }
        TransferRoute::Native { wallet, amm } => {
            accounts.push(AccountMeta::new_readonly(ids.wrapped_mint, false));
            accounts.push(AccountMeta::new(ids.wrapped_pda, false));
            accounts.push(AccountMeta::new_readonly(ids.token_program, false));
            accounts.push(AccountMeta::new_readonly(ids.token_program, false));
            accounts.extend(amm_accounts(ids, amm));
            accounts.push(AccountMeta::new(*wallet, false));
        }
    }

    accounts
}

/// Build the swap-to-user instruction of the bridge program
pub fn build_relay_instruction(
    ids: &ProgramIds,
    relayer: &Pubkey,
    params: &RelayParams,
    route: &TransferRoute,
) -> RelayResult<Instruction> {
    let data = RelayInstructionData {
        instruction_number: SWAP_INSTRUCTION_NUMBER,
        user: params.user.to_bytes(),
        amount_with_fee: params.amount_with_fee,
        amount_out_min: params.amount_out_min,
        original_tx_hash: params.original_tx_hash,
        validator_sign: params.validator_sign,
        is_refund: false,
        transfer_data_type: route.mode().transfer_data_type(),
    }
    .encode()?;

    Ok(Instruction {
        program_id: *ids.bridge.program_id(),
        accounts: relay_accounts(ids, relayer, &params.original_tx_hash, route),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solana::layout::RELAY_INSTRUCTION_LEN;

    fn ids() -> ProgramIds {
        ProgramIds::from_config(&SolanaConfig::default()).unwrap()
    }

    fn amm() -> AmmRoute {
        AmmRoute {
            amm_id: Pubkey::new_unique(),
            amm_open_orders: Pubkey::new_unique(),
            amm_target_orders: Pubkey::new_unique(),
            pool_coin_token_account: Pubkey::new_unique(),
            pool_pc_token_account: Pubkey::new_unique(),
            serum_market: Pubkey::new_unique(),
            serum: SerumAccounts {
                bids: Pubkey::new_unique(),
                asks: Pubkey::new_unique(),
                event_queue: Pubkey::new_unique(),
                coin_vault: Pubkey::new_unique(),
                pc_vault: Pubkey::new_unique(),
                vault_signer: Pubkey::new_unique(),
            },
        }
    }

    fn params() -> RelayParams {
        RelayParams {
            user: Pubkey::new_unique(),
            amount_with_fee: 1_000,
            amount_out_min: 900,
            original_tx_hash: [4u8; 32],
            validator_sign: [5u8; 65],
        }
    }

    #[test]
    fn test_mode_table() {
        let config = SolanaConfig::default();
        let table = TransferModeTable::new(&config.transfer_token_address, &config.native_token_address);
        assert_eq!(table.mode_for(&config.native_token_address), TransferMode::Native);
        assert_eq!(table.mode_for(&config.transfer_token_address), TransferMode::Transfer);
        assert_eq!(table.mode_for(&Pubkey::new_unique().to_string()), TransferMode::Swap);
    }

    #[test]
    fn test_common_prefix() {
        let ids = ids();
        let relayer = Pubkey::new_unique();
        let params = params();
        let route = TransferRoute::Transfer {
            receiver_token_account: Pubkey::new_unique(),
        };
        let ix = build_relay_instruction(&ids, &relayer, &params, &route).unwrap();

        assert_eq!(ix.program_id, *ids.bridge.program_id());
        assert_eq!(ix.accounts[0].pubkey, ids.bridge.config(0));
        assert!(!ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[1].pubkey, relayer);
        assert!(ix.accounts[1].is_signer);
        assert!(!ix.accounts[1].is_writable);
        assert_eq!(ix.accounts[2].pubkey, ids.bridge.relayer(&relayer));
        assert_eq!(ix.accounts[3].pubkey, ids.bridge.transaction(&[4u8; 32]));
        assert!(ix.accounts[3].is_writable);
        assert_eq!(ix.accounts[4].pubkey, system_program::id());
        assert_eq!(ix.accounts[5].pubkey, ids.pool_pda);
        assert_eq!(ix.accounts[6].pubkey, ids.pool_vault);
        assert!(ix.accounts[5].is_writable && ix.accounts[6].is_writable);
    }

    #[test]
    fn test_transfer_route_is_minimal() {
        let ids = ids();
        let receiver = Pubkey::new_unique();
        let route = TransferRoute::Transfer {
            receiver_token_account: receiver,
        };
        let ix = build_relay_instruction(&ids, &Pubkey::new_unique(), &params(), &route).unwrap();

        assert_eq!(ix.data.len(), RELAY_INSTRUCTION_LEN);
        assert_eq!(ix.data[RELAY_INSTRUCTION_LEN - 1], 1);
        assert_eq!(ix.accounts.len(), 9);
        assert_eq!(ix.accounts[7].pubkey, receiver);
        assert!(ix.accounts[7].is_writable);
        assert_eq!(ix.accounts[8].pubkey, spl_token::id());
        assert!(!ix.accounts.iter().any(|a| a.pubkey == ids.wrapped_pda));
    }

    #[test]
    fn test_native_route_includes_wrapped_pda() {
        let ids = ids();
        let wallet = Pubkey::new_unique();
        let amm = amm();
        let route = TransferRoute::Native {
            wallet,
            amm: amm.clone(),
        };
        let ix = build_relay_instruction(&ids, &Pubkey::new_unique(), &params(), &route).unwrap();

        assert_eq!(ix.data[RELAY_INSTRUCTION_LEN - 1], 2);
        assert_eq!(ix.accounts.len(), 7 + 4 + 15 + 1);
        assert_eq!(ix.accounts[7].pubkey, ids.wrapped_mint);
        assert!(!ix.accounts[7].is_writable);
        assert_eq!(ix.accounts[8].pubkey, ids.wrapped_pda);
        assert!(ix.accounts[8].is_writable);
        assert_eq!(ix.accounts[9].pubkey, spl_token::id());
        assert_eq!(ix.accounts[10].pubkey, spl_token::id());
        assert_eq!(ix.accounts[11].pubkey, amm.amm_id);
        assert_eq!(ix.accounts[25].pubkey, ids.liquidity_pool_program);
        let last = ix.accounts.last().unwrap();
        assert_eq!(last.pubkey, wallet);
        assert!(last.is_writable);
    }

    #[test]
    fn test_swap_route_order() {
        let ids = ids();
        let receiver = Pubkey::new_unique();
        let amm = amm();
        let route = TransferRoute::Swap {
            receiver_token_account: receiver,
            amm: amm.clone(),
        };
        let ix = build_relay_instruction(&ids, &Pubkey::new_unique(), &params(), &route).unwrap();

        assert_eq!(ix.data[RELAY_INSTRUCTION_LEN - 1], 0);
        let tail: Vec<(Pubkey, bool)> = ix.accounts[7..]
            .iter()
            .map(|a| (a.pubkey, a.is_writable))
            .collect();
        assert_eq!(
            tail,
            vec![
                (receiver, true),
                (spl_token::id(), false),
                (amm.amm_id, true),
                (ids.amm_authority, false),
                (amm.amm_open_orders, true),
                (amm.amm_target_orders, true),
                (amm.pool_coin_token_account, true),
                (amm.pool_pc_token_account, true),
                (ids.serum_program, false),
                (amm.serum_market, true),
                (amm.serum.bids, true),
                (amm.serum.asks, true),
                (amm.serum.event_queue, true),
                (amm.serum.coin_vault, true),
                (amm.serum.pc_vault, true),
                (amm.serum.vault_signer, false),
                (ids.liquidity_pool_program, false),
            ]
        );
    }

    #[test]
    fn test_bad_program_id_is_configuration_error() {
        let config = SolanaConfig {
            program_id: "not base58!".to_string(),
            ..SolanaConfig::default()
        };
        assert!(matches!(
            ProgramIds::from_config(&config),
            Err(RelayError::Configuration(_))
        ));
    }
}
