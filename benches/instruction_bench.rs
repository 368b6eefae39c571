//! Benchmarks for the Solana build path
//!
//! - AMM blob decoding and best-pool selection over a listing
//! - Relay instruction encoding per transfer mode

use base64::Engine as _;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use crosschain_relayer::config::SolanaConfig;
use crosschain_relayer::solana::instruction::{AmmRoute, SerumAccounts};
use crosschain_relayer::solana::layout::AMM_INFO_LEN;
use crosschain_relayer::solana::pools::select_best_pools;
use crosschain_relayer::solana::{
    build_relay_instruction, AmmInfoLayout, ProgramIds, RawPoolAccount, RelayParams, TransferRoute,
};
use solana_sdk::pubkey::Pubkey;

fn pool_blob(coin_mint: &Pubkey, pc_mint: &Pubkey, swap_pc_in_amount: u128) -> RawPoolAccount {
    let mut layout = AmmInfoLayout::decode(&[0u8; AMM_INFO_LEN]).unwrap();
    layout.coin_mint_address = coin_mint.to_bytes();
    layout.pc_mint_address = pc_mint.to_bytes();
    layout.amm_open_orders = Pubkey::new_unique().to_bytes();
    layout.serum_market = Pubkey::new_unique().to_bytes();
    layout.swap_pc_in_amount = swap_pc_in_amount;

    RawPoolAccount {
        pubkey: Pubkey::new_unique().to_string(),
        data_base64: base64::engine::general_purpose::STANDARD.encode(layout.encode().unwrap()),
    }
}

fn listing(size: usize) -> Vec<RawPoolAccount> {
    let pc_mint = Pubkey::new_unique();
    let coin_mints: Vec<Pubkey> = (0..size / 4 + 1).map(|_| Pubkey::new_unique()).collect();
    (0..size)
        .map(|i| pool_blob(&coin_mints[i % coin_mints.len()], &pc_mint, i as u128))
        .collect()
}

fn amm_route() -> AmmRoute {
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

fn bench_pool_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_selection");

    for size in [10usize, 100, 1_000] {
        let raw = listing(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &raw, |b, raw| {
            b.iter(|| black_box(select_best_pools(black_box(raw))));
        });
    }

    group.finish();
}

fn bench_amm_decode(c: &mut Criterion) {
    let blob = base64::engine::general_purpose::STANDARD
        .decode(pool_blob(&Pubkey::new_unique(), &Pubkey::new_unique(), 1).data_base64)
        .unwrap();

    c.bench_function("amm_info_decode", |b| {
        b.iter(|| black_box(AmmInfoLayout::decode(black_box(&blob)).unwrap()));
    });
}

fn bench_relay_instruction(c: &mut Criterion) {
    let ids = ProgramIds::from_config(&SolanaConfig::default()).unwrap();
    let relayer = Pubkey::new_unique();
    let params = RelayParams {
        user: Pubkey::new_unique(),
        amount_with_fee: 1_000_000,
        amount_out_min: 990_000,
        original_tx_hash: [7u8; 32],
        validator_sign: [9u8; 65],
    };

    let routes = [
        (
            "swap",
            TransferRoute::Swap {
                receiver_token_account: Pubkey::new_unique(),
                amm: amm_route(),
            },
        ),
        (
            "transfer",
            TransferRoute::Transfer {
                receiver_token_account: Pubkey::new_unique(),
            },
        ),
        (
            "native",
            TransferRoute::Native {
                wallet: Pubkey::new_unique(),
                amm: amm_route(),
            },
        ),
    ];

    let mut group = c.benchmark_group("relay_instruction");
    for (name, route) in &routes {
        group.bench_with_input(BenchmarkId::from_parameter(name), route, |b, route| {
            b.iter(|| black_box(build_relay_instruction(&ids, &relayer, &params, black_box(route)).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pool_selection, bench_amm_decode, bench_relay_instruction);
criterion_main!(benches);
