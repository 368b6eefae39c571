//! Numeric and byte encoding helpers
//!
//! Pure functions shared by every chain module: fiat rounding, base58 and
//! hex conversions for chain-native addresses and hashes.

use crate::errors::{RelayError, RelayResult};
use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits kept for fiat-denominated amounts
pub const DEFAULT_FIAT_CURRENCY_DECIMALS: u32 = 2;

/// Round a fiat amount half-up to [`DEFAULT_FIAT_CURRENCY_DECIMALS`] digits
pub fn round_fiat_decimals(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(
        DEFAULT_FIAT_CURRENCY_DECIMALS,
        RoundingStrategy::MidpointAwayFromZero,
    );
    // quantize: always carry exactly the fiat scale ("3" -> "3.00")
    rounded.rescale(DEFAULT_FIAT_CURRENCY_DECIMALS);
    rounded
}

/// Convert a `0x`-prefixed hex string into base58
///
/// Anything without the prefix is assumed to already be chain-native and is
/// returned unchanged.
pub fn bytes_to_base58(value: &str) -> RelayResult<String> {
    match value.strip_prefix("0x") {
        Some(_) => Ok(bs58::encode(hex_to_bytes(value)?).into_string()),
        None => Ok(value.to_string()),
    }
}

/// Encode a byte sequence as base58
pub fn bytearray_to_base58(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Split a byte string into its list of byte values
pub fn bytes_to_bytearray(bytes: &[u8]) -> Vec<u8> {
    bytes.to_vec()
}

/// Decode base58 text into raw bytes
pub fn base58_to_bytes(value: &str) -> RelayResult<Vec<u8>> {
    bs58::decode(value)
        .into_vec()
        .map_err(|e| RelayError::encoding(format!("Invalid base58 '{}': {}", value, e)))
}

/// Decode hex with or without a `0x` prefix
pub fn hex_to_bytes(value: &str) -> RelayResult<Vec<u8>> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped).map_err(|e| RelayError::encoding(format!("Invalid hex '{}': {}", value, e)))
}

/// Decode hex into a fixed-width array, rejecting any other length
pub fn hex_to_array<const N: usize>(value: &str) -> RelayResult<[u8; N]> {
    let bytes = hex_to_bytes(value)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        RelayError::encoding(format!("Expected {} bytes, got {} in '{}'", N, len, value))
    })
}
