//! Fixed-point conversions between asset tokens and base currency.
//!
//! Every division rounds down. Debt value is always computed on the whole
//! debt balance, so rounding can never let a position cross its limit.

use anchor_lang::prelude::*;

use crate::state::{CollateralMintError, BPS_DENOMINATOR};

/// Scale of the oracle price (asset tokens per one unit of base currency).
pub const PRICE_SCALE: u128 = 1_000_000_000_000_000_000;

fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128> {
    a.checked_mul(b)
        .and_then(|v| v.checked_div(denominator))
        .ok_or(CollateralMintError::MathOverflow.into())
}

pub fn to_u64(value: u128) -> Result<u64> {
    u64::try_from(value).map_err(|_| CollateralMintError::MathOverflow.into())
}

/// Base-currency value of `token_amount`: `token_amount * PRICE_SCALE / price`.
pub fn base_value(token_amount: u64, price: u128) -> Result<u128> {
    require!(price > 0, CollateralMintError::InvalidOraclePrice);
    mul_div(token_amount as u128, PRICE_SCALE, price)
}

/// `floor(base_value * price / PRICE_SCALE)` without the full product, which
/// overflows for large prices. Saturates at `u128::MAX`.
pub fn token_value(base_value: u128, price: u128) -> Result<u128> {
    require!(price > 0, CollateralMintError::InvalidOraclePrice);
    let whole = base_value.saturating_mul(price / PRICE_SCALE);
    // Fractional part: remainder < PRICE_SCALE keeps the product in range for u64-sized values
    let fraction = base_value.saturating_mul(price % PRICE_SCALE) / PRICE_SCALE;
    Ok(whole.saturating_add(fraction))
}

/// Asset tokens worth `base_value`: `base_value * price / PRICE_SCALE`.
pub fn token_amount(base_value: u128, price: u128) -> Result<u64> {
    to_u64(token_value(base_value, price)?)
}

/// Largest debt value `collateral` can back: `collateral * (10000 - bps) / 10000`.
pub fn max_borrowable(collateral: u64, collateral_requirement_bps: u16) -> Result<u128> {
    let max_ltv_bps = BPS_DENOMINATOR
        .checked_sub(collateral_requirement_bps)
        .ok_or(CollateralMintError::InvalidConfig)?;
    mul_div(collateral as u128, max_ltv_bps as u128, BPS_DENOMINATOR as u128)
}

/// Vault shares backing `amount` out of `collateral`. Withdrawing the whole
/// collateral returns the whole share balance.
pub fn pro_rata_shares(share_balance: u64, amount: u64, collateral: u64) -> Result<u64> {
    require!(collateral > 0, CollateralMintError::InsufficientBalance);
    if amount == collateral {
        return Ok(share_balance);
    }
    to_u64(mul_div(share_balance as u128, amount as u128, collateral as u128)?)
}
