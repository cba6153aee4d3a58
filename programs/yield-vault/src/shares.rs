use anchor_lang::prelude::*;

use crate::state::VaultError;

/// Fixed-point scale of the vault exchange rate (base units per share).
pub const RATE_SCALE: u128 = 1_000_000_000_000_000_000;

/// Current exchange rate: tracked assets per share, scaled by `RATE_SCALE`.
/// An empty vault quotes its configured initial rate.
pub fn exchange_rate(total_assets: u64, total_shares: u64, initial_exchange_rate: u128) -> Result<u128> {
    if total_shares == 0 {
        return Ok(initial_exchange_rate);
    }

    // Multiply first, then divide
    (total_assets as u128)
        .checked_mul(RATE_SCALE)
        .and_then(|scaled| scaled.checked_div(total_shares as u128))
        .ok_or(VaultError::MathOverflow.into())
}

/// Shares issued for a deposit of `amount` base units at `rate`. Rounds down.
pub fn shares_for_deposit(amount: u64, rate: u128) -> Result<u64> {
    require!(rate > 0, VaultError::InvalidExchangeRate);

    let shares = (amount as u128)
        .checked_mul(RATE_SCALE)
        .and_then(|scaled| scaled.checked_div(rate))
        .ok_or(VaultError::MathOverflow)?;

    u64::try_from(shares).map_err(|_| VaultError::MathOverflow.into())
}

/// Base units paid out for redeeming `shares` at `rate`. Rounds down.
pub fn assets_for_redeem(shares: u64, rate: u128) -> Result<u64> {
    let assets = (shares as u128)
        .checked_mul(rate)
        .and_then(|v| v.checked_div(RATE_SCALE))
        .ok_or(VaultError::MathOverflow)?;

    u64::try_from(assets).map_err(|_| VaultError::MathOverflow.into())
}
