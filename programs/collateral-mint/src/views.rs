use anchor_lang::prelude::*;
use index_oracle::state::IndexPrice;

use crate::collateral::read_share_balance;
use crate::engine::{CollateralEngine, IndexOracle};
use crate::ledger::MemoryLedger;
use crate::state::{CollateralMintError, EngineConfig, Position};
use crate::{ENGINE_SEED, POSITION_SEED, VAULT_SHARES_SEED};

// Read-only quotes. The position account is optional: an owner who never
// deposited reads as an empty position.

fn quoting_engine(
    config: &EngineConfig,
    position: &Option<Account<Position>>,
) -> Result<CollateralEngine<MemoryLedger>> {
    let position = position.as_ref().map(|p| (**p).clone());
    CollateralEngine::new(
        config.collateral_requirement_bps,
        MemoryLedger::from_position(position),
    )
}

pub fn collateral_balance(ctx: Context<PositionView>) -> Result<u64> {
    let engine = quoting_engine(&ctx.accounts.engine, &ctx.accounts.position)?;
    Ok(engine.position(&ctx.accounts.owner.key()).collateral_balance)
}

/// Vault shares held for the owner (cETH balance)
pub fn vault_share_balance(ctx: Context<PositionView>) -> Result<u64> {
    let engine = quoting_engine(&ctx.accounts.engine, &ctx.accounts.position)?;
    Ok(engine.position(&ctx.accounts.owner.key()).vault_share_balance)
}

pub fn collateral_used(ctx: Context<PositionValueView>) -> Result<u128> {
    let engine = quoting_engine(&ctx.accounts.engine, &ctx.accounts.position)?;
    let oracle: &IndexPrice = &ctx.accounts.oracle;
    engine.collateral_used(&ctx.accounts.owner.key(), oracle)
}

pub fn current_borrow_limit(ctx: Context<PositionValueView>) -> Result<u128> {
    let engine = quoting_engine(&ctx.accounts.engine, &ctx.accounts.position)?;
    let oracle: &IndexPrice = &ctx.accounts.oracle;
    engine.current_borrow_limit(&ctx.accounts.owner.key(), oracle)
}

pub fn mintable_amount(ctx: Context<PositionValueView>) -> Result<u64> {
    let engine = quoting_engine(&ctx.accounts.engine, &ctx.accounts.position)?;
    let oracle: &IndexPrice = &ctx.accounts.oracle;
    engine.mintable_amount(&ctx.accounts.owner.key(), oracle)
}

/// Vault shares held by the engine across all positions (cETH held by the engine)
pub fn engine_share_balance(ctx: Context<EngineSharesView>) -> Result<u64> {
    read_share_balance(&ctx.accounts.engine_shares.to_account_info())
}

pub fn index_price(ctx: Context<IndexPriceView>) -> Result<u128> {
    ctx.accounts.oracle.price()
}

pub fn collateral_requirement(ctx: Context<EngineView>) -> Result<u16> {
    Ok(ctx.accounts.engine.collateral_requirement_bps)
}

#[derive(Accounts)]
pub struct PositionView<'info> {
    #[account(
        seeds = [ENGINE_SEED, engine.asset_mint.as_ref()],
        bump = engine.bump,
    )]
    pub engine: Account<'info, EngineConfig>,

    /// CHECK: Any account may be queried
    pub owner: UncheckedAccount<'info>,

    #[account(
        seeds = [POSITION_SEED, engine.key().as_ref(), owner.key().as_ref()],
        bump,
    )]
    pub position: Option<Account<'info, Position>>,
}

#[derive(Accounts)]
pub struct PositionValueView<'info> {
    #[account(
        seeds = [ENGINE_SEED, engine.asset_mint.as_ref()],
        bump = engine.bump,
        has_one = oracle @ CollateralMintError::InvalidOracle,
    )]
    pub engine: Account<'info, EngineConfig>,

    /// CHECK: Any account may be queried
    pub owner: UncheckedAccount<'info>,

    #[account(
        seeds = [POSITION_SEED, engine.key().as_ref(), owner.key().as_ref()],
        bump,
    )]
    pub position: Option<Account<'info, Position>>,

    pub oracle: Account<'info, IndexPrice>,
}

#[derive(Accounts)]
pub struct EngineSharesView<'info> {
    #[account(
        seeds = [ENGINE_SEED, engine.asset_mint.as_ref()],
        bump = engine.bump,
        has_one = vault @ CollateralMintError::InvalidVault,
    )]
    pub engine: Account<'info, EngineConfig>,

    /// CHECK: Vault state - bound to the engine config
    pub vault: UncheckedAccount<'info>,

    /// CHECK: Engine share account in the vault; may not exist before the first deposit
    #[account(
        seeds = [VAULT_SHARES_SEED, vault.key().as_ref(), engine.key().as_ref()],
        bump,
        seeds::program = yield_vault::ID,
    )]
    pub engine_shares: UncheckedAccount<'info>,
}

#[derive(Accounts)]
pub struct IndexPriceView<'info> {
    #[account(has_one = oracle @ CollateralMintError::InvalidOracle)]
    pub engine: Account<'info, EngineConfig>,

    pub oracle: Account<'info, IndexPrice>,
}

#[derive(Accounts)]
pub struct EngineView<'info> {
    pub engine: Account<'info, EngineConfig>,
}
