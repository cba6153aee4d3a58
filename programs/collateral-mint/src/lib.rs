use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_option::COption;
use anchor_spl::token::Mint;
use index_oracle::state::IndexPrice;
use yield_vault::state::VaultState;

pub mod collateral;
pub mod engine;
pub mod ledger;
pub mod math;
pub mod metadata;
pub mod mint;
pub mod state;
pub mod views;

use collateral::*;
use metadata::*;
use mint::*;
use state::*;
use views::*;

declare_id!("9HErEUjXT5cFfm8jdBCBHz4PmmRd7beT3kEah8VoriKe");

pub const ENGINE_SEED: &[u8] = b"engine";
pub const POSITION_SEED: &[u8] = b"position";
// Share account seed of the yield vault program
pub const VAULT_SHARES_SEED: &[u8] = b"shares";

#[program]
pub mod collateral_mint {
    use super::*;

    /// Initialize the engine for an asset mint whose mint authority is already the engine PDA
    pub fn initialize_engine(
        ctx: Context<InitializeEngine>,
        collateral_requirement_bps: u16, // e.g. 6000 = 60% of collateral value stays unborrowed
    ) -> Result<()> {
        require!(
            collateral_requirement_bps <= BPS_DENOMINATOR,
            CollateralMintError::InvalidConfig
        );

        let engine_key = ctx.accounts.engine.key();
        let asset_mint = &ctx.accounts.asset_mint;
        require!(
            asset_mint.mint_authority == COption::Some(engine_key),
            CollateralMintError::InvalidMint
        );
        require!(asset_mint.supply == 0, CollateralMintError::InvalidMint);

        // Vault account must be a live vault of the yield vault program
        let vault_data = ctx.accounts.vault.try_borrow_data()?;
        VaultState::try_deserialize(&mut &vault_data[..])
            .map_err(|_| error!(CollateralMintError::InvalidVault))?;
        drop(vault_data);

        let clock = Clock::get()?;
        let engine = &mut ctx.accounts.engine;
        engine.authority = ctx.accounts.authority.key();
        engine.asset_mint = asset_mint.key();
        engine.oracle = ctx.accounts.oracle.key();
        engine.vault = ctx.accounts.vault.key();
        engine.collateral_requirement_bps = collateral_requirement_bps;
        engine.total_collateral = 0;
        engine.total_debt = 0;
        engine.paused = false;
        engine.created_at = clock.unix_timestamp;
        engine.bump = ctx.bumps.engine;

        emit!(EngineInitialized {
            engine: engine_key,
            authority: engine.authority,
            asset_mint: engine.asset_mint,
            oracle: engine.oracle,
            vault: engine.vault,
            collateral_requirement_bps,
        });

        msg!(
            "Engine initialized for mint {} with collateral requirement {} bps",
            engine.asset_mint,
            collateral_requirement_bps
        );
        Ok(())
    }

    /// Pause or unpause new deposits and mints (only authority)
    pub fn set_paused(ctx: Context<SetPaused>, paused: bool) -> Result<()> {
        let engine = &mut ctx.accounts.engine;

        require_keys_eq!(
            engine.authority,
            ctx.accounts.authority.key(),
            CollateralMintError::Unauthorized
        );
        engine.set_paused(paused)?;

        emit!(EnginePauseChanged {
            engine: engine.key(),
            paused,
        });

        msg!("Engine paused: {}", paused);
        Ok(())
    }

    /// Deposit native currency as collateral (collateralizeEth)
    pub fn collateralize_base(ctx: Context<CollateralizeBase>, amount: u64) -> Result<()> {
        collateral::collateralize_base(ctx, amount)
    }

    /// Mint the index asset up to the loan-to-value limit
    pub fn mint_asset(ctx: Context<MintAsset>, amount: u64) -> Result<()> {
        mint::mint_asset(ctx, amount)
    }

    /// Burn previously minted index asset; requires an approval to the engine PDA
    pub fn burn_asset(ctx: Context<BurnAsset>, amount: u64) -> Result<()> {
        mint::burn_asset(ctx, amount)
    }

    /// Withdraw collateral while the remainder still backs the debt
    pub fn withdraw_collateral(ctx: Context<WithdrawCollateral>, amount: u64) -> Result<()> {
        collateral::withdraw_collateral(ctx, amount)
    }

    /// Lamports deposited by the owner (view function simulation)
    pub fn collateral_balance(ctx: Context<PositionView>) -> Result<u64> {
        views::collateral_balance(ctx)
    }

    /// Base-currency value of the owner's debt (view function simulation)
    pub fn collateral_used(ctx: Context<PositionValueView>) -> Result<u128> {
        views::collateral_used(ctx)
    }

    /// Base-currency value the owner can still borrow (view function simulation)
    pub fn current_borrow_limit(ctx: Context<PositionValueView>) -> Result<u128> {
        views::current_borrow_limit(ctx)
    }

    /// Asset tokens the owner can still mint (view function simulation)
    pub fn mintable_amount(ctx: Context<PositionValueView>) -> Result<u64> {
        views::mintable_amount(ctx)
    }

    /// Vault shares held for the owner (view function simulation)
    pub fn vault_share_balance(ctx: Context<PositionView>) -> Result<u64> {
        views::vault_share_balance(ctx)
    }

    /// Vault shares held by the engine (view function simulation)
    pub fn engine_share_balance(ctx: Context<EngineSharesView>) -> Result<u64> {
        views::engine_share_balance(ctx)
    }

    /// Current index price from the oracle (view function simulation)
    pub fn index_price(ctx: Context<IndexPriceView>) -> Result<u128> {
        views::index_price(ctx)
    }

    /// Collateral requirement in basis points (view function simulation)
    pub fn collateral_requirement(ctx: Context<EngineView>) -> Result<u16> {
        views::collateral_requirement(ctx)
    }

    /// Create Metaplex metadata for the asset mint (only authority)
    pub fn create_asset_metadata(
        ctx: Context<CreateAssetMetadata>,
        name: String,
        symbol: String,
        uri: String,
    ) -> Result<()> {
        metadata::create_asset_metadata(ctx, name, symbol, uri)
    }
}

#[derive(Accounts)]
pub struct InitializeEngine<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    pub asset_mint: Box<Account<'info, Mint>>,

    pub oracle: Account<'info, IndexPrice>,

    /// CHECK: Vault state - owner checked here, layout checked in instruction
    #[account(owner = yield_vault::ID @ CollateralMintError::InvalidVault)]
    pub vault: UncheckedAccount<'info>,

    #[account(
        init,
        payer = authority,
        space = EngineConfig::LEN,
        seeds = [ENGINE_SEED, asset_mint.key().as_ref()],
        bump
    )]
    pub engine: Account<'info, EngineConfig>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct SetPaused<'info> {
    #[account(
        mut,
        seeds = [ENGINE_SEED, engine.asset_mint.as_ref()],
        bump = engine.bump,
    )]
    pub engine: Account<'info, EngineConfig>,
    pub authority: Signer<'info>,
}

#[event]
pub struct EngineInitialized {
    pub engine: Pubkey,
    pub authority: Pubkey,
    pub asset_mint: Pubkey,
    pub oracle: Pubkey,
    pub vault: Pubkey,
    pub collateral_requirement_bps: u16,
}

#[event]
pub struct EnginePauseChanged {
    pub engine: Pubkey,
    pub paused: bool,
}
