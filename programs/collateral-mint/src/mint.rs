use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_option::COption;
use anchor_spl::associated_token::AssociatedToken;
use anchor_spl::token::{self, Burn, Mint, MintTo, Token, TokenAccount};
use index_oracle::state::IndexPrice;

use crate::engine::{AssetToken, CollateralEngine};
use crate::ledger::AccountLedger;
use crate::state::{CollateralMintError, EngineConfig, Position};
use crate::{ENGINE_SEED, POSITION_SEED};

/// SPL asset mint driven by the engine PDA, bound to one holder's token account.
pub struct AssetTokenCpi<'info> {
    pub token_program: AccountInfo<'info>,
    pub asset_mint: AccountInfo<'info>,
    pub holder_account: AccountInfo<'info>,
    pub engine: AccountInfo<'info>,
    pub holder: Pubkey,
    pub engine_bump: u8,
    pub balance: u64,
    pub allowance: u64, // Amount the holder delegated to the engine
}

impl<'info> AssetTokenCpi<'info> {
    pub fn new(
        token_program: AccountInfo<'info>,
        asset_mint: AccountInfo<'info>,
        holder_account: &Account<'info, TokenAccount>,
        engine: AccountInfo<'info>,
        engine_bump: u8,
    ) -> Self {
        let allowance = match holder_account.delegate {
            COption::Some(delegate) if delegate == engine.key() => holder_account.delegated_amount,
            _ => 0,
        };
        Self {
            token_program,
            asset_mint,
            holder_account: holder_account.to_account_info(),
            engine,
            holder: holder_account.owner,
            engine_bump,
            balance: holder_account.amount,
            allowance,
        }
    }
}

impl<'info> AssetToken for AssetTokenCpi<'info> {
    fn mint(&mut self, to: &Pubkey, amount: u64) -> Result<()> {
        require_keys_eq!(*to, self.holder, CollateralMintError::PositionOwnerMismatch);

        let asset_mint = self.asset_mint.key();
        let seeds = &[ENGINE_SEED, asset_mint.as_ref(), &[self.engine_bump]];
        let signer = &[&seeds[..]];

        let cpi_accounts = MintTo {
            mint: self.asset_mint.clone(),
            to: self.holder_account.clone(),
            authority: self.engine.clone(),
        };
        let cpi_ctx = CpiContext::new_with_signer(self.token_program.clone(), cpi_accounts, signer);
        token::mint_to(cpi_ctx, amount)?;

        self.balance = self.balance
            .checked_add(amount)
            .ok_or(CollateralMintError::MathOverflow)?;
        Ok(())
    }

    fn burn(&mut self, from: &Pubkey, amount: u64) -> Result<()> {
        require_keys_eq!(*from, self.holder, CollateralMintError::PositionOwnerMismatch);
        require!(
            amount <= self.balance && amount <= self.allowance,
            CollateralMintError::InsufficientBalance
        );

        let asset_mint = self.asset_mint.key();
        let seeds = &[ENGINE_SEED, asset_mint.as_ref(), &[self.engine_bump]];
        let signer = &[&seeds[..]];

        // Engine burns as the delegate the holder approved
        let cpi_accounts = Burn {
            mint: self.asset_mint.clone(),
            from: self.holder_account.clone(),
            authority: self.engine.clone(),
        };
        let cpi_ctx = CpiContext::new_with_signer(self.token_program.clone(), cpi_accounts, signer);
        token::burn(cpi_ctx, amount)?;

        self.balance -= amount;
        self.allowance -= amount;
        Ok(())
    }
}

/// Mint the index asset against the caller's collateral
pub fn mint_asset(ctx: Context<MintAsset>, amount: u64) -> Result<()> {
    ctx.accounts.engine.require_active()?;

    let user_key = ctx.accounts.user.key();
    let engine_key = ctx.accounts.engine.key();
    let collateral_requirement_bps = ctx.accounts.engine.collateral_requirement_bps;

    let mut token = AssetTokenCpi::new(
        ctx.accounts.token_program.to_account_info(),
        ctx.accounts.asset_mint.to_account_info(),
        &ctx.accounts.user_asset_account,
        ctx.accounts.engine.to_account_info(),
        ctx.accounts.engine.bump,
    );

    let oracle: &IndexPrice = &ctx.accounts.oracle;
    let ledger = AccountLedger::bind(ctx.accounts.position.as_mut(), &user_key)?;
    let mut engine = CollateralEngine::new(collateral_requirement_bps, ledger)?;
    let receipt = engine.mint_asset(&user_key, amount, oracle, &mut token)?;

    ctx.accounts.engine.record_mint(amount)?;

    emit!(AssetMinted {
        engine: engine_key,
        user: user_key,
        amount,
        debt_balance: receipt.debt_balance,
        debt_value: receipt.debt_value,
    });

    msg!("Minted {} index tokens to {}", amount, user_key);
    Ok(())
}

/// Burn the index asset through the caller's approval and reduce the debt
pub fn burn_asset(ctx: Context<BurnAsset>, amount: u64) -> Result<()> {
    let user_key = ctx.accounts.user.key();
    let engine_key = ctx.accounts.engine.key();
    let collateral_requirement_bps = ctx.accounts.engine.collateral_requirement_bps;

    let mut token = AssetTokenCpi::new(
        ctx.accounts.token_program.to_account_info(),
        ctx.accounts.asset_mint.to_account_info(),
        &ctx.accounts.user_asset_account,
        ctx.accounts.engine.to_account_info(),
        ctx.accounts.engine.bump,
    );

    let ledger = AccountLedger::bind(ctx.accounts.position.as_mut(), &user_key)?;
    let mut engine = CollateralEngine::new(collateral_requirement_bps, ledger)?;
    let receipt = engine.burn_asset(&user_key, amount, &mut token)?;

    ctx.accounts.engine.record_burn(amount)?;

    emit!(AssetBurned {
        engine: engine_key,
        user: user_key,
        amount,
        debt_balance: receipt.debt_balance,
    });

    msg!("Burned {} index tokens from {}", amount, user_key);
    Ok(())
}

#[derive(Accounts)]
pub struct MintAsset<'info> {
    #[account(mut)]
    pub user: Signer<'info>,

    #[account(
        mut,
        seeds = [ENGINE_SEED, engine.asset_mint.as_ref()],
        bump = engine.bump,
        has_one = asset_mint @ CollateralMintError::InvalidMint,
        has_one = oracle @ CollateralMintError::InvalidOracle,
    )]
    pub engine: Box<Account<'info, EngineConfig>>,

    #[account(
        mut,
        seeds = [POSITION_SEED, engine.key().as_ref(), user.key().as_ref()],
        bump,
    )]
    pub position: Option<Account<'info, Position>>,

    pub oracle: Account<'info, IndexPrice>,

    #[account(mut)]
    pub asset_mint: Box<Account<'info, Mint>>,

    #[account(
        init_if_needed,
        payer = user,
        associated_token::mint = asset_mint,
        associated_token::authority = user,
    )]
    pub user_asset_account: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct BurnAsset<'info> {
    pub user: Signer<'info>,

    #[account(
        mut,
        seeds = [ENGINE_SEED, engine.asset_mint.as_ref()],
        bump = engine.bump,
        has_one = asset_mint @ CollateralMintError::InvalidMint,
    )]
    pub engine: Box<Account<'info, EngineConfig>>,

    #[account(
        mut,
        seeds = [POSITION_SEED, engine.key().as_ref(), user.key().as_ref()],
        bump,
    )]
    pub position: Option<Account<'info, Position>>,

    #[account(mut)]
    pub asset_mint: Box<Account<'info, Mint>>,

    #[account(
        mut,
        token::mint = asset_mint,
        token::authority = user,
    )]
    pub user_asset_account: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
}

#[event]
pub struct AssetMinted {
    pub engine: Pubkey,
    pub user: Pubkey,
    pub amount: u64,
    pub debt_balance: u64,
    pub debt_value: u128,
}

#[event]
pub struct AssetBurned {
    pub engine: Pubkey,
    pub user: Pubkey,
    pub amount: u64,
    pub debt_balance: u64,
}
