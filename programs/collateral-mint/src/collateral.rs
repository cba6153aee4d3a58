use anchor_lang::prelude::*;
use index_oracle::state::IndexPrice;
use yield_vault::program::YieldVault;
use yield_vault::state::ShareAccount;

use crate::engine::{CollateralEngine, ShareVault};
use crate::ledger::AccountLedger;
use crate::state::{CollateralMintError, EngineConfig, Position};
use crate::{ENGINE_SEED, POSITION_SEED, VAULT_SHARES_SEED};

/// Yield vault reached through CPI, with the engine PDA as share holder.
pub struct VaultCpi<'info> {
    pub vault_program: AccountInfo<'info>,
    pub vault_state: AccountInfo<'info>,
    pub engine_shares: AccountInfo<'info>,
    pub engine: AccountInfo<'info>,
    pub user: AccountInfo<'info>,
    pub system_program: AccountInfo<'info>,
    pub asset_mint: Pubkey,
    pub engine_bump: u8,
}

impl<'info> ShareVault for VaultCpi<'info> {
    fn deposit(&mut self, amount: u64) -> Result<u64> {
        let seeds = &[ENGINE_SEED, self.asset_mint.as_ref(), &[self.engine_bump]];
        let signer = &[&seeds[..]];

        let cpi_accounts = yield_vault::cpi::accounts::Deposit {
            payer: self.user.clone(),
            holder: self.engine.clone(),
            vault_state: self.vault_state.clone(),
            share_account: self.engine_shares.clone(),
            system_program: self.system_program.clone(),
        };
        let cpi_ctx = CpiContext::new_with_signer(self.vault_program.clone(), cpi_accounts, signer);
        Ok(yield_vault::cpi::deposit(cpi_ctx, amount)?.get())
    }

    fn redeem(&mut self, shares: u64) -> Result<u64> {
        let seeds = &[ENGINE_SEED, self.asset_mint.as_ref(), &[self.engine_bump]];
        let signer = &[&seeds[..]];

        let cpi_accounts = yield_vault::cpi::accounts::Redeem {
            holder: self.engine.clone(),
            vault_state: self.vault_state.clone(),
            share_account: self.engine_shares.clone(),
            recipient: self.user.clone(),
        };
        let cpi_ctx = CpiContext::new_with_signer(self.vault_program.clone(), cpi_accounts, signer);
        Ok(yield_vault::cpi::redeem(cpi_ctx, shares)?.get())
    }

    fn share_balance(&self) -> Result<u64> {
        read_share_balance(&self.engine_shares)
    }
}

/// Shares recorded in a vault share account; an account not yet created holds none.
pub fn read_share_balance(info: &AccountInfo) -> Result<u64> {
    if info.data_is_empty() {
        return Ok(0);
    }
    require_keys_eq!(*info.owner, yield_vault::ID, CollateralMintError::InvalidVault);
    let data = info.try_borrow_data()?;
    let share_account = ShareAccount::try_deserialize(&mut &data[..])?;
    Ok(share_account.shares)
}

/// Lock native currency as collateral; the engine deposits it into the yield vault
pub fn collateralize_base(ctx: Context<CollateralizeBase>, amount: u64) -> Result<()> {
    ctx.accounts.engine.require_active()?;

    let user_key = ctx.accounts.user.key();
    let engine_key = ctx.accounts.engine.key();
    let collateral_requirement_bps = ctx.accounts.engine.collateral_requirement_bps;

    let mut vault = VaultCpi {
        vault_program: ctx.accounts.vault_program.to_account_info(),
        vault_state: ctx.accounts.vault.to_account_info(),
        engine_shares: ctx.accounts.engine_shares.to_account_info(),
        engine: ctx.accounts.engine.to_account_info(),
        user: ctx.accounts.user.to_account_info(),
        system_program: ctx.accounts.system_program.to_account_info(),
        asset_mint: ctx.accounts.engine.asset_mint,
        engine_bump: ctx.accounts.engine.bump,
    };

    // init_if_needed leaves a zeroed account on first deposit
    let position = &mut ctx.accounts.position;
    if position.owner == Pubkey::default() {
        position.bump = ctx.bumps.position;
    }

    let ledger = AccountLedger::bind(Some(position), &user_key)?;
    let mut engine = CollateralEngine::new(collateral_requirement_bps, ledger)?;
    let receipt = engine.collateralize_base(&user_key, amount, &mut vault)?;

    ctx.accounts.engine.record_deposit(amount)?;

    emit!(CollateralDeposited {
        engine: engine_key,
        user: user_key,
        amount,
        shares_issued: receipt.shares_issued,
        collateral_balance: receipt.collateral_balance,
    });

    msg!("Collateralized {} lamports for {}", amount, user_key);
    Ok(())
}

/// Withdraw collateral; the pro-rata vault shares are redeemed straight to the user
pub fn withdraw_collateral(ctx: Context<WithdrawCollateral>, amount: u64) -> Result<()> {
    let user_key = ctx.accounts.user.key();
    let engine_key = ctx.accounts.engine.key();
    let collateral_requirement_bps = ctx.accounts.engine.collateral_requirement_bps;

    let mut vault = VaultCpi {
        vault_program: ctx.accounts.vault_program.to_account_info(),
        vault_state: ctx.accounts.vault.to_account_info(),
        engine_shares: ctx.accounts.engine_shares.to_account_info(),
        engine: ctx.accounts.engine.to_account_info(),
        user: ctx.accounts.user.to_account_info(),
        system_program: ctx.accounts.system_program.to_account_info(),
        asset_mint: ctx.accounts.engine.asset_mint,
        engine_bump: ctx.accounts.engine.bump,
    };

    let oracle: &IndexPrice = &ctx.accounts.oracle;
    // Without a position account the owner reads as empty and the withdrawal fails
    let ledger = AccountLedger::bind(ctx.accounts.position.as_mut(), &user_key)?;
    let mut engine = CollateralEngine::new(collateral_requirement_bps, ledger)?;
    let receipt = engine.withdraw_collateral(&user_key, amount, oracle, &mut vault)?;

    ctx.accounts.engine.record_withdrawal(amount)?;

    emit!(CollateralWithdrawn {
        engine: engine_key,
        user: user_key,
        amount,
        shares_redeemed: receipt.shares_redeemed,
        base_returned: receipt.base_returned,
        collateral_balance: receipt.collateral_balance,
    });

    msg!("Withdrew {} lamports of collateral for {}", amount, user_key);
    Ok(())
}

#[derive(Accounts)]
pub struct CollateralizeBase<'info> {
    #[account(mut)]
    pub user: Signer<'info>,

    #[account(
        mut,
        seeds = [ENGINE_SEED, engine.asset_mint.as_ref()],
        bump = engine.bump,
        has_one = vault @ CollateralMintError::InvalidVault,
    )]
    pub engine: Account<'info, EngineConfig>,

    #[account(
        init_if_needed,
        payer = user,
        space = Position::LEN,
        seeds = [POSITION_SEED, engine.key().as_ref(), user.key().as_ref()],
        bump
    )]
    pub position: Account<'info, Position>,

    /// CHECK: Vault state - bound to the engine config, validated by the vault program
    #[account(mut, owner = yield_vault::ID @ CollateralMintError::InvalidVault)]
    pub vault: UncheckedAccount<'info>,

    /// CHECK: Engine share account in the vault, created by the vault program on first deposit
    #[account(
        mut,
        seeds = [VAULT_SHARES_SEED, vault.key().as_ref(), engine.key().as_ref()],
        bump,
        seeds::program = vault_program.key(),
    )]
    pub engine_shares: UncheckedAccount<'info>,

    pub vault_program: Program<'info, YieldVault>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct WithdrawCollateral<'info> {
    #[account(mut)]
    pub user: Signer<'info>,

    #[account(
        mut,
        seeds = [ENGINE_SEED, engine.asset_mint.as_ref()],
        bump = engine.bump,
        has_one = vault @ CollateralMintError::InvalidVault,
        has_one = oracle @ CollateralMintError::InvalidOracle,
    )]
    pub engine: Account<'info, EngineConfig>,

    #[account(
        mut,
        seeds = [POSITION_SEED, engine.key().as_ref(), user.key().as_ref()],
        bump,
    )]
    pub position: Option<Account<'info, Position>>,

    pub oracle: Account<'info, IndexPrice>,

    /// CHECK: Vault state - bound to the engine config, validated by the vault program
    #[account(mut, owner = yield_vault::ID @ CollateralMintError::InvalidVault)]
    pub vault: UncheckedAccount<'info>,

    /// CHECK: Engine share account in the vault
    #[account(
        mut,
        seeds = [VAULT_SHARES_SEED, vault.key().as_ref(), engine.key().as_ref()],
        bump,
        seeds::program = vault_program.key(),
    )]
    pub engine_shares: UncheckedAccount<'info>,

    pub vault_program: Program<'info, YieldVault>,
    pub system_program: Program<'info, System>,
}

#[event]
pub struct CollateralDeposited {
    pub engine: Pubkey,
    pub user: Pubkey,
    pub amount: u64,
    pub shares_issued: u64,
    pub collateral_balance: u64,
}

#[event]
pub struct CollateralWithdrawn {
    pub engine: Pubkey,
    pub user: Pubkey,
    pub amount: u64,
    pub shares_redeemed: u64,
    pub base_returned: u64,
    pub collateral_balance: u64,
}
