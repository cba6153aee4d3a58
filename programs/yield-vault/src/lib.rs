// Yield vault for native lamports. Depositors receive shares priced at the vault
// exchange rate (base units per share, 1e18 fixed point); lamports added through
// accrue_yield raise the rate for every existing holder.

use anchor_lang::prelude::*;
use anchor_lang::system_program;

pub mod shares;
pub mod state;

use shares::*;
use state::*;

declare_id!("6wJnCyFfd7xyPENM9yUogtokYCEnpPkEW5zsGZjoANVp");

#[program]
pub mod yield_vault {
    use super::*;

    /// Create a vault owned by `authority` with its launch exchange rate
    pub fn initialize_vault(ctx: Context<InitializeVault>, initial_exchange_rate: u128) -> Result<()> {
        require!(initial_exchange_rate > 0, VaultError::InvalidExchangeRate);

        let vault = &mut ctx.accounts.vault_state;
        vault.authority = ctx.accounts.authority.key();
        vault.total_shares = 0;
        vault.total_assets = 0;
        vault.initial_exchange_rate = initial_exchange_rate;
        vault.bump = ctx.bumps.vault_state;

        emit!(VaultInitialized {
            vault: vault.key(),
            authority: vault.authority,
            initial_exchange_rate,
        });

        msg!("Vault initialized with exchange rate {}", initial_exchange_rate);
        Ok(())
    }

    /// Deposit lamports from `payer` and credit shares to `holder`.
    /// Returns the number of shares issued.
    pub fn deposit(ctx: Context<Deposit>, amount: u64) -> Result<u64> {
        require!(amount > 0, VaultError::InvalidAmount);

        let rate = exchange_rate(
            ctx.accounts.vault_state.total_assets,
            ctx.accounts.vault_state.total_shares,
            ctx.accounts.vault_state.initial_exchange_rate,
        )?;
        let shares_issued = shares_for_deposit(amount, rate)?;
        require!(shares_issued > 0, VaultError::ZeroShares);

        let cpi_accounts = system_program::Transfer {
            from: ctx.accounts.payer.to_account_info(),
            to: ctx.accounts.vault_state.to_account_info(),
        };
        let cpi_ctx = CpiContext::new(ctx.accounts.system_program.to_account_info(), cpi_accounts);
        system_program::transfer(cpi_ctx, amount)?;

        let vault = &mut ctx.accounts.vault_state;
        vault.total_assets = vault.total_assets
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;
        vault.total_shares = vault.total_shares
            .checked_add(shares_issued)
            .ok_or(VaultError::MathOverflow)?;

        // init_if_needed leaves a zeroed account on first deposit
        let share_account = &mut ctx.accounts.share_account;
        if share_account.holder == Pubkey::default() {
            share_account.vault = vault.key();
            share_account.holder = ctx.accounts.holder.key();
            share_account.bump = ctx.bumps.share_account;
        }
        share_account.shares = share_account.shares
            .checked_add(shares_issued)
            .ok_or(VaultError::MathOverflow)?;

        emit!(SharesIssued {
            vault: vault.key(),
            holder: share_account.holder,
            amount,
            shares: shares_issued,
            exchange_rate: rate,
        });

        Ok(shares_issued)
    }

    /// Burn `shares` of the signing holder and pay the base amount to `recipient`.
    /// Returns the lamports paid out.
    pub fn redeem(ctx: Context<Redeem>, shares: u64) -> Result<u64> {
        require!(shares > 0, VaultError::InvalidAmount);
        require!(
            shares <= ctx.accounts.share_account.shares,
            VaultError::InsufficientShares
        );

        let rate = exchange_rate(
            ctx.accounts.vault_state.total_assets,
            ctx.accounts.vault_state.total_shares,
            ctx.accounts.vault_state.initial_exchange_rate,
        )?;
        let base_returned = assets_for_redeem(shares, rate)?;
        require!(
            base_returned <= ctx.accounts.vault_state.total_assets,
            VaultError::InsufficientLiquidity
        );

        // Keep the rent reserve untouched
        let vault_info = ctx.accounts.vault_state.to_account_info();
        let rent_reserve = Rent::get()?.minimum_balance(vault_info.data_len());
        let spendable = vault_info.lamports().saturating_sub(rent_reserve);
        require!(base_returned <= spendable, VaultError::InsufficientLiquidity);

        let share_account = &mut ctx.accounts.share_account;
        share_account.shares = share_account.shares
            .checked_sub(shares)
            .ok_or(VaultError::InsufficientShares)?;

        let vault = &mut ctx.accounts.vault_state;
        vault.total_shares = vault.total_shares
            .checked_sub(shares)
            .ok_or(VaultError::MathOverflow)?;
        vault.total_assets = vault.total_assets
            .checked_sub(base_returned)
            .ok_or(VaultError::MathOverflow)?;

        // Vault account is program-owned, so lamports move directly
        let recipient_info = ctx.accounts.recipient.to_account_info();
        let vault_lamports = vault_info
            .lamports()
            .checked_sub(base_returned)
            .ok_or(VaultError::InsufficientLiquidity)?;
        let recipient_lamports = recipient_info
            .lamports()
            .checked_add(base_returned)
            .ok_or(VaultError::MathOverflow)?;
        **vault_info.try_borrow_mut_lamports()? = vault_lamports;
        **recipient_info.try_borrow_mut_lamports()? = recipient_lamports;

        emit!(SharesRedeemed {
            vault: vault.key(),
            holder: share_account.holder,
            recipient: recipient_info.key(),
            shares,
            base_returned,
            exchange_rate: rate,
        });

        Ok(base_returned)
    }

    /// Add lamports to the vault without issuing shares, raising the exchange rate
    pub fn accrue_yield(ctx: Context<AccrueYield>, amount: u64) -> Result<()> {
        require!(amount > 0, VaultError::InvalidAmount);

        let cpi_accounts = system_program::Transfer {
            from: ctx.accounts.donor.to_account_info(),
            to: ctx.accounts.vault_state.to_account_info(),
        };
        let cpi_ctx = CpiContext::new(ctx.accounts.system_program.to_account_info(), cpi_accounts);
        system_program::transfer(cpi_ctx, amount)?;

        let vault = &mut ctx.accounts.vault_state;
        vault.total_assets = vault.total_assets
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;

        let rate = exchange_rate(vault.total_assets, vault.total_shares, vault.initial_exchange_rate)?;
        emit!(YieldAccrued {
            vault: vault.key(),
            donor: ctx.accounts.donor.key(),
            amount,
            exchange_rate: rate,
        });

        Ok(())
    }

    /// Current exchange rate (view function simulation)
    pub fn current_exchange_rate(ctx: Context<VaultView>) -> Result<u128> {
        let vault = &ctx.accounts.vault_state;
        exchange_rate(vault.total_assets, vault.total_shares, vault.initial_exchange_rate)
    }

    /// Share balance of a holder (view function simulation)
    pub fn share_balance_of(ctx: Context<ShareBalanceView>) -> Result<u64> {
        Ok(ctx.accounts.share_account.shares)
    }
}

#[derive(Accounts)]
pub struct InitializeVault<'info> {
    #[account(
        init,
        payer = authority,
        space = VaultState::LEN,
        seeds = [b"vault", authority.key().as_ref()],
        bump
    )]
    pub vault_state: Account<'info, VaultState>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct Deposit<'info> {
    /// Funds the deposit and the share account rent
    #[account(mut)]
    pub payer: Signer<'info>,

    /// Owner of the issued shares; may be a PDA signing through CPI
    pub holder: Signer<'info>,

    #[account(
        mut,
        seeds = [b"vault", vault_state.authority.as_ref()],
        bump = vault_state.bump,
    )]
    pub vault_state: Account<'info, VaultState>,

    #[account(
        init_if_needed,
        payer = payer,
        space = ShareAccount::LEN,
        seeds = [b"shares", vault_state.key().as_ref(), holder.key().as_ref()],
        bump
    )]
    pub share_account: Account<'info, ShareAccount>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct Redeem<'info> {
    pub holder: Signer<'info>,

    #[account(
        mut,
        seeds = [b"vault", vault_state.authority.as_ref()],
        bump = vault_state.bump,
    )]
    pub vault_state: Account<'info, VaultState>,

    #[account(
        mut,
        seeds = [b"shares", vault_state.key().as_ref(), holder.key().as_ref()],
        bump = share_account.bump,
        has_one = holder @ VaultError::Unauthorized,
    )]
    pub share_account: Account<'info, ShareAccount>,

    /// CHECK: Receives the redeemed lamports; any writable account may be credited
    #[account(mut)]
    pub recipient: UncheckedAccount<'info>,
}

#[derive(Accounts)]
pub struct AccrueYield<'info> {
    #[account(mut)]
    pub donor: Signer<'info>,

    #[account(
        mut,
        seeds = [b"vault", vault_state.authority.as_ref()],
        bump = vault_state.bump,
    )]
    pub vault_state: Account<'info, VaultState>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct VaultView<'info> {
    pub vault_state: Account<'info, VaultState>,
}

#[derive(Accounts)]
pub struct ShareBalanceView<'info> {
    pub vault_state: Account<'info, VaultState>,

    #[account(
        seeds = [b"shares", vault_state.key().as_ref(), share_account.holder.as_ref()],
        bump = share_account.bump,
    )]
    pub share_account: Account<'info, ShareAccount>,
}

#[event]
pub struct VaultInitialized {
    pub vault: Pubkey,
    pub authority: Pubkey,
    pub initial_exchange_rate: u128,
}

#[event]
pub struct SharesIssued {
    pub vault: Pubkey,
    pub holder: Pubkey,
    pub amount: u64,
    pub shares: u64,
    pub exchange_rate: u128,
}

#[event]
pub struct SharesRedeemed {
    pub vault: Pubkey,
    pub holder: Pubkey,
    pub recipient: Pubkey,
    pub shares: u64,
    pub base_returned: u64,
    pub exchange_rate: u128,
}

#[event]
pub struct YieldAccrued {
    pub vault: Pubkey,
    pub donor: Pubkey,
    pub amount: u64,
    pub exchange_rate: u128,
}
