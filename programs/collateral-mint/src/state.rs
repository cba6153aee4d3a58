use anchor_lang::prelude::*;

pub const BPS_DENOMINATOR: u16 = 10_000;

/// Engine-wide configuration. The account is also the engine authority PDA:
/// mint authority of the asset, holder of the vault shares and burn delegate.
#[account]
pub struct EngineConfig {
    pub authority: Pubkey,
    pub asset_mint: Pubkey,
    pub oracle: Pubkey, // Index price account of the oracle program
    pub vault: Pubkey, // Vault state account of the yield vault program
    pub collateral_requirement_bps: u16, // Share of collateral value that must stay unborrowed
    pub total_collateral: u64,
    pub total_debt: u64,
    pub paused: bool,
    pub created_at: i64,
    pub bump: u8,
}

impl EngineConfig {
    pub const LEN: usize = 8 + // discriminator
        32 + // authority
        32 + // asset_mint
        32 + // oracle
        32 + // vault
        2 +  // collateral_requirement_bps
        8 +  // total_collateral
        8 +  // total_debt
        1 +  // paused
        8 +  // created_at
        1;   // bump

    /// Deposits and mints are refused while paused.
    pub fn require_active(&self) -> Result<()> {
        require!(!self.paused, CollateralMintError::ProtocolPaused);
        Ok(())
    }

    pub fn set_paused(&mut self, paused: bool) -> Result<()> {
        require!(self.paused != paused, CollateralMintError::InvalidConfig);
        self.paused = paused;
        Ok(())
    }

    pub fn record_deposit(&mut self, amount: u64) -> Result<()> {
        self.total_collateral = self.total_collateral
            .checked_add(amount)
            .ok_or(CollateralMintError::MathOverflow)?;
        Ok(())
    }

    pub fn record_withdrawal(&mut self, amount: u64) -> Result<()> {
        self.total_collateral = self.total_collateral
            .checked_sub(amount)
            .ok_or(CollateralMintError::MathOverflow)?;
        Ok(())
    }

    pub fn record_mint(&mut self, amount: u64) -> Result<()> {
        self.total_debt = self.total_debt
            .checked_add(amount)
            .ok_or(CollateralMintError::MathOverflow)?;
        Ok(())
    }

    pub fn record_burn(&mut self, amount: u64) -> Result<()> {
        self.total_debt = self.total_debt
            .checked_sub(amount)
            .ok_or(CollateralMintError::MathOverflow)?;
        Ok(())
    }
}

/// Collateral position of one owner. Never closed; a fully unwound position
/// keeps all-zero balances.
#[account]
#[derive(Default, Debug, PartialEq, Eq)]
pub struct Position {
    pub owner: Pubkey,
    pub collateral_balance: u64, // Lamports deposited
    pub vault_share_balance: u64, // Vault shares held for this owner
    pub debt_balance: u64, // Asset tokens minted against the position
    pub bump: u8,
}

impl Position {
    pub const LEN: usize = 8 + // discriminator
        32 + // owner
        8 +  // collateral_balance
        8 +  // vault_share_balance
        8 +  // debt_balance
        1;   // bump

    pub fn empty(owner: Pubkey) -> Self {
        Self {
            owner,
            ..Self::default()
        }
    }
}

#[error_code]
pub enum CollateralMintError {
    #[msg("Mint would exceed the maximum loan-to-value of the collateral")]
    InsufficientCollateral,
    #[msg("Burn amount exceeds outstanding debt")]
    ExcessiveBurn,
    #[msg("Remaining collateral would not back the outstanding debt")]
    CollateralLocked,
    #[msg("Insufficient balance or allowance")]
    InsufficientBalance,
    #[msg("Invalid amount - must be greater than zero")]
    InvalidAmount,
    #[msg("Invalid configuration")]
    InvalidConfig,
    #[msg("Invalid oracle price")]
    InvalidOraclePrice,
    #[msg("Invalid oracle account")]
    InvalidOracle,
    #[msg("Invalid vault account")]
    InvalidVault,
    #[msg("Invalid mint account")]
    InvalidMint,
    #[msg("Invalid metadata account")]
    InvalidMetadataAccount,
    #[msg("Protocol is paused")]
    ProtocolPaused,
    #[msg("Unauthorized")]
    Unauthorized,
    #[msg("Position belongs to another owner")]
    PositionOwnerMismatch,
    #[msg("Arithmetic overflow")]
    MathOverflow,
    #[msg("Position account does not exist")]
    PositionNotFound,
}
