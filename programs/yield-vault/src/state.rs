use anchor_lang::prelude::*;

/// Vault holding native lamports on behalf of share holders.
/// The account itself custodies the deposited lamports on top of its rent reserve.
#[account]
pub struct VaultState {
    pub authority: Pubkey,
    pub total_shares: u64,
    pub total_assets: u64, // Lamports owed to share holders (excludes rent reserve)
    pub initial_exchange_rate: u128, // Base units per share at launch, scaled by RATE_SCALE
    pub bump: u8,
}

impl VaultState {
    pub const LEN: usize = 8 + // discriminator
        32 + // authority
        8 +  // total_shares
        8 +  // total_assets
        16 + // initial_exchange_rate
        1;   // bump
}

#[account]
pub struct ShareAccount {
    pub vault: Pubkey,
    pub holder: Pubkey,
    pub shares: u64,
    pub bump: u8,
}

impl ShareAccount {
    pub const LEN: usize = 8 + // discriminator
        32 + // vault
        32 + // holder
        8 +  // shares
        1;   // bump
}

#[error_code]
pub enum VaultError {
    #[msg("Invalid amount - must be greater than zero")]
    InvalidAmount,
    #[msg("Invalid exchange rate")]
    InvalidExchangeRate,
    #[msg("Deposit too small to issue a share")]
    ZeroShares,
    #[msg("Insufficient shares")]
    InsufficientShares,
    #[msg("Insufficient liquidity in vault")]
    InsufficientLiquidity,
    #[msg("Share account does not belong to holder")]
    Unauthorized,
    #[msg("Arithmetic overflow")]
    MathOverflow,
}
