use anchor_lang::prelude::*;

pub const MAX_PUBLISHERS: usize = 8;

#[account]
pub struct OracleConfig {
    pub authority: Pubkey,
    pub publishers: Vec<Pubkey>, // Whitelisted price reporters
    pub bump: u8,
}

impl OracleConfig {
    pub const LEN: usize = 8 + // discriminator
        32 + // authority
        4 + 32 * MAX_PUBLISHERS + // publishers vec
        1;   // bump

    pub fn is_whitelisted(&self, publisher: &Pubkey) -> bool {
        self.publishers.contains(publisher)
    }

    /// Returns false when the publisher was already whitelisted.
    pub fn whitelist(&mut self, publisher: Pubkey) -> Result<bool> {
        if self.is_whitelisted(&publisher) {
            return Ok(false);
        }
        require!(self.publishers.len() < MAX_PUBLISHERS, OracleError::WhitelistFull);
        self.publishers.push(publisher);
        Ok(true)
    }

    /// Returns false when the publisher was not whitelisted.
    pub fn delist(&mut self, publisher: &Pubkey) -> bool {
        let before = self.publishers.len();
        self.publishers.retain(|p| p != publisher);
        self.publishers.len() != before
    }
}

/// Latest published index price: synthetic tokens per one unit of base currency,
/// scaled by 1e18.
#[account]
pub struct IndexPrice {
    pub config: Pubkey,
    pub tokens_per_base: u128,
    pub publisher: Pubkey,
    pub updated_at: i64,
    pub bump: u8,
}

impl IndexPrice {
    pub const LEN: usize = 8 + // discriminator
        32 + // config
        16 + // tokens_per_base
        32 + // publisher
        8 +  // updated_at
        1;   // bump
}

#[error_code]
pub enum OracleError {
    #[msg("Unauthorized")]
    Unauthorized,
    #[msg("Publisher is not whitelisted")]
    PublisherNotWhitelisted,
    #[msg("Publisher whitelist is full")]
    WhitelistFull,
    #[msg("Invalid price - must be greater than zero")]
    InvalidPrice,
    #[msg("No price has been published yet")]
    PriceUnavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OracleConfig {
        OracleConfig {
            authority: Pubkey::new_unique(),
            publishers: Vec::new(),
            bump: 255,
        }
    }

    #[test]
    fn whitelist_is_idempotent() {
        let mut cfg = config();
        let publisher = Pubkey::new_unique();

        assert!(cfg.whitelist(publisher).unwrap());
        assert!(!cfg.whitelist(publisher).unwrap());
        assert_eq!(cfg.publishers.len(), 1);
        assert!(cfg.is_whitelisted(&publisher));
    }

    #[test]
    fn delist_removes_only_the_named_publisher() {
        let mut cfg = config();
        let keep = Pubkey::new_unique();
        let removed = Pubkey::new_unique();
        cfg.whitelist(keep).unwrap();
        cfg.whitelist(removed).unwrap();

        assert!(cfg.delist(&removed));
        assert!(!cfg.delist(&removed));
        assert!(cfg.is_whitelisted(&keep));
        assert!(!cfg.is_whitelisted(&removed));
    }

    #[test]
    fn whitelist_is_capped() {
        let mut cfg = config();
        for _ in 0..MAX_PUBLISHERS {
            cfg.whitelist(Pubkey::new_unique()).unwrap();
        }
        assert!(cfg.whitelist(Pubkey::new_unique()).is_err());
        assert_eq!(cfg.publishers.len(), MAX_PUBLISHERS);
    }
}
