// Index price feed. Whitelisted publishers report how many synthetic index tokens
// one unit of base currency buys (1e18 fixed point). How a publisher derives the
// figure from market sales is outside this program.

use anchor_lang::prelude::*;

pub mod state;
use state::*;

declare_id!("2CfkbBcqWh6bPPMprkcewpS8PRdG4mZFp57PxcPg7kvn");

#[program]
pub mod index_oracle {
    use super::*;

    /// Initialize the oracle config and its price account
    pub fn initialize_oracle(ctx: Context<InitializeOracle>) -> Result<()> {
        let config = &mut ctx.accounts.oracle_config;
        config.authority = ctx.accounts.authority.key();
        config.publishers = Vec::new();
        config.bump = ctx.bumps.oracle_config;

        let price = &mut ctx.accounts.index_price;
        price.config = config.key();
        price.tokens_per_base = 0;
        price.publisher = Pubkey::default();
        price.updated_at = 0;
        price.bump = ctx.bumps.index_price;

        msg!("Index oracle initialized by {}", config.authority);
        Ok(())
    }

    /// Add or remove a price publisher (only authority)
    pub fn set_oracle_whitelist(
        ctx: Context<SetOracleWhitelist>,
        publisher: Pubkey,
        whitelisted: bool,
    ) -> Result<()> {
        let config = &mut ctx.accounts.oracle_config;

        require_keys_eq!(
            config.authority,
            ctx.accounts.authority.key(),
            OracleError::Unauthorized
        );

        let changed = if whitelisted {
            config.whitelist(publisher)?
        } else {
            config.delist(&publisher)
        };

        if changed {
            emit!(PublisherWhitelistUpdated {
                config: config.key(),
                publisher,
                whitelisted,
            });
        }

        msg!("Publisher {} whitelisted: {}", publisher, whitelisted);
        Ok(())
    }

    /// Publish the latest tokens-per-base rate (whitelisted publishers only)
    pub fn publish_price(ctx: Context<PublishPrice>, tokens_per_base: u128) -> Result<()> {
        require!(
            ctx.accounts.oracle_config.is_whitelisted(&ctx.accounts.publisher.key()),
            OracleError::PublisherNotWhitelisted
        );
        require!(tokens_per_base > 0, OracleError::InvalidPrice);

        let clock = Clock::get()?;
        let price = &mut ctx.accounts.index_price;
        price.tokens_per_base = tokens_per_base;
        price.publisher = ctx.accounts.publisher.key();
        price.updated_at = clock.unix_timestamp;

        emit!(IndexPricePublished {
            index_price: price.key(),
            publisher: price.publisher,
            tokens_per_base,
            timestamp: clock.unix_timestamp,
        });

        Ok(())
    }

    /// Latest tokens-per-base rate (view function simulation)
    pub fn latest_price(ctx: Context<LatestPrice>) -> Result<u128> {
        let price = &ctx.accounts.index_price;
        require!(price.tokens_per_base > 0, OracleError::PriceUnavailable);
        Ok(price.tokens_per_base)
    }
}

#[derive(Accounts)]
pub struct InitializeOracle<'info> {
    #[account(
        init,
        payer = authority,
        space = OracleConfig::LEN,
        seeds = [b"oracle_config"],
        bump
    )]
    pub oracle_config: Account<'info, OracleConfig>,

    #[account(
        init,
        payer = authority,
        space = IndexPrice::LEN,
        seeds = [b"index_price", oracle_config.key().as_ref()],
        bump
    )]
    pub index_price: Account<'info, IndexPrice>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct SetOracleWhitelist<'info> {
    #[account(mut, has_one = authority)]
    pub oracle_config: Account<'info, OracleConfig>,
    pub authority: Signer<'info>,
}

#[derive(Accounts)]
pub struct PublishPrice<'info> {
    pub oracle_config: Account<'info, OracleConfig>,

    #[account(
        mut,
        seeds = [b"index_price", oracle_config.key().as_ref()],
        bump = index_price.bump,
    )]
    pub index_price: Account<'info, IndexPrice>,

    pub publisher: Signer<'info>,
}

#[derive(Accounts)]
pub struct LatestPrice<'info> {
    pub index_price: Account<'info, IndexPrice>,
}

#[event]
pub struct PublisherWhitelistUpdated {
    pub config: Pubkey,
    pub publisher: Pubkey,
    pub whitelisted: bool,
}

#[event]
pub struct IndexPricePublished {
    pub index_price: Pubkey,
    pub publisher: Pubkey,
    pub tokens_per_base: u128,
    pub timestamp: i64,
}
