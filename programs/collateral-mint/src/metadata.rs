use anchor_lang::prelude::*;
use anchor_spl::metadata::{create_metadata_accounts_v3, CreateMetadataAccountsV3};
use anchor_spl::token::Mint;
use mpl_token_metadata::types::DataV2;

use crate::state::{CollateralMintError, EngineConfig};
use crate::ENGINE_SEED;

/// Create Metaplex metadata for the asset mint.
/// The engine PDA signs as mint authority and becomes the update authority.
pub fn create_asset_metadata(
    ctx: Context<CreateAssetMetadata>,
    name: String,
    symbol: String,
    uri: String,
) -> Result<()> {
    let engine = &ctx.accounts.engine;

    require_keys_eq!(
        engine.authority,
        ctx.accounts.authority.key(),
        CollateralMintError::Unauthorized
    );

    // Seeds: ["metadata", TOKEN_METADATA_PROGRAM_ID, mint]
    let metadata_program_id = ctx.accounts.token_metadata_program.key();
    let (metadata_pda, _bump) = Pubkey::find_program_address(
        &[
            b"metadata",
            metadata_program_id.as_ref(),
            ctx.accounts.asset_mint.key().as_ref(),
        ],
        &metadata_program_id,
    );
    require_keys_eq!(
        metadata_pda,
        ctx.accounts.metadata.key(),
        CollateralMintError::InvalidMetadataAccount
    );

    let data = DataV2 {
        name,
        symbol,
        uri,
        seller_fee_basis_points: 0,
        creators: None,
        collection: None,
        uses: None,
    };

    let seeds = &[ENGINE_SEED, engine.asset_mint.as_ref(), &[engine.bump]];
    let signer = &[&seeds[..]];

    let cpi_accounts = CreateMetadataAccountsV3 {
        metadata: ctx.accounts.metadata.to_account_info(),
        mint: ctx.accounts.asset_mint.to_account_info(),
        mint_authority: engine.to_account_info(),
        payer: ctx.accounts.authority.to_account_info(),
        update_authority: engine.to_account_info(),
        system_program: ctx.accounts.system_program.to_account_info(),
        rent: ctx.accounts.rent.to_account_info(),
    };
    let cpi_ctx = CpiContext::new_with_signer(
        ctx.accounts.token_metadata_program.to_account_info(),
        cpi_accounts,
        signer,
    );

    create_metadata_accounts_v3(
        cpi_ctx,
        data,
        true, // is_mutable
        true, // update_authority_is_signer (engine PDA signs)
        None, // collection_details
    )?;

    msg!("Token metadata created for asset mint: {}", ctx.accounts.asset_mint.key());
    Ok(())
}

#[derive(Accounts)]
pub struct CreateAssetMetadata<'info> {
    #[account(
        seeds = [ENGINE_SEED, engine.asset_mint.as_ref()],
        bump = engine.bump,
        has_one = asset_mint @ CollateralMintError::InvalidMint,
    )]
    pub engine: Account<'info, EngineConfig>,

    #[account(mut)]
    pub asset_mint: Account<'info, Mint>,

    /// CHECK: Metadata PDA - created by the Metaplex program, address checked in instruction
    #[account(mut)]
    pub metadata: UncheckedAccount<'info>,

    /// Engine authority; pays the metadata rent
    #[account(mut)]
    pub authority: Signer<'info>,

    /// CHECK: Token Metadata program - invoked by CPI
    #[account(address = mpl_token_metadata::ID)]
    pub token_metadata_program: UncheckedAccount<'info>,

    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}
