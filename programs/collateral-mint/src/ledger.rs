use std::collections::BTreeMap;

use anchor_lang::prelude::*;

use crate::state::{CollateralMintError, Position};

/// Per-owner storage of collateral positions.
///
/// `get` never fails: owners without a record read as an empty position.
pub trait CollateralLedger {
    fn get(&self, owner: &Pubkey) -> Position;
    fn set(&mut self, owner: &Pubkey, position: Position) -> Result<()>;
}

/// Ledger backed by one owner's position PDA. The account may not exist yet:
/// the owner then reads as an empty position and nothing can be written.
pub struct AccountLedger<'a, 'info> {
    owner: Pubkey,
    position: Option<&'a mut Account<'info, Position>>,
}

impl<'a, 'info> AccountLedger<'a, 'info> {
    /// Bind the ledger to `owner`. A position recorded for another owner is rejected.
    pub fn bind(position: Option<&'a mut Account<'info, Position>>, owner: &Pubkey) -> Result<Self> {
        if let Some(account) = position.as_deref() {
            // A freshly created PDA carries the default owner until first write
            require!(
                account.owner == Pubkey::default() || account.owner == *owner,
                CollateralMintError::PositionOwnerMismatch
            );
        }
        Ok(Self {
            owner: *owner,
            position,
        })
    }
}

impl<'a, 'info> CollateralLedger for AccountLedger<'a, 'info> {
    fn get(&self, owner: &Pubkey) -> Position {
        match self.position.as_deref() {
            Some(account) if *owner == self.owner => Position {
                owner: *owner,
                collateral_balance: account.collateral_balance,
                vault_share_balance: account.vault_share_balance,
                debt_balance: account.debt_balance,
                bump: account.bump,
            },
            _ => Position::empty(*owner),
        }
    }

    fn set(&mut self, owner: &Pubkey, position: Position) -> Result<()> {
        require_keys_eq!(*owner, self.owner, CollateralMintError::PositionOwnerMismatch);
        require_keys_eq!(position.owner, *owner, CollateralMintError::PositionOwnerMismatch);
        let account = self
            .position
            .as_deref_mut()
            .ok_or(CollateralMintError::PositionNotFound)?;

        account.owner = *owner;
        account.collateral_balance = position.collateral_balance;
        account.vault_share_balance = position.vault_share_balance;
        account.debt_balance = position.debt_balance;
        Ok(())
    }
}

/// In-memory ledger, used for read-only quoting and in tests.
#[derive(Default, Debug)]
pub struct MemoryLedger {
    positions: BTreeMap<Pubkey, Position>,
}

impl MemoryLedger {
    pub fn from_position(position: Option<Position>) -> Self {
        let mut positions = BTreeMap::new();
        if let Some(position) = position {
            positions.insert(position.owner, position);
        }
        Self { positions }
    }
}

impl CollateralLedger for MemoryLedger {
    fn get(&self, owner: &Pubkey) -> Position {
        self.positions
            .get(owner)
            .cloned()
            .unwrap_or_else(|| Position::empty(*owner))
    }

    fn set(&mut self, owner: &Pubkey, position: Position) -> Result<()> {
        require_keys_eq!(position.owner, *owner, CollateralMintError::PositionOwnerMismatch);
        self.positions.insert(*owner, position);
        Ok(())
    }
}
