//! Position accounting and solvency checks.
//!
//! The engine owns the ledger and talks to the oracle, vault and asset token
//! through the traits below, so the same code runs against CPI adapters
//! on-chain and in-memory collaborators in tests.
//!
//! Every mutating operation computes the next position, validates it, commits
//! it to the ledger and only then calls out. A failed call restores the prior
//! ledger entry before the error is returned.

use anchor_lang::prelude::*;
use index_oracle::state::IndexPrice;

use crate::ledger::CollateralLedger;
use crate::math::{base_value, max_borrowable, pro_rata_shares, token_value};
use crate::state::{CollateralMintError, Position, BPS_DENOMINATOR};

/// Source of the index price: asset tokens per unit of base currency, 1e18 scaled.
pub trait IndexOracle {
    fn price(&self) -> Result<u128>;
}

impl IndexOracle for IndexPrice {
    fn price(&self) -> Result<u128> {
        require!(self.tokens_per_base > 0, CollateralMintError::InvalidOraclePrice);
        Ok(self.tokens_per_base)
    }
}

/// Yield vault holding the collateral on behalf of the engine.
pub trait ShareVault {
    /// Deposit base currency; returns the shares issued to the engine.
    fn deposit(&mut self, amount: u64) -> Result<u64>;
    /// Redeem engine shares; returns the base currency paid out.
    fn redeem(&mut self, shares: u64) -> Result<u64>;
    /// Shares currently held by the engine.
    fn share_balance(&self) -> Result<u64>;
}

/// Synthetic asset the engine is allowed to mint and burn.
pub trait AssetToken {
    fn mint(&mut self, to: &Pubkey, amount: u64) -> Result<()>;
    /// Burns from `from` through the allowance granted to the engine.
    fn burn(&mut self, from: &Pubkey, amount: u64) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositReceipt {
    pub amount: u64,
    pub shares_issued: u64,
    pub collateral_balance: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintReceipt {
    pub amount: u64,
    pub debt_balance: u64,
    pub debt_value: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurnReceipt {
    pub amount: u64,
    pub debt_balance: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawReceipt {
    pub amount: u64,
    pub shares_redeemed: u64,
    pub base_returned: u64,
    pub collateral_balance: u64,
}

pub struct CollateralEngine<L: CollateralLedger> {
    collateral_requirement_bps: u16,
    ledger: L,
}

impl<L: CollateralLedger> CollateralEngine<L> {
    pub fn new(collateral_requirement_bps: u16, ledger: L) -> Result<Self> {
        require!(
            collateral_requirement_bps <= BPS_DENOMINATOR,
            CollateralMintError::InvalidConfig
        );
        Ok(Self {
            collateral_requirement_bps,
            ledger,
        })
    }

    pub fn collateral_requirement_bps(&self) -> u16 {
        self.collateral_requirement_bps
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn position(&self, owner: &Pubkey) -> Position {
        self.ledger.get(owner)
    }

    /// Commit `next`, then run `call`. On error the prior entry is put back.
    fn commit_then<T>(
        &mut self,
        owner: &Pubkey,
        next: Position,
        call: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let prior = self.ledger.get(owner);
        self.ledger.set(owner, next)?;
        match call() {
            Ok(value) => Ok(value),
            Err(err) => {
                self.ledger.set(owner, prior)?;
                Err(err)
            }
        }
    }

    /// Deposit `amount` into the vault and credit the issued shares to `owner`.
    pub fn collateralize_base<V: ShareVault>(
        &mut self,
        owner: &Pubkey,
        amount: u64,
        vault: &mut V,
    ) -> Result<DepositReceipt> {
        require!(amount > 0, CollateralMintError::InvalidAmount);

        let mut next = self.ledger.get(owner);
        next.collateral_balance = next.collateral_balance
            .checked_add(amount)
            .ok_or(CollateralMintError::MathOverflow)?;
        let prior_shares = next.vault_share_balance;

        let shares_before = vault.share_balance()?;
        let (shares_issued, vault_share_balance) = self.commit_then(owner, next.clone(), || {
            let issued = vault.deposit(amount)?;
            // The engine's share balance must move by exactly what the vault reports
            let expected = shares_before
                .checked_add(issued)
                .ok_or(CollateralMintError::MathOverflow)?;
            require!(
                issued > 0 && vault.share_balance()? == expected,
                CollateralMintError::InvalidVault
            );
            let credited = prior_shares
                .checked_add(issued)
                .ok_or(CollateralMintError::MathOverflow)?;
            Ok((issued, credited))
        })?;

        next.vault_share_balance = vault_share_balance;
        let collateral_balance = next.collateral_balance;
        self.ledger.set(owner, next)?;

        Ok(DepositReceipt {
            amount,
            shares_issued,
            collateral_balance,
        })
    }

    /// Mint `amount` of the asset to `owner` if the total debt stays within the LTV limit.
    pub fn mint_asset<O: IndexOracle, T: AssetToken>(
        &mut self,
        owner: &Pubkey,
        amount: u64,
        oracle: &O,
        token: &mut T,
    ) -> Result<MintReceipt> {
        require!(amount > 0, CollateralMintError::InvalidAmount);

        let price = oracle.price()?;
        let mut next = self.ledger.get(owner);
        let debt_balance = next.debt_balance
            .checked_add(amount)
            .ok_or(CollateralMintError::MathOverflow)?;

        let debt_value = base_value(debt_balance, price)?;
        let limit = max_borrowable(next.collateral_balance, self.collateral_requirement_bps)?;
        // Dust whose value floors to zero still needs backing collateral
        require!(
            limit > 0 && debt_value <= limit,
            CollateralMintError::InsufficientCollateral
        );

        next.debt_balance = debt_balance;
        self.commit_then(owner, next, || token.mint(owner, amount))?;

        Ok(MintReceipt {
            amount,
            debt_balance,
            debt_value,
        })
    }

    /// Burn `amount` of the asset from `owner` and reduce the debt by the same amount.
    pub fn burn_asset<T: AssetToken>(
        &mut self,
        owner: &Pubkey,
        amount: u64,
        token: &mut T,
    ) -> Result<BurnReceipt> {
        require!(amount > 0, CollateralMintError::InvalidAmount);

        let mut next = self.ledger.get(owner);
        require!(amount <= next.debt_balance, CollateralMintError::ExcessiveBurn);
        next.debt_balance -= amount;
        let debt_balance = next.debt_balance;

        self.commit_then(owner, next, || token.burn(owner, amount))?;

        Ok(BurnReceipt {
            amount,
            debt_balance,
        })
    }

    /// Redeem the pro-rata share slice behind `amount` of collateral and pay it to `owner`.
    pub fn withdraw_collateral<O: IndexOracle, V: ShareVault>(
        &mut self,
        owner: &Pubkey,
        amount: u64,
        oracle: &O,
        vault: &mut V,
    ) -> Result<WithdrawReceipt> {
        require!(amount > 0, CollateralMintError::InvalidAmount);

        let mut next = self.ledger.get(owner);
        require!(
            amount <= next.collateral_balance,
            CollateralMintError::InsufficientBalance
        );
        let remaining = next.collateral_balance - amount;

        if next.debt_balance > 0 {
            let debt_value = base_value(next.debt_balance, oracle.price()?)?;
            let limit = max_borrowable(remaining, self.collateral_requirement_bps)?;
            require!(limit >= debt_value, CollateralMintError::CollateralLocked);
        }

        let shares_redeemed =
            pro_rata_shares(next.vault_share_balance, amount, next.collateral_balance)?;
        require!(shares_redeemed > 0, CollateralMintError::InvalidAmount);

        next.collateral_balance = remaining;
        next.vault_share_balance = next.vault_share_balance
            .checked_sub(shares_redeemed)
            .ok_or(CollateralMintError::MathOverflow)?;

        let base_returned = self.commit_then(owner, next, || vault.redeem(shares_redeemed))?;

        Ok(WithdrawReceipt {
            amount,
            shares_redeemed,
            base_returned,
            collateral_balance: remaining,
        })
    }

    /// Base-currency value of the outstanding debt.
    pub fn collateral_used<O: IndexOracle>(&self, owner: &Pubkey, oracle: &O) -> Result<u128> {
        let debt_balance = self.ledger.get(owner).debt_balance;
        if debt_balance == 0 {
            return Ok(0);
        }
        base_value(debt_balance, oracle.price()?)
    }

    /// Base-currency value that can still be borrowed; zero when the position is at or past its limit.
    pub fn current_borrow_limit<O: IndexOracle>(
        &self,
        owner: &Pubkey,
        oracle: &O,
    ) -> Result<u128> {
        let collateral = self.ledger.get(owner).collateral_balance;
        let limit = max_borrowable(collateral, self.collateral_requirement_bps)?;
        let used = self.collateral_used(owner, oracle)?;
        Ok(limit.saturating_sub(used))
    }

    /// Asset tokens `owner` can mint right now, capped by the room left in the u64 debt balance.
    pub fn mintable_amount<O: IndexOracle>(&self, owner: &Pubkey, oracle: &O) -> Result<u64> {
        let price = oracle.price()?;
        let headroom = self.current_borrow_limit(owner, oracle)?;
        let room = u64::MAX - self.ledger.get(owner).debt_balance;
        let mintable = token_value(headroom, price)?.min(room as u128);
        Ok(mintable as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use anchor_lang::error::Error;
    use yield_vault::shares::{assets_for_redeem, exchange_rate, shares_for_deposit};

    use super::*;
    use crate::ledger::{AccountLedger, MemoryLedger};
    use crate::math::PRICE_SCALE;

    const ONE: u64 = 1_000_000_000_000_000_000;
    const INDEX_PRICE: u128 = 37_674_562_290_713_460;
    const FULL_MINT: u64 = 15_069_824_916_285_384;
    const HALF_MINT: u64 = 7_534_912_458_142_692;

    struct MockOracle {
        price: u128,
    }

    impl IndexOracle for MockOracle {
        fn price(&self) -> Result<u128> {
            require!(self.price > 0, CollateralMintError::InvalidOraclePrice);
            Ok(self.price)
        }
    }

    /// Vault quoting shares like the on-chain program; all shares belong to the engine.
    struct MockVault {
        total_assets: u64,
        total_shares: u64,
        initial_exchange_rate: u128,
        paid_out: u64,
        over_report: u64, // Added to the shares a deposit reports
        fail: bool,
    }

    impl MockVault {
        fn new() -> Self {
            Self {
                total_assets: 0,
                total_shares: 0,
                initial_exchange_rate: 2_000_000_000_000_000_000,
                paid_out: 0,
                over_report: 0,
                fail: false,
            }
        }

        fn rate(&self) -> Result<u128> {
            exchange_rate(self.total_assets, self.total_shares, self.initial_exchange_rate)
        }
    }

    impl ShareVault for MockVault {
        fn deposit(&mut self, amount: u64) -> Result<u64> {
            require!(!self.fail, CollateralMintError::InvalidVault);
            let shares = shares_for_deposit(amount, self.rate()?)?;
            self.total_assets += amount;
            self.total_shares += shares;
            Ok(shares + self.over_report)
        }

        fn redeem(&mut self, shares: u64) -> Result<u64> {
            require!(!self.fail, CollateralMintError::InsufficientBalance);
            let base = assets_for_redeem(shares, self.rate()?)?;
            self.total_assets -= base;
            self.total_shares -= shares;
            self.paid_out += base;
            Ok(base)
        }

        fn share_balance(&self) -> Result<u64> {
            Ok(self.total_shares)
        }
    }

    #[derive(Default)]
    struct MockToken {
        balances: BTreeMap<Pubkey, u64>,
        allowances: BTreeMap<Pubkey, u64>,
        fail: bool,
    }

    impl MockToken {
        fn balance_of(&self, owner: &Pubkey) -> u64 {
            self.balances.get(owner).copied().unwrap_or(0)
        }

        fn approve(&mut self, owner: &Pubkey, amount: u64) {
            self.allowances.insert(*owner, amount);
        }
    }

    impl AssetToken for MockToken {
        fn mint(&mut self, to: &Pubkey, amount: u64) -> Result<()> {
            require!(!self.fail, CollateralMintError::InvalidMint);
            *self.balances.entry(*to).or_default() += amount;
            Ok(())
        }

        fn burn(&mut self, from: &Pubkey, amount: u64) -> Result<()> {
            let balance = self.balance_of(from);
            let allowance = self.allowances.get(from).copied().unwrap_or(0);
            require!(
                !self.fail && amount <= balance && amount <= allowance,
                CollateralMintError::InsufficientBalance
            );
            self.balances.insert(*from, balance - amount);
            self.allowances.insert(*from, allowance - amount);
            Ok(())
        }
    }

    fn error_code(err: Error) -> u32 {
        match err {
            Error::AnchorError(e) => e.error_code_number,
            Error::ProgramError(_) => u32::MAX,
        }
    }

    fn assert_fails<T: std::fmt::Debug>(result: Result<T>, expected: CollateralMintError) {
        let err = result.expect_err("operation should fail");
        assert_eq!(error_code(err), u32::from(expected));
    }

    fn setup() -> (CollateralEngine<MemoryLedger>, MockOracle, MockVault, MockToken) {
        let engine = CollateralEngine::new(6_000, MemoryLedger::default()).unwrap();
        let oracle = MockOracle { price: INDEX_PRICE };
        (engine, oracle, MockVault::new(), MockToken::default())
    }

    #[test]
    fn requirement_above_full_collateral_is_rejected() {
        assert!(CollateralEngine::new(10_001, MemoryLedger::default()).is_err());
        assert!(CollateralEngine::new(10_000, MemoryLedger::default()).is_ok());
    }

    #[test]
    fn full_position_lifecycle() {
        let (mut engine, oracle, mut vault, mut token) = setup();
        let user = Pubkey::new_unique();

        let receipt = engine.collateralize_base(&user, ONE, &mut vault).unwrap();
        assert_eq!(receipt.shares_issued, 500_000_000_000_000_000);
        assert_eq!(vault.total_assets, ONE);
        assert_eq!(engine.current_borrow_limit(&user, &oracle).unwrap(), 400_000_000_000_000_000);
        assert_eq!(engine.position(&user).vault_share_balance, 500_000_000_000_000_000);

        engine.mint_asset(&user, FULL_MINT, &oracle, &mut token).unwrap();
        assert_eq!(token.balance_of(&user), FULL_MINT);
        assert_eq!(engine.current_borrow_limit(&user, &oracle).unwrap(), 0);

        assert_fails(
            engine.mint_asset(&user, 16_069_824_916_285_384, &oracle, &mut token),
            CollateralMintError::InsufficientCollateral,
        );
        assert_eq!(engine.collateral_used(&user, &oracle).unwrap(), 400_000_000_000_000_000);

        token.approve(&user, FULL_MINT);
        engine.burn_asset(&user, 5_069_824_916_285_384, &mut token).unwrap();
        engine.burn_asset(&user, 10_000_000_000_000_000, &mut token).unwrap();
        assert_eq!(token.balance_of(&user), 0);
        assert_eq!(engine.position(&user).debt_balance, 0);

        engine.mint_asset(&user, FULL_MINT, &oracle, &mut token).unwrap();
        token.approve(&user, HALF_MINT);
        engine.burn_asset(&user, HALF_MINT, &mut token).unwrap();
        assert_eq!(engine.current_borrow_limit(&user, &oracle).unwrap(), 200_000_000_000_000_000);
        assert_eq!(engine.collateral_used(&user, &oracle).unwrap(), 200_000_000_000_000_000);

        assert_fails(
            engine.withdraw_collateral(&user, ONE, &oracle, &mut vault),
            CollateralMintError::CollateralLocked,
        );
        assert_fails(
            engine.withdraw_collateral(&user, 550_000_000_000_000_000, &oracle, &mut vault),
            CollateralMintError::CollateralLocked,
        );
        let withdrawal = engine
            .withdraw_collateral(&user, 250_000_000_000_000_000, &oracle, &mut vault)
            .unwrap();
        assert_eq!(withdrawal.shares_redeemed, 125_000_000_000_000_000);
        assert_eq!(withdrawal.base_returned, 250_000_000_000_000_000);

        let position = engine.position(&user);
        assert_eq!(position.collateral_balance, 750_000_000_000_000_000);
        assert_eq!(position.vault_share_balance, 375_000_000_000_000_000);
        assert_eq!(position.debt_balance, HALF_MINT);
        assert_eq!(engine.collateral_used(&user, &oracle).unwrap(), 200_000_000_000_000_000);
        assert_eq!(engine.current_borrow_limit(&user, &oracle).unwrap(), 100_000_000_000_000_000);
        assert_eq!(vault.total_shares, 375_000_000_000_000_000);
        assert_eq!(vault.total_assets, 750_000_000_000_000_000);

        // Other depositors come and go without touching the first position
        for _ in 0..2 {
            let other = Pubkey::new_unique();
            engine.collateralize_base(&other, ONE, &mut vault).unwrap();
            assert_eq!(vault.total_assets, 1_750_000_000_000_000_000);
            let exit = engine.withdraw_collateral(&other, ONE, &oracle, &mut vault).unwrap();
            assert_eq!(exit.base_returned, ONE);
            assert_eq!(engine.position(&other), Position::empty(other));
        }
        assert_eq!(vault.total_assets, 750_000_000_000_000_000);
        assert_eq!(engine.position(&user), position);
    }

    #[test]
    fn zero_amounts_are_rejected() {
        let (mut engine, oracle, mut vault, mut token) = setup();
        let user = Pubkey::new_unique();

        assert_fails(engine.collateralize_base(&user, 0, &mut vault), CollateralMintError::InvalidAmount);
        assert_fails(engine.mint_asset(&user, 0, &oracle, &mut token), CollateralMintError::InvalidAmount);
        assert_fails(engine.burn_asset(&user, 0, &mut token), CollateralMintError::InvalidAmount);
        assert_fails(
            engine.withdraw_collateral(&user, 0, &oracle, &mut vault),
            CollateralMintError::InvalidAmount,
        );
    }

    #[test]
    fn burn_beyond_debt_is_excessive() {
        let (mut engine, oracle, mut vault, mut token) = setup();
        let user = Pubkey::new_unique();
        engine.collateralize_base(&user, ONE, &mut vault).unwrap();
        engine.mint_asset(&user, HALF_MINT, &oracle, &mut token).unwrap();
        token.approve(&user, u64::MAX);

        assert_fails(
            engine.burn_asset(&user, HALF_MINT + 1, &mut token),
            CollateralMintError::ExcessiveBurn,
        );
        assert_eq!(engine.position(&user).debt_balance, HALF_MINT);
    }

    #[test]
    fn burn_without_allowance_keeps_debt() {
        let (mut engine, oracle, mut vault, mut token) = setup();
        let user = Pubkey::new_unique();
        engine.collateralize_base(&user, ONE, &mut vault).unwrap();
        engine.mint_asset(&user, HALF_MINT, &oracle, &mut token).unwrap();

        assert_fails(
            engine.burn_asset(&user, HALF_MINT, &mut token),
            CollateralMintError::InsufficientBalance,
        );
        assert_eq!(engine.position(&user).debt_balance, HALF_MINT);
        assert_eq!(token.balance_of(&user), HALF_MINT);
    }

    #[test]
    fn withdraw_more_than_deposited_fails() {
        let (mut engine, oracle, mut vault, _) = setup();
        let user = Pubkey::new_unique();
        engine.collateralize_base(&user, ONE, &mut vault).unwrap();

        assert_fails(
            engine.withdraw_collateral(&user, ONE + 1, &oracle, &mut vault),
            CollateralMintError::InsufficientBalance,
        );
    }

    #[test]
    fn debt_free_withdrawal_ignores_oracle() {
        let (mut engine, _, mut vault, _) = setup();
        let broken = MockOracle { price: 0 };
        let user = Pubkey::new_unique();
        engine.collateralize_base(&user, ONE, &mut vault).unwrap();

        assert_eq!(engine.collateral_used(&user, &broken).unwrap(), 0);
        engine.withdraw_collateral(&user, ONE, &broken, &mut vault).unwrap();
        assert_eq!(vault.paid_out, ONE);
    }

    #[test]
    fn zero_price_blocks_minting() {
        let (mut engine, _, mut vault, mut token) = setup();
        let broken = MockOracle { price: 0 };
        let user = Pubkey::new_unique();
        engine.collateralize_base(&user, ONE, &mut vault).unwrap();

        assert_fails(
            engine.mint_asset(&user, 1, &broken, &mut token),
            CollateralMintError::InvalidOraclePrice,
        );
    }

    #[test]
    fn failed_vault_deposit_leaves_position_untouched() {
        let (mut engine, _, mut vault, _) = setup();
        let user = Pubkey::new_unique();
        vault.fail = true;

        assert!(engine.collateralize_base(&user, ONE, &mut vault).is_err());
        assert_eq!(engine.position(&user), Position::empty(user));
    }

    #[test]
    fn missing_position_account_fails_before_any_call() {
        let (_, oracle, mut vault, mut token) = setup();
        let user = Pubkey::new_unique();
        token.approve(&user, u64::MAX);
        let ledger = AccountLedger::bind(None, &user).unwrap();
        let mut engine = CollateralEngine::new(6_000, ledger).unwrap();

        assert_fails(
            engine.mint_asset(&user, 1, &oracle, &mut token),
            CollateralMintError::InsufficientCollateral,
        );
        assert_fails(
            engine.burn_asset(&user, 1, &mut token),
            CollateralMintError::ExcessiveBurn,
        );
        assert_fails(
            engine.withdraw_collateral(&user, 1, &oracle, &mut vault),
            CollateralMintError::InsufficientBalance,
        );
        assert_eq!(engine.mintable_amount(&user, &oracle).unwrap(), 0);
        assert_eq!(token.balance_of(&user), 0);
        assert_eq!(vault.paid_out, 0);
    }

    #[test]
    fn misreported_deposit_is_rejected() {
        let (mut engine, _, mut vault, _) = setup();
        let user = Pubkey::new_unique();
        vault.over_report = 1;

        assert_fails(
            engine.collateralize_base(&user, ONE, &mut vault),
            CollateralMintError::InvalidVault,
        );
        assert_eq!(engine.position(&user), Position::empty(user));
    }

    #[test]
    fn deposit_issuing_no_shares_is_rejected() {
        let (mut engine, _, mut vault, _) = setup();
        let user = Pubkey::new_unique();

        // One lamport at two lamports per share floors to zero shares
        assert_fails(
            engine.collateralize_base(&user, 1, &mut vault),
            CollateralMintError::InvalidVault,
        );
        assert_eq!(engine.position(&user), Position::empty(user));
    }

    #[test]
    fn withdrawal_worth_no_shares_is_rejected() {
        let (mut engine, oracle, mut vault, _) = setup();
        let user = Pubkey::new_unique();
        let receipt = engine.collateralize_base(&user, 3, &mut vault).unwrap();
        assert_eq!(receipt.shares_issued, 1);
        let before = engine.position(&user);

        assert_fails(
            engine.withdraw_collateral(&user, 1, &oracle, &mut vault),
            CollateralMintError::InvalidAmount,
        );
        assert_eq!(engine.position(&user), before);
        assert_eq!(vault.paid_out, 0);

        // The full amount still redeems the whole share
        engine.withdraw_collateral(&user, 3, &oracle, &mut vault).unwrap();
        assert_eq!(engine.position(&user), Position::empty(user));
    }

    #[test]
    fn dust_mint_needs_collateral() {
        let (mut engine, _, mut vault, mut token) = setup();
        // 2 tokens at 3 tokens per base unit are worth zero base units
        let oracle = MockOracle { price: 3_000_000_000_000_000_000 };
        let user = Pubkey::new_unique();

        assert_fails(
            engine.mint_asset(&user, 2, &oracle, &mut token),
            CollateralMintError::InsufficientCollateral,
        );

        // 2 lamports of collateral back nothing at a 60% requirement
        vault.initial_exchange_rate = 1_000_000_000_000_000_000;
        engine.collateralize_base(&user, 2, &mut vault).unwrap();
        assert_eq!(max_borrowable(2, 6_000).unwrap(), 0);
        assert_fails(
            engine.mint_asset(&user, 2, &oracle, &mut token),
            CollateralMintError::InsufficientCollateral,
        );
        assert_eq!(engine.position(&user).debt_balance, 0);
        assert_eq!(token.balance_of(&user), 0);
    }

    #[test]
    fn mintable_amount_is_capped_at_large_prices() {
        let (mut engine, _, mut vault, mut token) = setup();
        let oracle = MockOracle { price: 170 * PRICE_SCALE * PRICE_SCALE };
        let user = Pubkey::new_unique();
        engine.collateralize_base(&user, ONE, &mut vault).unwrap();

        let mintable = engine.mintable_amount(&user, &oracle).unwrap();
        assert_eq!(mintable, u64::MAX);
        engine.mint_asset(&user, mintable, &oracle, &mut token).unwrap();
        assert_eq!(engine.mintable_amount(&user, &oracle).unwrap(), 0);
    }

    #[test]
    fn failed_redeem_leaves_position_untouched() {
        let (mut engine, oracle, mut vault, _) = setup();
        let user = Pubkey::new_unique();
        engine.collateralize_base(&user, ONE, &mut vault).unwrap();
        let before = engine.position(&user);

        vault.fail = true;
        assert!(engine.withdraw_collateral(&user, ONE, &oracle, &mut vault).is_err());
        assert_eq!(engine.position(&user), before);
    }

    #[test]
    fn failed_token_mint_leaves_debt_untouched() {
        let (mut engine, oracle, mut vault, mut token) = setup();
        let user = Pubkey::new_unique();
        engine.collateralize_base(&user, ONE, &mut vault).unwrap();

        token.fail = true;
        assert!(engine.mint_asset(&user, HALF_MINT, &oracle, &mut token).is_err());
        assert_eq!(engine.position(&user).debt_balance, 0);
    }

    #[test]
    fn mint_then_burn_restores_limit() {
        let (mut engine, oracle, mut vault, mut token) = setup();
        let user = Pubkey::new_unique();
        engine.collateralize_base(&user, 3 * ONE + 17, &mut vault).unwrap();
        engine.mint_asset(&user, 12_345, &oracle, &mut token).unwrap();
        token.approve(&user, u64::MAX);

        for amount in [1, 999, HALF_MINT, FULL_MINT] {
            let debt = engine.position(&user).debt_balance;
            let limit = engine.current_borrow_limit(&user, &oracle).unwrap();

            engine.mint_asset(&user, amount, &oracle, &mut token).unwrap();
            engine.burn_asset(&user, amount, &mut token).unwrap();

            assert_eq!(engine.position(&user).debt_balance, debt);
            assert_eq!(engine.current_borrow_limit(&user, &oracle).unwrap(), limit);
        }
    }

    #[test]
    fn mintable_amount_is_always_mintable() {
        for price in [INDEX_PRICE, 1, 3_000_000_000_000_000_000, 999_999_999_999_999_999] {
            let (mut engine, _, mut vault, mut token) = setup();
            let oracle = MockOracle { price };
            let user = Pubkey::new_unique();
            engine.collateralize_base(&user, 2 * ONE + 7, &mut vault).unwrap();

            for _ in 0..3 {
                let mintable = engine.mintable_amount(&user, &oracle).unwrap();
                if mintable == 0 {
                    break;
                }
                engine.mint_asset(&user, mintable / 2 + 1, &oracle, &mut token).unwrap();
            }

            let mintable = engine.mintable_amount(&user, &oracle).unwrap();
            if mintable > 0 {
                engine.mint_asset(&user, mintable, &oracle, &mut token).unwrap();
            }
            assert!(
                engine.collateral_used(&user, &oracle).unwrap()
                    <= max_borrowable(2 * ONE + 7, 6_000).unwrap()
            );
        }
    }

    #[test]
    fn solvency_holds_across_mixed_operations() {
        let (mut engine, oracle, mut vault, mut token) = setup();
        let users: Vec<Pubkey> = (0..3).map(|_| Pubkey::new_unique()).collect();
        for user in &users {
            token.approve(user, u64::MAX);
        }

        // Deterministic pseudo-random walk
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for step in 0..200u64 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let user = users[(seed % 3) as usize];
            let amount = (seed >> 8) % (ONE / 10) + 1;

            let _ = match step % 4 {
                0 => engine.collateralize_base(&user, amount, &mut vault).map(|_| ()),
                1 => engine.mint_asset(&user, amount / 20, &oracle, &mut token).map(|_| ()),
                2 => engine.burn_asset(&user, amount / 40, &mut token).map(|_| ()),
                _ => engine
                    .withdraw_collateral(&user, amount / 2, &oracle, &mut vault)
                    .map(|_| ()),
            };

            for user in &users {
                let position = engine.position(user);
                let used = engine.collateral_used(user, &oracle).unwrap();
                let limit = max_borrowable(position.collateral_balance, 6_000).unwrap();
                assert!(used <= limit, "insolvent after step {}", step);
            }
        }

        let total_shares: u64 = users.iter().map(|u| engine.position(u).vault_share_balance).sum();
        assert_eq!(total_shares, vault.total_shares);
    }
}
