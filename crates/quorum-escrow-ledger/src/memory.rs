//! In-memory ledger.
//!
//! Tracks per-account balances and the circulating supply. All mutations
//! are atomic: either the full operation succeeds or no balance changes.

use std::collections::HashMap;

use chrono::Utc;
use quorum_escrow_types::{AccountId, EscrowError, ReceiptId, Result};

use crate::ledger::{TokenLedger, TransferReceipt};
use crate::supply_conservation::SupplyConservation;

/// Reference [`TokenLedger`] backed by a hash map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    /// Per-account balances in base units.
    balances: HashMap<AccountId, u128>,
    /// Circulating supply.
    total_supply: u128,
    /// Mint/burn accounting for the conservation check.
    supply: SupplyConservation,
    /// Every transfer ever applied, by receipt.
    receipts: HashMap<ReceiptId, TransferReceipt>,
    /// Undo log of the open transaction.
    journal: Option<Journal>,
}

/// Values overwritten since `begin`. Only touched accounts are recorded.
#[derive(Debug, Clone)]
struct Journal {
    /// First prior balance per account; `None` if the account was absent.
    balances: HashMap<AccountId, Option<u128>>,
    total_supply: u128,
    supply: SupplyConservation,
    receipts: Vec<ReceiptId>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger whose entire initial supply belongs to `owner`.
    ///
    /// # Errors
    /// Never fails for a fresh ledger; the `Result` mirrors [`TokenLedger::mint`].
    pub fn with_genesis(owner: AccountId, supply: u128) -> Result<Self> {
        let mut ledger = Self::new();
        ledger.mint(owner, supply)?;
        Ok(ledger)
    }

    /// Verify `Σ balances == total_supply == minted - burned`.
    ///
    /// # Errors
    /// Returns [`EscrowError::SupplyInvariantViolation`] on any mismatch.
    pub fn verify_supply(&self) -> Result<()> {
        let sum = self
            .balances
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(*b))
            .ok_or_else(|| EscrowError::SupplyInvariantViolation {
                reason: "sum of balances overflows".to_string(),
            })?;
        if sum != self.total_supply {
            return Err(EscrowError::SupplyInvariantViolation {
                reason: format!("sum of balances {sum} != total supply {}", self.total_supply),
            });
        }
        self.supply.verify(self.total_supply)
    }

    /// Access the mint/burn tracker.
    #[must_use]
    pub fn supply(&self) -> &SupplyConservation {
        &self.supply
    }

    /// Number of accounts with a non-zero balance.
    #[must_use]
    pub fn funded_accounts(&self) -> usize {
        self.balances.values().filter(|b| **b > 0).count()
    }

    /// Whether a transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.journal.is_some()
    }

    /// Remember the balance of `account` before its first write in the
    /// open transaction.
    fn touch(&mut self, account: AccountId) {
        if let Some(journal) = self.journal.as_mut() {
            journal
                .balances
                .entry(account)
                .or_insert_with(|| self.balances.get(&account).copied());
        }
    }

    fn debit(&mut self, account: AccountId, amount: u128) -> Result<()> {
        let available = self.balance_of(&account);
        if available < amount {
            return Err(EscrowError::InsufficientBalance {
                account,
                needed: amount,
                available,
            });
        }
        self.touch(account);
        if let Some(balance) = self.balances.get_mut(&account) {
            *balance -= amount;
        }
        Ok(())
    }

    fn credit(&mut self, account: AccountId, amount: u128) {
        self.touch(account);
        // Cannot overflow: every balance is bounded by total_supply.
        *self.balances.entry(account).or_insert(0) += amount;
    }
}

impl TokenLedger for InMemoryLedger {
    fn balance_of(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> u128 {
        self.total_supply
    }

    fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<TransferReceipt> {
        self.debit(from, amount)?;
        self.credit(to, amount);

        let receipt = TransferReceipt {
            id: ReceiptId::new(),
            from,
            to,
            amount,
            issued_at: Utc::now(),
        };
        self.receipts.insert(receipt.id, receipt.clone());
        if let Some(journal) = self.journal.as_mut() {
            journal.receipts.push(receipt.id);
        }
        tracing::debug!(
            receipt = %receipt.id,
            from = %from,
            to = %to,
            amount = %amount,
            "Transfer applied"
        );
        Ok(receipt)
    }

    fn burn(&mut self, from: AccountId, amount: u128) -> Result<()> {
        self.debit(from, amount)?;
        self.total_supply -= amount;
        self.supply.record_burn(amount);
        tracing::debug!(
            from = %from,
            amount = %amount,
            supply = %self.total_supply,
            "Tokens burned"
        );
        Ok(())
    }

    fn mint(&mut self, to: AccountId, amount: u128) -> Result<()> {
        let total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| EscrowError::Overflow(format!("minting {amount} overflows supply")))?;
        self.supply.record_mint(amount)?;
        self.total_supply = total_supply;
        self.credit(to, amount);
        Ok(())
    }

    fn receipt(&self, id: &ReceiptId) -> Option<&TransferReceipt> {
        self.receipts.get(id)
    }

    fn begin(&mut self) {
        if self.journal.is_none() {
            self.journal = Some(Journal {
                balances: HashMap::new(),
                total_supply: self.total_supply,
                supply: self.supply.clone(),
                receipts: Vec::new(),
            });
        }
    }

    fn commit(&mut self) {
        self.journal = None;
    }

    fn rollback(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        for (account, prior) in journal.balances {
            match prior {
                Some(balance) => {
                    self.balances.insert(account, balance);
                }
                None => {
                    self.balances.remove(&account);
                }
            }
        }
        for id in &journal.receipts {
            self.receipts.remove(id);
        }
        self.total_supply = journal.total_supply;
        self.supply = journal.supply;
        tracing::debug!(
            reverted_receipts = journal.receipts.len(),
            "Ledger transaction rolled back"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded(owner: AccountId, amount: u128) -> InMemoryLedger {
        InMemoryLedger::with_genesis(owner, amount).unwrap()
    }

    #[test]
    fn genesis_credits_owner() {
        let owner = AccountId::random();
        let ledger = funded(owner, 1000);
        assert_eq!(ledger.balance_of(&owner), 1000);
        assert_eq!(ledger.total_supply(), 1000);
        ledger.verify_supply().unwrap();
    }

    #[test]
    fn transfer_moves_balance_and_issues_receipt() {
        let (alice, bob) = (AccountId::random(), AccountId::random());
        let mut ledger = funded(alice, 1000);
        let receipt = ledger.transfer(alice, bob, 400).unwrap();
        assert_eq!(ledger.balance_of(&alice), 600);
        assert_eq!(ledger.balance_of(&bob), 400);
        assert_eq!(ledger.total_supply(), 1000);
        assert_eq!(ledger.receipt(&receipt.id), Some(&receipt));
        assert_eq!(receipt.amount, 400);
        ledger.verify_supply().unwrap();
    }

    #[test]
    fn transfer_insufficient_fails_without_change() {
        let (alice, bob) = (AccountId::random(), AccountId::random());
        let mut ledger = funded(alice, 100);
        let err = ledger.transfer(alice, bob, 200).unwrap_err();
        assert!(matches!(
            err,
            EscrowError::InsufficientBalance { needed: 200, available: 100, .. }
        ));
        assert_eq!(ledger.balance_of(&alice), 100);
        assert_eq!(ledger.balance_of(&bob), 0);
    }

    #[test]
    fn burn_reduces_supply() {
        let owner = AccountId::random();
        let mut ledger = funded(owner, 1000);
        ledger.burn(owner, 340).unwrap();
        assert_eq!(ledger.balance_of(&owner), 660);
        assert_eq!(ledger.total_supply(), 660);
        assert_eq!(ledger.supply().total_burned(), 340);
        ledger.verify_supply().unwrap();
    }

    #[test]
    fn burn_more_than_balance_fails() {
        let owner = AccountId::random();
        let mut ledger = funded(owner, 10);
        assert!(ledger.burn(owner, 11).is_err());
        assert_eq!(ledger.total_supply(), 10);
    }

    #[test]
    fn self_transfer_is_neutral() {
        let owner = AccountId::random();
        let mut ledger = funded(owner, 10);
        ledger.transfer(owner, owner, 10).unwrap();
        assert_eq!(ledger.balance_of(&owner), 10);
        ledger.verify_supply().unwrap();
    }

    #[test]
    fn unknown_receipt_is_none() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.receipt(&ReceiptId::new()).is_none());
        assert_eq!(ledger.funded_accounts(), 0);
    }

    #[test]
    fn rollback_restores_balances_supply_and_receipts() {
        let owner = AccountId::random();
        let escrow = AccountId::random();
        let service = AccountId::random();
        let mut ledger = funded(owner, 1000);
        ledger.transfer(owner, escrow, 100).unwrap();
        let before = ledger.clone();

        ledger.begin();
        assert!(ledger.in_transaction());
        let receipt = ledger.transfer(escrow, service, 33).unwrap();
        ledger.burn(escrow, 34).unwrap();
        ledger.mint(owner, 5).unwrap();
        ledger.rollback();

        assert!(!ledger.in_transaction());
        assert_eq!(ledger.balance_of(&escrow), 100);
        assert_eq!(ledger.balance_of(&owner), 900);
        assert_eq!(ledger.total_supply(), before.total_supply());
        assert_eq!(ledger.supply().total_burned(), 0);
        assert!(ledger.receipt(&receipt.id).is_none());
        assert_eq!(ledger.funded_accounts(), before.funded_accounts());
        ledger.verify_supply().unwrap();
    }

    #[test]
    fn rollback_removes_accounts_created_in_transaction() {
        let (owner, fresh) = (AccountId::random(), AccountId::random());
        let mut ledger = funded(owner, 10);
        ledger.begin();
        ledger.transfer(owner, fresh, 4).unwrap();
        ledger.transfer(fresh, owner, 1).unwrap();
        ledger.rollback();
        assert_eq!(ledger.balance_of(&owner), 10);
        assert_eq!(ledger.funded_accounts(), 1);
        ledger.verify_supply().unwrap();
    }

    #[test]
    fn commit_keeps_changes() {
        let (owner, bob) = (AccountId::random(), AccountId::random());
        let mut ledger = funded(owner, 10);
        ledger.begin();
        ledger.begin();
        let receipt = ledger.transfer(owner, bob, 3).unwrap();
        ledger.commit();
        ledger.rollback();
        assert_eq!(ledger.balance_of(&bob), 3);
        assert!(ledger.receipt(&receipt.id).is_some());
    }

    #[test]
    fn mint_overflow_rejected() {
        let owner = AccountId::random();
        let mut ledger = funded(owner, u128::MAX);
        assert!(matches!(ledger.mint(owner, 1), Err(EscrowError::Overflow(_))));
        assert_eq!(ledger.total_supply(), u128::MAX);
    }
}
