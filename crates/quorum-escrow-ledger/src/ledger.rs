//! The ledger interface consumed by the escrow protocol.

use chrono::{DateTime, Utc};
use quorum_escrow_types::{AccountId, ReceiptId, Result};

/// Proof that a transfer was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub id: ReceiptId,
    pub from: AccountId,
    pub to: AccountId,
    pub amount: u128,
    pub issued_at: DateTime<Utc>,
}

/// A fungible-token ledger.
///
/// Implementations must apply each call atomically. Several calls can be
/// grouped with [`begin`](Self::begin) and undone together with
/// [`rollback`](Self::rollback), so a settlement that fails halfway leaves
/// no trace.
pub trait TokenLedger {
    /// Balance of `account` in base units (zero if unknown).
    fn balance_of(&self, account: &AccountId) -> u128;

    /// Circulating supply in base units.
    fn total_supply(&self) -> u128;

    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    /// `InsufficientBalance` if `from` holds less than `amount`.
    fn transfer(&mut self, from: AccountId, to: AccountId, amount: u128) -> Result<TransferReceipt>;

    /// Destroy `amount` held by `from`, reducing total supply.
    ///
    /// # Errors
    /// `InsufficientBalance` if `from` holds less than `amount`.
    fn burn(&mut self, from: AccountId, amount: u128) -> Result<()>;

    /// Create `amount` for `to`, increasing total supply. Genesis and
    /// fixtures only; the escrow protocol never mints.
    ///
    /// # Errors
    /// `Overflow` if supply would exceed `u128::MAX`.
    fn mint(&mut self, to: AccountId, amount: u128) -> Result<()>;

    /// Look up a previously issued transfer receipt.
    fn receipt(&self, id: &ReceiptId) -> Option<&TransferReceipt>;

    /// Start journaling mutations. Transactions do not nest: `begin` while
    /// one is open keeps the outer one.
    fn begin(&mut self);

    /// Keep every mutation since `begin` and close the transaction.
    fn commit(&mut self);

    /// Undo every mutation since `begin`, issued receipts included, and
    /// close the transaction. A no-op when none is open.
    fn rollback(&mut self);
}
