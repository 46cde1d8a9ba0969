//! Supply conservation invariant checker.
//!
//! Mathematical invariant enforced after every ledger mutation:
//! ```text
//! Σ(balances) == total_supply == Σ(minted) - Σ(burned)
//! ```
//!
//! Transfers only move value between accounts; settlement burns are the
//! only way supply goes down. If this invariant breaks, something has gone
//! catastrophically wrong.

use quorum_escrow_types::{EscrowError, Result};

/// Tracks cumulative minting and burning and validates supply against them.
#[derive(Debug, Clone, Default)]
pub struct SupplyConservation {
    /// Total minted since genesis.
    minted: u128,
    /// Total burned since genesis.
    burned: u128,
}

impl SupplyConservation {
    /// Create a new supply conservation tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mint.
    ///
    /// # Errors
    /// Returns [`EscrowError::Overflow`] if cumulative minting overflows.
    pub fn record_mint(&mut self, amount: u128) -> Result<()> {
        self.minted = self
            .minted
            .checked_add(amount)
            .ok_or_else(|| EscrowError::Overflow(format!("minting {amount} overflows supply")))?;
        Ok(())
    }

    /// Record a burn.
    pub fn record_burn(&mut self, amount: u128) {
        self.burned += amount;
    }

    /// Expected circulating supply: minted - burned.
    #[must_use]
    pub fn expected_supply(&self) -> u128 {
        self.minted - self.burned
    }

    /// Verify that the actual supply matches minted - burned.
    ///
    /// # Errors
    /// Returns [`EscrowError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, actual_supply: u128) -> Result<()> {
        let expected = self.expected_supply();
        if actual_supply != expected {
            return Err(EscrowError::SupplyInvariantViolation {
                reason: format!(
                    "actual supply {actual_supply} != expected {expected} \
                     (minted={}, burned={})",
                    self.minted, self.burned
                ),
            });
        }
        Ok(())
    }

    /// Total minted since genesis.
    #[must_use]
    pub fn total_minted(&self) -> u128 {
        self.minted
    }

    /// Total burned since genesis.
    #[must_use]
    pub fn total_burned(&self) -> u128 {
        self.burned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_supply_is_zero() {
        let sc = SupplyConservation::new();
        assert_eq!(sc.expected_supply(), 0);
        assert!(sc.verify(0).is_ok());
    }

    #[test]
    fn mints_increase_expected() {
        let mut sc = SupplyConservation::new();
        sc.record_mint(1000).unwrap();
        sc.record_mint(500).unwrap();
        assert_eq!(sc.expected_supply(), 1500);
    }

    #[test]
    fn burns_decrease_expected() {
        let mut sc = SupplyConservation::new();
        sc.record_mint(1000).unwrap();
        sc.record_burn(340);
        assert_eq!(sc.expected_supply(), 660);
        assert_eq!(sc.total_burned(), 340);
        assert!(sc.verify(660).is_ok());
    }

    #[test]
    fn verify_fails_when_imbalanced() {
        let mut sc = SupplyConservation::new();
        sc.record_mint(10).unwrap();
        let err = sc.verify(11).unwrap_err();
        assert!(matches!(err, EscrowError::SupplyInvariantViolation { .. }));
    }

    #[test]
    fn mint_overflow_rejected() {
        let mut sc = SupplyConservation::new();
        sc.record_mint(u128::MAX).unwrap();
        assert!(matches!(sc.record_mint(1), Err(EscrowError::Overflow(_))));
        assert_eq!(sc.total_minted(), u128::MAX);
    }
}
