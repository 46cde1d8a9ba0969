//! Fee schedule and the three-way split of an escrowed cost.
//!
//! ```text
//! service_amount = cost * service_fee_bps   / 10_000   (floor)
//! validator_pool = cost * validator_fee_bps / 10_000   (floor)
//! burn_amount    = cost - service_amount - validator_pool
//! ```
//!
//! Flooring both fee shares means every rounding remainder lands in
//! `burn_amount`, so the three parts always add up to `cost` exactly.

use serde::{Deserialize, Serialize};

use crate::constants::{BPS_DENOMINATOR, MAX_COST_AMOUNT};
use crate::{EscrowError, Result};

/// Per-service fee schedule in basis points.
///
/// Invariant: `service_fee_bps + validator_fee_bps <= 10_000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub service_fee_bps: u16,
    pub validator_fee_bps: u16,
}

impl FeeSchedule {
    /// Build a schedule, rejecting shares that exceed 100% together.
    ///
    /// # Errors
    /// Returns [`EscrowError::InvalidService`] if either share or their sum
    /// exceeds 10 000 bps.
    pub fn new(service_fee_bps: u16, validator_fee_bps: u16) -> Result<Self> {
        let total = u32::from(service_fee_bps) + u32::from(validator_fee_bps);
        if total > 10_000 {
            return Err(EscrowError::InvalidService {
                reason: format!(
                    "service fee {service_fee_bps} bps + validator fee {validator_fee_bps} bps \
                     exceeds 10000 bps"
                ),
            });
        }
        Ok(Self {
            service_fee_bps,
            validator_fee_bps,
        })
    }

    /// The share left for the burn sink.
    #[must_use]
    pub fn burn_bps(&self) -> u16 {
        10_000 - self.service_fee_bps - self.validator_fee_bps
    }

    /// Split `cost` into service, validator and burn shares.
    ///
    /// # Errors
    /// Returns [`EscrowError::Overflow`] if `cost` exceeds
    /// [`MAX_COST_AMOUNT`].
    pub fn split(&self, cost: u128) -> Result<FeeSplit> {
        if cost > MAX_COST_AMOUNT {
            return Err(EscrowError::Overflow(format!(
                "cost {cost} exceeds the maximum {MAX_COST_AMOUNT}"
            )));
        }
        let service_amount = cost * u128::from(self.service_fee_bps) / BPS_DENOMINATOR;
        let validator_pool = cost * u128::from(self.validator_fee_bps) / BPS_DENOMINATOR;
        Ok(FeeSplit {
            service_amount,
            validator_pool,
            burn_amount: cost - service_amount - validator_pool,
        })
    }
}

/// The result of [`FeeSchedule::split`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub service_amount: u128,
    pub validator_pool: u128,
    pub burn_amount: u128,
}

impl FeeSplit {
    /// Sum of all three shares.
    #[must_use]
    pub fn total(&self) -> u128 {
        self.service_amount + self.validator_pool + self.burn_amount
    }
}
