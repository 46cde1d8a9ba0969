//! Settlement record: the audit trail of one closed process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, EscrowError, ProcessKey, Result, ServiceId};

/// What a settlement paid out and burned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub key: ProcessKey,
    pub service: ServiceId,
    /// The escrowed cost this settlement distributed.
    pub cost: u128,
    pub service_amount: u128,
    /// The validator pool before the reward policy ran.
    pub validator_pool: u128,
    /// Per-validator rewards, in vote order.
    pub validator_payouts: Vec<(AccountId, u128)>,
    /// Burn share plus any part of the pool the policy left unpaid.
    pub burn_amount: u128,
    /// Name of the reward policy that split the pool.
    pub reward_policy: String,
    pub settled_at: DateTime<Utc>,
}

impl Settlement {
    /// Sum paid to validators.
    #[must_use]
    pub fn validator_total(&self) -> u128 {
        self.validator_payouts.iter().map(|(_, amount)| amount).sum()
    }

    /// Check `service + validators + burn == cost` exactly.
    ///
    /// # Errors
    /// Returns [`EscrowError::ConservationViolation`] otherwise.
    pub fn verify_conservation(&self) -> Result<()> {
        let distributed = self
            .service_amount
            .checked_add(self.validator_total())
            .and_then(|s| s.checked_add(self.burn_amount));
        if distributed != Some(self.cost) {
            return Err(EscrowError::ConservationViolation {
                reason: format!(
                    "{}: service {} + validators {} + burn {} != cost {}",
                    self.key,
                    self.service_amount,
                    self.validator_total(),
                    self.burn_amount,
                    self.cost
                ),
            });
        }
        Ok(())
    }
}
