//! Settlement execution.
//!
//! When a terminating process reaches its approval quorum:
//! 1. Check idempotency (no double-settlement)
//! 2. Close the process (`Terminating → Closed`, `settled = true`)
//! 3. Split the cost: service fee, validator pool, burn share
//! 4. Divide the pool with the reward policy; unpaid pool is burned
//! 5. Transfer escrow → service, escrow → each rewarded validator
//! 6. Burn the remainder from escrow
//! 7. Verify conservation and return the [`Settlement`] record

use chrono::Utc;
use quorum_escrow_ledger::TokenLedger;
use quorum_escrow_types::{AccountId, EscrowError, Process, Result, Service, Settlement};

use crate::idempotency::IdempotencyGuard;
use crate::reward::{RewardContext, RewardPolicy};

/// Executes settlements out of the escrow account.
///
/// Process state is advanced before any ledger call, so a re-entered
/// settlement observes `Closed` and is rejected. When `settle` fails the
/// engine's own state is unchanged; the process and any ledger calls
/// already made are the caller's to undo (a ledger transaction plus a
/// snapshot of the process).
#[derive(Debug, Clone)]
pub struct SettlementEngine {
    /// Ledger account holding escrowed deposits.
    escrow: AccountId,
    /// Second exactly-once barrier behind the process state.
    idempotency: IdempotencyGuard,
    /// Settlements executed by this engine.
    settled_count: u64,
    /// Total burned by settlements.
    total_burned: u128,
}

impl SettlementEngine {
    /// Create an engine paying out of `escrow`.
    #[must_use]
    pub fn new(escrow: AccountId, idempotency_cache_size: usize) -> Self {
        Self {
            escrow,
            idempotency: IdempotencyGuard::new(idempotency_cache_size),
            settled_count: 0,
            total_burned: 0,
        }
    }

    /// Settle `process` exactly once.
    ///
    /// # Errors
    /// - `AlreadySettled` if the process was settled before
    /// - `InvalidState` unless the process is `Terminating`
    /// - `InsufficientBalance` if escrow cannot cover the payouts
    /// - `ConservationViolation` if the reward policy overpays or pays a
    ///   non-approver
    pub fn settle<L: TokenLedger>(
        &mut self,
        ledger: &mut L,
        policy: &dyn RewardPolicy,
        process: &mut Process,
        service: &Service,
    ) -> Result<Settlement> {
        // Effects first.
        self.idempotency.mark_settled(process.key)?;
        let settlement = match Self::execute(self.escrow, ledger, policy, process, service) {
            Ok(settlement) => settlement,
            Err(e) => {
                self.idempotency.forget(&process.key);
                return Err(e);
            }
        };

        self.settled_count += 1;
        self.total_burned += settlement.burn_amount;

        tracing::info!(
            process = %process.key,
            service = %service.id,
            cost = %process.cost,
            service_amount = %settlement.service_amount,
            validators_paid = settlement.validator_payouts.len(),
            validator_total = %settlement.validator_total(),
            burned = %settlement.burn_amount,
            policy = policy.name(),
            "Process settled"
        );

        Ok(settlement)
    }

    fn execute<L: TokenLedger>(
        escrow: AccountId,
        ledger: &mut L,
        policy: &dyn RewardPolicy,
        process: &mut Process,
        service: &Service,
    ) -> Result<Settlement> {
        process.mark_settled()?;

        let split = service.fees.split(process.cost)?;
        let approvers = process.tally.approvers_in_order();
        let stakes: Vec<(AccountId, u128)> = service
            .validators
            .iter()
            .map(|v| (*v, ledger.balance_of(v)))
            .collect();
        let ctx = RewardContext {
            pool: split.validator_pool,
            quorum_threshold: service.quorum_threshold,
            approvers: &approvers,
            stakes: &stakes,
        };
        let validator_payouts: Vec<(AccountId, u128)> = policy
            .distribute(&ctx)
            .into_iter()
            .filter(|(_, amount)| *amount > 0)
            .collect();

        let paid = validator_payouts
            .iter()
            .try_fold(0u128, |acc, (_, amount)| acc.checked_add(*amount))
            .filter(|paid| *paid <= split.validator_pool)
            .ok_or_else(|| EscrowError::ConservationViolation {
                reason: format!(
                    "policy {} pays more than the validator pool {}",
                    policy.name(),
                    split.validator_pool
                ),
            })?;
        if let Some((stranger, _)) = validator_payouts
            .iter()
            .find(|(v, _)| !ctx.payees().contains(v))
        {
            return Err(EscrowError::ConservationViolation {
                reason: format!("policy {} pays non-approver {stranger}", policy.name()),
            });
        }
        let burn_amount = split.burn_amount + (split.validator_pool - paid);

        // Interactions.
        if split.service_amount > 0 {
            ledger.transfer(escrow, service.id, split.service_amount)?;
        }
        for (validator, amount) in &validator_payouts {
            ledger.transfer(escrow, *validator, *amount)?;
        }
        if burn_amount > 0 {
            ledger.burn(escrow, burn_amount)?;
        }

        let settlement = Settlement {
            key: process.key,
            service: service.id,
            cost: process.cost,
            service_amount: split.service_amount,
            validator_pool: split.validator_pool,
            validator_payouts,
            burn_amount,
            reward_policy: policy.name().to_string(),
            settled_at: process.settled_at.unwrap_or_else(Utc::now),
        };
        settlement.verify_conservation()?;
        Ok(settlement)
    }

    /// The escrow account this engine pays from.
    #[must_use]
    pub fn escrow(&self) -> AccountId {
        self.escrow
    }

    /// Access the idempotency guard.
    #[must_use]
    pub fn idempotency(&self) -> &IdempotencyGuard {
        &self.idempotency
    }

    /// Number of settlements executed.
    #[must_use]
    pub fn settled_count(&self) -> u64 {
        self.settled_count
    }

    /// Total burned across all settlements.
    #[must_use]
    pub fn total_burned(&self) -> u128 {
        self.total_burned
    }
}
