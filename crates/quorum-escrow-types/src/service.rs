//! Service registration record.
//!
//! A service is registered once with its validator committee, fee schedule
//! and quorum threshold. The record is immutable after registration.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_VALIDATORS_PER_SERVICE;
use crate::{AccountId, EscrowError, FeeSchedule, Result, ServiceId};

/// A registered service and its settlement parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// The service identity; also the account that receives the service fee.
    pub id: ServiceId,
    /// Validator committee in registration order. Non-empty, no duplicates.
    pub validators: Vec<AccountId>,
    /// Service / validator fee shares.
    pub fees: FeeSchedule,
    /// Approvals needed to settle. `1 <= quorum_threshold <= validators.len()`.
    pub quorum_threshold: usize,
    /// When the service was registered.
    pub registered_at: DateTime<Utc>,
}

impl Service {
    /// Validate registration parameters and build the record.
    ///
    /// # Errors
    /// Returns [`EscrowError::InvalidService`] if the validator set is empty,
    /// too large or contains duplicates, if the threshold is outside
    /// `[1, validators.len()]`, or if the fee shares exceed 100%.
    pub fn new(
        id: ServiceId,
        validators: Vec<AccountId>,
        service_fee_bps: u16,
        validator_fee_bps: u16,
        quorum_threshold: usize,
    ) -> Result<Self> {
        if validators.is_empty() {
            return Err(EscrowError::InvalidService {
                reason: "validator set is empty".to_string(),
            });
        }
        if validators.len() > MAX_VALIDATORS_PER_SERVICE {
            return Err(EscrowError::InvalidService {
                reason: format!(
                    "{} validators exceeds the limit of {MAX_VALIDATORS_PER_SERVICE}",
                    validators.len()
                ),
            });
        }
        let mut seen = HashSet::with_capacity(validators.len());
        if let Some(dup) = validators.iter().find(|v| !seen.insert(**v)) {
            return Err(EscrowError::InvalidService {
                reason: format!("validator {dup} listed more than once"),
            });
        }
        if quorum_threshold == 0 || quorum_threshold > validators.len() {
            return Err(EscrowError::InvalidService {
                reason: format!(
                    "quorum threshold {quorum_threshold} outside [1, {}]",
                    validators.len()
                ),
            });
        }
        let fees = FeeSchedule::new(service_fee_bps, validator_fee_bps)?;

        Ok(Self {
            id,
            validators,
            fees,
            quorum_threshold,
            registered_at: Utc::now(),
        })
    }

    /// Whether `account` sits on this service's validator committee.
    #[must_use]
    pub fn is_validator(&self, account: &AccountId) -> bool {
        self.validators.contains(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validators(n: usize) -> Vec<AccountId> {
        (0..n)
            .map(|i| AccountId::from_label(&format!("validator-{i}")))
            .collect()
    }

    #[test]
    fn valid_service() {
        let svc = Service::new(AccountId::from_label("svc"), validators(3), 3300, 3300, 2).unwrap();
        assert_eq!(svc.validators.len(), 3);
        assert_eq!(svc.fees.burn_bps(), 3400);
        assert!(svc.is_validator(&AccountId::from_label("validator-1")));
        assert!(!svc.is_validator(&AccountId::from_label("svc")));
    }

    #[test]
    fn empty_validators_rejected() {
        let err = Service::new(AccountId::random(), vec![], 0, 0, 1).unwrap_err();
        assert!(matches!(err, EscrowError::InvalidService { .. }));
    }

    #[test]
    fn duplicate_validators_rejected() {
        let v = AccountId::random();
        let err = Service::new(AccountId::random(), vec![v, AccountId::random(), v], 0, 0, 1)
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn threshold_bounds() {
        assert!(Service::new(AccountId::random(), validators(3), 0, 0, 0).is_err());
        assert!(Service::new(AccountId::random(), validators(3), 0, 0, 4).is_err());
        assert!(Service::new(AccountId::random(), validators(3), 0, 0, 1).is_ok());
        assert!(Service::new(AccountId::random(), validators(3), 0, 0, 3).is_ok());
    }

    #[test]
    fn fees_over_100_percent_rejected() {
        let err = Service::new(AccountId::random(), validators(1), 5000, 5001, 1).unwrap_err();
        assert!(matches!(err, EscrowError::InvalidService { .. }));
    }

    #[test]
    fn oversized_committee_rejected() {
        let err = Service::new(
            AccountId::random(),
            validators(MAX_VALIDATORS_PER_SERVICE + 1),
            0,
            0,
            1,
        )
        .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidService { .. }));
    }
}
