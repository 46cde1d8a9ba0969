//! # Process: one escrowed customer/service engagement
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐ deposit  ┌───────────┐ start_termination ┌─────────────┐ quorum ┌────────┐
//!   │ CREATED ├─────────▶│ DEPOSITED ├──────────────────▶│ TERMINATING ├───────▶│ CLOSED │
//!   └─────────┘          └───────────┘                   └─────────────┘        └────────┘
//! ```
//!
//! ## Properties
//!
//! - **Fixed cost**: `cost` never changes after creation
//! - **Append-only log**: `action_log` only grows
//! - **Monotonic**: transitions never go backwards; `settled` is set once
//! - **Sealed when closed**: every write after `Closed` is rejected

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_COST_AMOUNT;
use crate::{EscrowError, ProcessKey, ReceiptId, Result, ServiceId, Tally};

/// The lifecycle state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessState {
    /// Created by the customer, awaiting the exact deposit.
    Created,
    /// Cost escrowed. The service may log actions.
    Deposited,
    /// Termination requested. Validators vote.
    Terminating,
    /// Settled. **Irreversible.**
    Closed,
}

impl ProcessState {
    /// Can a process move from this state to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Deposited)
                | (Self::Deposited, Self::Terminating)
                | (Self::Terminating, Self::Closed)
        )
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Deposited => write!(f, "DEPOSITED"),
            Self::Terminating => write!(f, "TERMINATING"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// A process record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    pub key: ProcessKey,
    /// The service performing the work.
    pub service: ServiceId,
    /// Escrowed cost in base units. Fixed at creation.
    pub cost: u128,
    /// Opaque payload supplied by the customer.
    pub data: String,
    pub state: ProcessState,
    /// Opaque action entries declared by the service, in order.
    pub action_log: Vec<String>,
    /// Validator votes cast while terminating.
    pub tally: Tally,
    /// Set exactly once, together with `Closed`.
    pub settled: bool,
    /// The ledger transfer that funded this process.
    pub deposit_receipt: Option<ReceiptId>,
    pub created_at: DateTime<Utc>,
    pub deposited_at: Option<DateTime<Utc>>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Process {
    /// Build a new process in `Created`.
    ///
    /// # Errors
    /// Returns [`EscrowError::InvalidProcess`] if `cost` is zero or above
    /// [`MAX_COST_AMOUNT`].
    pub fn new(
        key: ProcessKey,
        service: ServiceId,
        cost: u128,
        data: impl Into<String>,
    ) -> Result<Self> {
        if cost == 0 {
            return Err(EscrowError::InvalidProcess {
                reason: "cost must be positive".to_string(),
            });
        }
        if cost > MAX_COST_AMOUNT {
            return Err(EscrowError::InvalidProcess {
                reason: format!("cost {cost} exceeds the maximum {MAX_COST_AMOUNT}"),
            });
        }
        Ok(Self {
            key,
            service,
            cost,
            data: data.into(),
            state: ProcessState::Created,
            action_log: Vec::new(),
            tally: Tally::new(),
            settled: false,
            deposit_receipt: None,
            created_at: Utc::now(),
            deposited_at: None,
            settled_at: None,
        })
    }

    /// Fail with [`EscrowError::InvalidState`] unless the state is one of `allowed`.
    pub fn require_state(&self, operation: &'static str, allowed: &[ProcessState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(EscrowError::InvalidState {
                key: self.key,
                operation,
                state: self.state,
            })
        }
    }

    /// `Created → Deposited`, only for an exact-amount deposit.
    ///
    /// # Errors
    /// - `InvalidState` unless `Created`
    /// - `DepositMismatch` if `amount != cost`; the process stays `Created`
    pub fn mark_deposited(&mut self, amount: u128, receipt: Option<ReceiptId>) -> Result<()> {
        self.require_state("deposit into", &[ProcessState::Created])?;
        if amount != self.cost {
            return Err(EscrowError::DepositMismatch {
                expected: self.cost,
                received: amount,
            });
        }
        self.state = ProcessState::Deposited;
        self.deposit_receipt = receipt;
        self.deposited_at = Some(Utc::now());
        Ok(())
    }

    /// Append an opaque action entry. Allowed while `Deposited` or `Terminating`.
    pub fn append_action(&mut self, data: impl Into<String>) -> Result<()> {
        self.require_state(
            "declare an action on",
            &[ProcessState::Deposited, ProcessState::Terminating],
        )?;
        self.action_log.push(data.into());
        Ok(())
    }

    /// `Deposited → Terminating`.
    pub fn start_termination(&mut self) -> Result<()> {
        self.require_state("start termination of", &[ProcessState::Deposited])?;
        self.state = ProcessState::Terminating;
        Ok(())
    }

    /// `Terminating → Closed` with `settled = true`.
    ///
    /// # Errors
    /// - `AlreadySettled` if the flag is already set
    /// - `InvalidState` unless `Terminating`
    pub fn mark_settled(&mut self) -> Result<()> {
        if self.settled {
            return Err(EscrowError::AlreadySettled(self.key));
        }
        self.require_state("settle", &[ProcessState::Terminating])?;
        self.state = ProcessState::Closed;
        self.settled = true;
        self.settled_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccountId, ProductId};

    fn make_process(cost: u128) -> Process {
        Process::new(
            ProcessKey::new(AccountId::random(), ProductId::random()),
            AccountId::random(),
            cost,
            r#"{"a": 1, "b": 2, "c": 3}"#,
        )
        .unwrap()
    }

    #[test]
    fn state_transitions_valid() {
        assert!(ProcessState::Created.can_transition_to(ProcessState::Deposited));
        assert!(ProcessState::Deposited.can_transition_to(ProcessState::Terminating));
        assert!(ProcessState::Terminating.can_transition_to(ProcessState::Closed));
    }

    #[test]
    fn state_transitions_invalid() {
        assert!(!ProcessState::Created.can_transition_to(ProcessState::Terminating));
        assert!(!ProcessState::Deposited.can_transition_to(ProcessState::Created));
        assert!(!ProcessState::Closed.can_transition_to(ProcessState::Created));
        assert!(!ProcessState::Closed.can_transition_to(ProcessState::Terminating));
    }

    #[test]
    fn zero_cost_rejected() {
        let err = Process::new(
            ProcessKey::new(AccountId::random(), ProductId::random()),
            AccountId::random(),
            0,
            "",
        )
        .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidProcess { .. }));
    }

    #[test]
    fn exact_deposit_advances() {
        let mut p = make_process(100);
        p.mark_deposited(100, None).unwrap();
        assert_eq!(p.state, ProcessState::Deposited);
        assert!(p.deposited_at.is_some());
    }

    #[test]
    fn under_and_over_payment_rejected() {
        let mut p = make_process(100);
        for amount in [99, 101] {
            let err = p.mark_deposited(amount, None).unwrap_err();
            assert!(matches!(err, EscrowError::DepositMismatch { expected: 100, .. }));
            assert_eq!(p.state, ProcessState::Created);
        }
    }

    #[test]
    fn actions_require_deposit() {
        let mut p = make_process(100);
        assert!(p.append_action("too early").is_err());
        p.mark_deposited(100, None).unwrap();
        p.append_action("First order data").unwrap();
        p.start_termination().unwrap();
        p.append_action("Second order data").unwrap();
        assert_eq!(p.action_log, vec!["First order data", "Second order data"]);
    }

    #[test]
    fn settle_once_then_sealed() {
        let mut p = make_process(100);
        p.mark_deposited(100, None).unwrap();
        p.start_termination().unwrap();
        p.mark_settled().unwrap();
        assert_eq!(p.state, ProcessState::Closed);
        assert!(p.settled);

        let err = p.mark_settled().unwrap_err();
        assert!(matches!(err, EscrowError::AlreadySettled(_)));
        assert!(p.append_action("late").is_err());
        assert!(p.start_termination().is_err());
    }

    #[test]
    fn settle_requires_terminating() {
        let mut p = make_process(100);
        p.mark_deposited(100, None).unwrap();
        let err = p.mark_settled().unwrap_err();
        assert!(matches!(err, EscrowError::InvalidState { state: ProcessState::Deposited, .. }));
    }

    #[test]
    fn serde_roundtrip() {
        let p = make_process(42);
        let json = serde_json::to_string(&p).unwrap();
        let back: Process = serde_json::from_str(&json).unwrap();
        assert_eq!(back.key, p.key);
        assert_eq!(back.cost, 42);
        assert_eq!(back.state, ProcessState::Created);
    }
}
