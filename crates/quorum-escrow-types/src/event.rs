//! Protocol events for the audit trail and for validator watchers.
//!
//! Every committed state change appends one [`EventRecord`]. Sequence
//! numbers start at 1 and increase by one, so a watcher can resume from the
//! last sequence it has seen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, ProcessKey, ReceiptId, ServiceId, VoteChoice};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    ServiceAdded {
        service: ServiceId,
        validators: Vec<AccountId>,
        quorum_threshold: usize,
    },
    ProcessCreated {
        key: ProcessKey,
        service: ServiceId,
        cost: u128,
    },
    DepositRecorded {
        key: ProcessKey,
        amount: u128,
        receipt: Option<ReceiptId>,
    },
    ActionDeclared {
        key: ProcessKey,
        index: usize,
    },
    /// Validators watch for this to start voting.
    TerminationStarted {
        key: ProcessKey,
        service: ServiceId,
        initiator: AccountId,
    },
    VoteCast {
        key: ProcessKey,
        validator: AccountId,
        choice: VoteChoice,
    },
    Settled {
        key: ProcessKey,
        service_amount: u128,
        validator_total: u128,
        burn_amount: u128,
    },
}

impl ProtocolEvent {
    /// Stable upper-case name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ServiceAdded { .. } => "SERVICE_ADDED",
            Self::ProcessCreated { .. } => "PROCESS_CREATED",
            Self::DepositRecorded { .. } => "DEPOSIT_RECORDED",
            Self::ActionDeclared { .. } => "ACTION_DECLARED",
            Self::TerminationStarted { .. } => "TERMINATION_STARTED",
            Self::VoteCast { .. } => "VOTE_CAST",
            Self::Settled { .. } => "SETTLED",
        }
    }

    /// The process this event concerns, if any.
    #[must_use]
    pub fn process(&self) -> Option<ProcessKey> {
        match self {
            Self::ServiceAdded { .. } => None,
            Self::ProcessCreated { key, .. }
            | Self::DepositRecorded { key, .. }
            | Self::ActionDeclared { key, .. }
            | Self::TerminationStarted { key, .. }
            | Self::VoteCast { key, .. }
            | Self::Settled { key, .. } => Some(*key),
        }
    }
}

/// A sequenced event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub event: ProtocolEvent,
    pub recorded_at: DateTime<Utc>,
}
