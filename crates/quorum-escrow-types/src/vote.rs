//! Validator votes on a terminating process.
//!
//! A validator's vote moves from unset to a terminal choice exactly once;
//! it is never reset. The tally keeps votes in cast order because reward
//! policies pay approvers by vote order.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, EscrowError, ProcessKey, Result};

/// A validator's terminal choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteChoice {
    Approve,
    Reject,
}

impl VoteChoice {
    #[must_use]
    pub fn from_approve(approve: bool) -> Self {
        if approve { Self::Approve } else { Self::Reject }
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => write!(f, "APPROVE"),
            Self::Reject => write!(f, "REJECT"),
        }
    }
}

/// One cast vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub validator: AccountId,
    pub choice: VoteChoice,
    pub cast_at: DateTime<Utc>,
}

/// Ordered votes on one process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    votes: Vec<VoteRecord>,
}

impl Tally {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a vote and return the approval count after it.
    ///
    /// # Errors
    /// Returns [`EscrowError::DuplicateVote`] if `validator` already voted;
    /// the tally is left unchanged.
    pub fn cast(
        &mut self,
        key: ProcessKey,
        validator: AccountId,
        choice: VoteChoice,
    ) -> Result<usize> {
        if self.has_voted(&validator) {
            return Err(EscrowError::DuplicateVote { key, validator });
        }
        self.votes.push(VoteRecord {
            validator,
            choice,
            cast_at: Utc::now(),
        });
        Ok(self.approvals())
    }

    /// The validator's choice, or `None` while unset.
    #[must_use]
    pub fn choice_of(&self, validator: &AccountId) -> Option<VoteChoice> {
        self.votes
            .iter()
            .find(|v| v.validator == *validator)
            .map(|v| v.choice)
    }

    #[must_use]
    pub fn has_voted(&self, validator: &AccountId) -> bool {
        self.choice_of(validator).is_some()
    }

    #[must_use]
    pub fn approvals(&self) -> usize {
        self.count(VoteChoice::Approve)
    }

    #[must_use]
    pub fn rejections(&self) -> usize {
        self.count(VoteChoice::Reject)
    }

    /// Approving validators in the order they voted.
    #[must_use]
    pub fn approvers_in_order(&self) -> Vec<AccountId> {
        self.votes
            .iter()
            .filter(|v| v.choice == VoteChoice::Approve)
            .map(|v| v.validator)
            .collect()
    }

    /// All votes in cast order.
    #[must_use]
    pub fn votes(&self) -> &[VoteRecord] {
        &self.votes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.votes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    fn count(&self, choice: VoteChoice) -> usize {
        self.votes.iter().filter(|v| v.choice == choice).count()
    }
}
