//! Validator quorum on terminating processes.
//!
//! Votes live in the process's [`Tally`](quorum_escrow_types::Tally); this
//! module holds the rules for casting one and for deciding when the
//! approvals reach the service's threshold.

use quorum_escrow_types::{
    AccountId, EscrowError, Process, ProcessState, Result, Service, VoteChoice,
};

/// Result of a recorded vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumOutcome {
    /// Below threshold, or a rejection.
    Pending { approvals: usize, threshold: usize },
    /// This approval brought the count to the threshold. Settle now.
    Reached,
}

/// Stateless vote rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationQuorum;

impl ValidationQuorum {
    /// Record `validator`'s vote on `process`.
    ///
    /// The threshold is reached at most once per process: the reaching
    /// approval closes the process, and every later vote fails the state
    /// check.
    ///
    /// # Errors
    /// - `InvalidState` unless the process is `Terminating` (includes votes
    ///   arriving after settlement)
    /// - `Unauthorized` unless `validator` sits on the service's committee
    /// - `DuplicateVote` if `validator` already voted on this process
    pub fn cast_vote(
        process: &mut Process,
        service: &Service,
        validator: AccountId,
        choice: VoteChoice,
    ) -> Result<QuorumOutcome> {
        process.require_state("vote on", &[ProcessState::Terminating])?;
        if !service.is_validator(&validator) {
            return Err(EscrowError::Unauthorized {
                caller: validator,
                action: "vote on this process",
            });
        }
        let approvals = process.tally.cast(process.key, validator, choice)?;

        tracing::debug!(
            process = %process.key,
            validator = %validator,
            %choice,
            approvals,
            threshold = service.quorum_threshold,
            "Vote recorded"
        );

        if choice == VoteChoice::Approve && approvals == service.quorum_threshold {
            Ok(QuorumOutcome::Reached)
        } else {
            Ok(QuorumOutcome::Pending {
                approvals,
                threshold: service.quorum_threshold,
            })
        }
    }
}
