//! Validator-side watcher.
//!
//! A validator polls the event log, picks up every `TerminationStarted`
//! it has not seen, and votes on the processes whose service lists it as a
//! validator. The verdict itself (did the service deliver?) is supplied by
//! the caller.

use quorum_escrow_ledger::TokenLedger;
use quorum_escrow_types::{AccountId, EscrowError, Process, ProcessKey, ProtocolEvent};

use crate::protocol::{EscrowProtocol, VoteOutcome};

/// What the agent did for one termination.
#[derive(Debug)]
pub enum AgentAction {
    Voted { key: ProcessKey, approve: bool, outcome: VoteOutcome },
    /// The agent is not on the service's committee.
    NotPermitted { key: ProcessKey },
    /// The protocol rejected the vote (e.g. the process already settled).
    Failed { key: ProcessKey, error: EscrowError },
}

/// Polls for terminations and votes as `account`.
#[derive(Debug, Clone)]
pub struct ValidatorAgent {
    account: AccountId,
    last_seq: u64,
}

impl ValidatorAgent {
    #[must_use]
    pub fn new(account: AccountId) -> Self {
        Self { account, last_seq: 0 }
    }

    #[must_use]
    pub fn account(&self) -> AccountId {
        self.account
    }

    /// Last event sequence this agent has processed.
    #[must_use]
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Handle every termination recorded since the last poll.
    ///
    /// `verdict` returns `true` to approve the process, `false` to reject.
    pub fn poll<L, F>(
        &mut self,
        protocol: &mut EscrowProtocol<L>,
        mut verdict: F,
    ) -> Vec<AgentAction>
    where
        L: TokenLedger,
        F: FnMut(&Process) -> bool,
    {
        let pending: Vec<(ProcessKey, bool)> = protocol
            .events_since(self.last_seq)
            .iter()
            .filter_map(|record| match &record.event {
                ProtocolEvent::TerminationStarted { key, service, .. } => {
                    let permitted = protocol
                        .service(service)
                        .is_some_and(|s| s.is_validator(&self.account));
                    Some((*key, permitted))
                }
                _ => None,
            })
            .collect();
        self.last_seq = protocol.events().last_seq();

        let mut actions = Vec::with_capacity(pending.len());
        for (key, permitted) in pending {
            if !permitted {
                tracing::info!(
                    validator = %self.account,
                    process = %key,
                    "Not a validator for this process, skipping"
                );
                actions.push(AgentAction::NotPermitted { key });
                continue;
            }
            let Some(process) = protocol.process(&key) else {
                actions.push(AgentAction::Failed {
                    key,
                    error: EscrowError::ProcessNotFound(key),
                });
                continue;
            };
            let approve = verdict(process);
            match protocol.vote(self.account, key, approve) {
                Ok(outcome) => {
                    tracing::info!(
                        validator = %self.account,
                        process = %key,
                        approve,
                        "Vote submitted"
                    );
                    actions.push(AgentAction::Voted { key, approve, outcome });
                }
                Err(error) => actions.push(AgentAction::Failed { key, error }),
            }
        }
        actions
    }
}
