//! Exactly-once barrier for settlements.
//!
//! The process state machine already refuses to settle a `Closed` process.
//! This guard is a second, independent record of settled `ProcessKey`s
//! held by the engine, so a bug in one layer cannot pay out twice.
//!
//! Memory is bounded: once `capacity` keys are held, the oldest one is
//! forgotten. Forgotten keys are still protected by the process state.

use std::collections::{HashSet, VecDeque};

use quorum_escrow_types::{EscrowError, ProcessKey, Result};

#[derive(Debug, Clone)]
pub struct IdempotencyGuard {
    settled: HashSet<ProcessKey>,
    /// Settlement order, oldest first.
    order: VecDeque<ProcessKey>,
    capacity: usize,
}

impl IdempotencyGuard {
    /// A guard remembering up to `capacity` settled processes (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            settled: HashSet::with_capacity(capacity.min(1024)),
            order: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Record `key` as settled.
    ///
    /// # Errors
    /// [`EscrowError::AlreadySettled`] if `key` is already recorded.
    pub fn mark_settled(&mut self, key: ProcessKey) -> Result<()> {
        if !self.settled.insert(key) {
            return Err(EscrowError::AlreadySettled(key));
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.settled.remove(&evicted);
                tracing::trace!(process = %evicted, "Idempotency entry evicted");
            }
        }
        Ok(())
    }

    /// Drop `key` again, for a settlement that failed after being marked.
    /// A key evicted by that mark stays forgotten.
    pub fn forget(&mut self, key: &ProcessKey) {
        if self.settled.remove(key) {
            self.order.retain(|k| k != key);
        }
    }

    #[must_use]
    pub fn is_settled(&self, key: &ProcessKey) -> bool {
        self.settled.contains(key)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.settled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settled.is_empty()
    }
}
