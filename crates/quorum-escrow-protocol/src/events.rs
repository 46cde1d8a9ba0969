//! Append-only event log.

use chrono::Utc;
use quorum_escrow_types::{EventRecord, ProtocolEvent};

/// Sequenced record of every committed state change.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return its sequence number (starting at 1).
    pub fn append(&mut self, event: ProtocolEvent) -> u64 {
        let seq = self.last_seq() + 1;
        tracing::trace!(seq, event = event.name(), "Event recorded");
        self.records.push(EventRecord {
            seq,
            event,
            recorded_at: Utc::now(),
        });
        seq
    }

    /// Events with a sequence number greater than `seq`.
    #[must_use]
    pub fn since(&self, seq: u64) -> &[EventRecord] {
        // Sequence n lives at index n - 1.
        let start = usize::try_from(seq)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    /// Sequence number of the newest event, or 0 when empty.
    #[must_use]
    pub fn last_seq(&self) -> u64 {
        self.records.last().map_or(0, |r| r.seq)
    }

    /// Drop events appended after the log held `len` records.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }

    #[must_use]
    pub fn all(&self) -> &[EventRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use quorum_escrow_types::{AccountId, ProcessKey, ProductId};

    use super::*;

    fn created() -> ProtocolEvent {
        ProtocolEvent::ProcessCreated {
            key: ProcessKey::new(AccountId::random(), ProductId::random()),
            service: AccountId::random(),
            cost: 1,
        }
    }

    #[test]
    fn sequences_start_at_one() {
        let mut log = EventLog::new();
        assert_eq!(log.last_seq(), 0);
        assert_eq!(log.append(created()), 1);
        assert_eq!(log.append(created()), 2);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn truncate_resumes_sequence() {
        let mut log = EventLog::new();
        log.append(created());
        log.append(created());
        log.truncate(1);
        assert_eq!(log.last_seq(), 1);
        assert_eq!(log.append(created()), 2);
    }

    #[test]
    fn since_returns_newer_events() {
        let mut log = EventLog::new();
        for _ in 0..3 {
            log.append(created());
        }
        assert_eq!(log.since(0).len(), 3);
        assert_eq!(log.since(1)[0].seq, 2);
        assert!(log.since(3).is_empty());
        assert!(log.since(99).is_empty());
    }
}
