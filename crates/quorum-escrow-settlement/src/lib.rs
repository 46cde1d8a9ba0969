//! # quorum-escrow-settlement
//!
//! **Settlement**: distributes a terminating process's escrowed cost once
//! its validator quorum is reached.
//!
//! ## Architecture
//!
//! The engine receives a process whose approvals reached the threshold and:
//! 1. Checks idempotency (no double-settlement)
//! 2. Closes the process (`Terminating → Closed`, `settled = true`)
//! 3. Splits the cost into service fee, validator pool and burn share
//! 4. Lets the [`RewardPolicy`] divide the pool among approvers
//! 5. Pays the service and validators from escrow, burns the rest
//! 6. Checks `service + validators + burn == cost`
//!
//! State is advanced before any ledger call. The engine relies on its
//! caller to run it inside a ledger transaction (`TokenLedger::begin`) so a
//! failing ledger call rolls everything back.

pub mod engine;
pub mod idempotency;
pub mod reward;

pub use engine::SettlementEngine;
pub use idempotency::IdempotencyGuard;
pub use reward::{EqualSplit, RewardContext, RewardPolicy, StakeWeighted, policy_for};
