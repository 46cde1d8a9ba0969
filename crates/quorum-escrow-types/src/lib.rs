//! # quorum-escrow-types
//!
//! Shared types, errors, and configuration for the **quorum escrow** protocol.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`ServiceId`], [`ProductId`], [`ProcessKey`], [`ReceiptId`]
//! - **Amounts**: `u128` base units and their [`rust_decimal::Decimal`] token view ([`amount`])
//! - **Service model**: [`Service`], [`FeeSchedule`], [`FeeSplit`]
//! - **Process model**: [`Process`], [`ProcessState`]
//! - **Vote model**: [`Tally`], [`VoteChoice`], [`VoteRecord`]
//! - **Settlement record**: [`Settlement`]
//! - **Events**: [`ProtocolEvent`], [`EventRecord`]
//! - **Configuration**: [`ProtocolConfig`], [`TerminationAuthority`], [`RewardPolicyKind`]
//! - **Errors**: [`EscrowError`] with `QE_ERR_` prefix codes, [`ErrorKind`]
//! - **Constants**: system-wide limits and defaults

pub mod amount;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod fees;
pub mod ids;
pub mod process;
pub mod service;
pub mod settlement;
pub mod vote;

// Re-export all primary types at crate root for ergonomic imports:
//   use quorum_escrow_types::{Process, ProcessState, Service, ...};

pub use config::*;
pub use error::*;
pub use event::*;
pub use fees::*;
pub use ids::*;
pub use process::*;
pub use service::*;
pub use settlement::*;
pub use vote::*;

// Constants and amount helpers are accessed via their module path
// (`quorum_escrow_types::constants::FOO`, `quorum_escrow_types::amount::to_tokens`).
