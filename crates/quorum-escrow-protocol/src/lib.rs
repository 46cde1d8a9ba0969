//! # quorum-escrow-protocol
//!
//! **Protocol surface**: the operations customers, services and validators
//! call, each applied as one all-or-nothing transaction.
//!
//! ## Architecture
//!
//! 1. **ServiceRegistry**: service → validator committee, fees, quorum threshold
//! 2. **ProcessStore**: (customer, product) → process record and state
//! 3. **ValidationQuorum**: vote rules and quorum arithmetic
//! 4. **SettlementEngine** (settlement crate): payout, reward, burn
//! 5. **EventLog**: sequenced audit trail, polled by validators
//! 6. **ValidatorAgent**: watches for terminations and votes
//!
//! ## Process Flow
//!
//! ```text
//! add_service → create_process → deposit / confirm_deposit
//!     → declare_action* → start_termination → vote* → (quorum) settle → CLOSED
//! ```

pub mod events;
pub mod protocol;
pub mod quorum;
pub mod registry;
pub mod store;
pub mod watcher;

pub use events::EventLog;
pub use protocol::{EscrowProtocol, VoteOutcome};
pub use quorum::{QuorumOutcome, ValidationQuorum};
pub use registry::ServiceRegistry;
pub use store::ProcessStore;
pub use watcher::{AgentAction, ValidatorAgent};
