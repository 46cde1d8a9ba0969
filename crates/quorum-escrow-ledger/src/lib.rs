//! # quorum-escrow-ledger
//!
//! **Token ledger collaborator**: the balance store the escrow protocol
//! moves funds through.
//!
//! ## Architecture
//!
//! 1. **TokenLedger**: the trait the protocol consumes (`transfer`,
//!    `balance_of`, `burn`, `total_supply`, receipts)
//! 2. **InMemoryLedger**: reference implementation backed by a hash map
//! 3. **SupplyConservation**: `Σ balances == minted - burned` checker
//!
//! Every ledger call is all-or-nothing: on error no balance changes.

pub mod ledger;
pub mod memory;
pub mod supply_conservation;

pub use ledger::{TokenLedger, TransferReceipt};
pub use memory::InMemoryLedger;
pub use supply_conservation::SupplyConservation;
