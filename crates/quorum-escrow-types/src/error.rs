//! Error types for the quorum escrow protocol.
//!
//! All errors use the `QE_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by the kind of failure:
//! - 1xx: Validation (malformed input)
//! - 2xx: Authorization (caller lacks the role)
//! - 3xx: State (operation invalid for the process state)
//! - 4xx: Duplicate (already registered / created / voted / consumed)
//! - 5xx: Funds (deposit mismatch, ledger balance)
//! - 6xx: Not found
//! - 9xx: General / internal errors

use std::fmt;

use thiserror::Error;

use crate::{AccountId, ProcessKey, ProcessState, ReceiptId, ServiceId};

/// The six externally visible error kinds, plus `Internal`.
///
/// Callers branch on the kind; the variant carries the detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authorization,
    State,
    Duplicate,
    InsufficientFunds,
    NotFound,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::State => write!(f, "STATE"),
            Self::Duplicate => write!(f, "DUPLICATE"),
            Self::InsufficientFunds => write!(f, "INSUFFICIENT_FUNDS"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Central error enum for all protocol operations.
#[derive(Debug, Error)]
pub enum EscrowError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// The service registration is malformed (validators, fees, threshold).
    #[error("QE_ERR_100: Invalid service: {reason}")]
    InvalidService { reason: String },

    /// The process parameters are malformed (cost out of range).
    #[error("QE_ERR_101: Invalid process: {reason}")]
    InvalidProcess { reason: String },

    /// An amount could not be parsed or represented.
    #[error("QE_ERR_102: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    // =================================================================
    // Authorization Errors (2xx)
    // =================================================================
    /// The caller does not hold the role this operation requires.
    #[error("QE_ERR_200: {caller} is not authorized to {action}")]
    Unauthorized { caller: AccountId, action: &'static str },

    // =================================================================
    // State Errors (3xx)
    // =================================================================
    /// The operation is not valid in the process's current state.
    #[error("QE_ERR_300: Cannot {operation} process {key} in state {state}")]
    InvalidState {
        key: ProcessKey,
        operation: &'static str,
        state: ProcessState,
    },

    /// The process has already been settled (exactly-once guard).
    #[error("QE_ERR_301: Process already settled: {0}")]
    AlreadySettled(ProcessKey),

    // =================================================================
    // Duplicate Errors (4xx)
    // =================================================================
    /// A service with this identity is already registered.
    #[error("QE_ERR_400: Service already registered: {0}")]
    DuplicateService(ServiceId),

    /// A process already exists for this (customer, product).
    #[error("QE_ERR_401: Process already exists: {0}")]
    DuplicateProcess(ProcessKey),

    /// The validator already voted on this process.
    #[error("QE_ERR_402: Validator {validator} already voted on {key}")]
    DuplicateVote { key: ProcessKey, validator: AccountId },

    /// The transfer receipt was already bound to a process.
    #[error("QE_ERR_403: Receipt already consumed: {0}")]
    ReceiptAlreadyConsumed(ReceiptId),

    // =================================================================
    // Funds Errors (5xx)
    // =================================================================
    /// The deposit does not equal the process cost exactly.
    #[error("QE_ERR_500: Deposit mismatch: expected {expected}, received {received}")]
    DepositMismatch { expected: u128, received: u128 },

    /// The ledger account holds less than the operation needs.
    #[error("QE_ERR_501: Insufficient balance in {account}: need {needed}, have {available}")]
    InsufficientBalance {
        account: AccountId,
        needed: u128,
        available: u128,
    },

    // =================================================================
    // Not Found Errors (6xx)
    // =================================================================
    /// No service is registered under this identity.
    #[error("QE_ERR_600: Service not found: {0}")]
    ServiceNotFound(ServiceId),

    /// No process exists for this key.
    #[error("QE_ERR_601: Process not found: {0}")]
    ProcessNotFound(ProcessKey),

    /// The ledger has no transfer with this receipt.
    #[error("QE_ERR_602: Receipt not found: {0}")]
    ReceiptNotFound(ReceiptId),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Supply conservation invariant violated. Critical.
    #[error("QE_ERR_900: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    /// Settlement payouts do not add up to the escrowed cost.
    #[error("QE_ERR_901: Conservation violation: {reason}")]
    ConservationViolation { reason: String },

    /// Arithmetic overflowed a `u128` balance.
    #[error("QE_ERR_902: Arithmetic overflow: {0}")]
    Overflow(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("QE_ERR_903: Configuration error: {0}")]
    Configuration(String),

    /// I/O error.
    #[error("QE_ERR_904: I/O error: {0}")]
    Io(String),
}

impl EscrowError {
    /// The externally visible kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidService { .. }
            | Self::InvalidProcess { .. }
            | Self::InvalidAmount { .. } => ErrorKind::Validation,
            Self::Unauthorized { .. } => ErrorKind::Authorization,
            Self::InvalidState { .. } | Self::AlreadySettled(_) => ErrorKind::State,
            Self::DuplicateService(_)
            | Self::DuplicateProcess(_)
            | Self::DuplicateVote { .. }
            | Self::ReceiptAlreadyConsumed(_) => ErrorKind::Duplicate,
            Self::DepositMismatch { .. } | Self::InsufficientBalance { .. } => {
                ErrorKind::InsufficientFunds
            }
            Self::ServiceNotFound(_) | Self::ProcessNotFound(_) | Self::ReceiptNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::SupplyInvariantViolation { .. }
            | Self::ConservationViolation { .. }
            | Self::Overflow(_)
            | Self::Configuration(_)
            | Self::Io(_) => ErrorKind::Internal,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, EscrowError>;

impl From<std::io::Error> for EscrowError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
