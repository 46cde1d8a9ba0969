//! Protocol configuration.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{AccountId, EscrowError, Result, constants};

/// Who may move a process from `Deposited` to `Terminating`.
///
/// Exactly one rule is active per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationAuthority {
    /// The customer who funded the process.
    #[default]
    Customer,
    /// The service that performs the work.
    Service,
}

impl fmt::Display for TerminationAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Service => write!(f, "service"),
        }
    }
}

/// Built-in validator reward policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardPolicyKind {
    /// Equal split among the first `quorum_threshold` approvers.
    #[default]
    EqualSplit,
    /// Split among the first `quorum_threshold` approvers by ledger balance.
    StakeWeighted,
}

/// Configuration for one protocol instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Ledger account that holds deposits until settlement.
    pub escrow_account: AccountId,
    pub termination_authority: TerminationAuthority,
    pub reward_policy: RewardPolicyKind,
    /// Settled process keys remembered by the idempotency guard.
    pub idempotency_cache_size: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            escrow_account: AccountId::from_label(constants::DEFAULT_ESCROW_LABEL),
            termination_authority: TerminationAuthority::default(),
            reward_policy: RewardPolicyKind::default(),
            idempotency_cache_size: constants::DEFAULT_IDEMPOTENCY_CACHE_SIZE,
        }
    }
}

impl ProtocolConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EscrowError::Configuration(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Reject settings the protocol cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.idempotency_cache_size == 0 {
            return Err(EscrowError::Configuration(
                "idempotency_cache_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
