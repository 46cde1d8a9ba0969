//! System-wide constants for the quorum escrow protocol.

/// Decimal places of the token (base units per token = 10^18).
pub const TOKEN_DECIMALS: u32 = 18;

/// Base units in one whole token.
pub const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

/// Basis points representing 100%.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Largest accepted process cost. Keeps `cost * bps` within `u128`.
pub const MAX_COST_AMOUNT: u128 = u128::MAX / BPS_DENOMINATOR;

/// Upper bound on the validator set of a single service.
pub const MAX_VALIDATORS_PER_SERVICE: usize = 64;

/// Default size of the settlement idempotency cache (process keys remembered).
pub const DEFAULT_IDEMPOTENCY_CACHE_SIZE: usize = 100_000;

/// Label from which the default escrow account is derived.
pub const DEFAULT_ESCROW_LABEL: &str = "quorum-escrow:escrow";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name.
pub const PROTOCOL_NAME: &str = "QuorumEscrow";
