//! Error types for oracle operations

use thiserror::Error;

/// Result type alias for oracle operations
pub type Result<T> = std::result::Result<T, OracleError>;

/// Broad class of an [`OracleError`].
///
/// Every class except `Internal` is rejected with no state change; the
/// enclosing message is rolled back by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Input failed to decode or validate
    Malformed,
    /// Signer is not allowed to act for the validator
    Unauthorized,
    /// Commit-reveal sequencing was violated
    Protocol,
    /// Query target does not exist
    NotFound,
    /// Storage or invariant failure
    Internal,
}

/// Errors that can occur in oracle operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    // === Malformed Input ===
    /// Address string is not 20 hex-encoded bytes
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Denom does not match the denom grammar
    #[error("Invalid denom: {0}")]
    InvalidDenom(String),

    /// Decimal string could not be parsed
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),

    /// Exchange rate string could not be parsed
    #[error("Invalid exchange rate: {0}")]
    InvalidExchangeRate(String),

    /// Same denom appears twice in one vote
    #[error("Duplicate denom in exchange rates: {0}")]
    DuplicateDenom(String),

    /// Vote hash is not hex
    #[error("Invalid vote hash: {0}")]
    InvalidHash(String),

    /// Vote hash has the wrong byte length
    #[error("Invalid vote hash length: expected {expected}, got {actual}")]
    InvalidHashLength { expected: usize, actual: usize },

    /// Salt is empty or too long
    #[error("Invalid salt length: {actual} (must be 1..={max})")]
    InvalidSaltLength { actual: usize, max: usize },

    /// Exchange rate string exceeds the maximum length
    #[error("Exchange rates string too long: {actual} bytes (max {max})")]
    ExchangeRatesTooLong { actual: usize, max: usize },

    /// Vote carries no exchange rates
    #[error("Must provide at least one exchange rate")]
    EmptyExchangeRates,

    /// Parameter set is inconsistent
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// TWAP lookback outside `(0, lookback_duration]`
    #[error("Invalid TWAP lookback: {requested}s (max {max}s)")]
    InvalidTwapLookback { requested: i64, max: u64 },

    // === Authorization ===
    /// Feeder is neither the operator nor its delegate
    #[error("Feeder {feeder} has no voting permission for validator {validator}")]
    NoVotingPermission { feeder: String, validator: String },

    /// Validator is unknown to the staking provider
    #[error("Validator not found: {0}")]
    ValidatorNotFound(String),

    /// Validator exists but is not in the bonded set
    #[error("Validator is not bonded: {0}")]
    ValidatorNotBonded(String),

    // === Protocol Sequence ===
    /// Reveal without a matching commit
    #[error("No aggregate prevote for validator {0}")]
    NoAggregatePrevote(String),

    /// Reveal landed outside the period right after the commit
    #[error("Reveal period mismatch: prevote period {prevote_period}, reveal period {reveal_period}")]
    RevealPeriodMismatch {
        prevote_period: u64,
        reveal_period: u64,
    },

    /// Recomputed hash differs from the committed one
    #[error("Vote hash verification failed: expected {expected}, got {actual}")]
    VerificationFailed { expected: String, actual: String },

    /// Denom is not an active vote target
    #[error("Unknown denom: {0}")]
    UnknownDenom(String),

    /// Validator already revealed this period
    #[error("Aggregate vote already exists for validator {0}")]
    AggregateVoteExists(String),

    /// Validator already sent a vote message at this height
    #[error("Validator {validator} already voted at height {height}")]
    AlreadyVotedAtHeight { validator: String, height: u64 },

    // === Not Found ===
    /// No price stored for the denom
    #[error("Exchange rate not found for denom: {0}")]
    ExchangeRateNotFound(String),

    /// No reveal stored for the validator
    #[error("No aggregate vote for validator {0}")]
    NoAggregateVote(String),

    /// Denom is not a vote target
    #[error("No vote target for denom: {0}")]
    NoVoteTarget(String),

    /// No snapshot data in the requested window
    #[error("No TWAP data in the requested lookback")]
    NoTwapData,

    /// No snapshot data for the denom in the requested window
    #[error("No TWAP data for denom: {0}")]
    NoTwapDataForDenom(String),

    // === Internal ===
    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Arithmetic overflow in a path that cannot recover locally
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OracleError {
    /// Get the error code for API responses
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidExchangeRate(_) | Self::InvalidDecimal(_) => 2,
            Self::NoAggregatePrevote(_) => 3,
            Self::NoAggregateVote(_) => 4,
            Self::NoVotingPermission { .. } => 5,
            Self::InvalidHash(_) => 6,
            Self::InvalidHashLength { .. } => 7,
            Self::VerificationFailed { .. } => 8,
            Self::RevealPeriodMismatch { .. } => 9,
            Self::InvalidSaltLength { .. } => 10,
            Self::UnknownDenom(_) | Self::EmptyExchangeRates => 11,
            Self::ExchangeRateNotFound(_) => 12,
            Self::InvalidAddress(_) | Self::InvalidDenom(_) => 13,
            Self::DuplicateDenom(_) => 14,
            Self::ExchangeRatesTooLong { .. } => 15,
            Self::AggregateVoteExists(_) | Self::AlreadyVotedAtHeight { .. } => 16,
            Self::ValidatorNotFound(_) | Self::ValidatorNotBonded(_) => 17,
            Self::NoTwapData | Self::NoTwapDataForDenom(_) => 18,
            Self::InvalidTwapLookback { .. } => 19,
            Self::InvalidParams(_) => 20,
            Self::NoVoteTarget(_) => 21,
            _ => 9999,
        }
    }

    /// Classify the error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidAddress(_)
            | Self::InvalidDenom(_)
            | Self::InvalidDecimal(_)
            | Self::InvalidExchangeRate(_)
            | Self::DuplicateDenom(_)
            | Self::InvalidHash(_)
            | Self::InvalidHashLength { .. }
            | Self::InvalidSaltLength { .. }
            | Self::ExchangeRatesTooLong { .. }
            | Self::EmptyExchangeRates
            | Self::InvalidParams(_)
            | Self::InvalidTwapLookback { .. } => ErrorCategory::Malformed,

            Self::NoVotingPermission { .. }
            | Self::ValidatorNotFound(_)
            | Self::ValidatorNotBonded(_) => ErrorCategory::Unauthorized,

            Self::NoAggregatePrevote(_)
            | Self::RevealPeriodMismatch { .. }
            | Self::VerificationFailed { .. }
            | Self::UnknownDenom(_)
            | Self::AggregateVoteExists(_)
            | Self::AlreadyVotedAtHeight { .. } => ErrorCategory::Protocol,

            Self::ExchangeRateNotFound(_)
            | Self::NoAggregateVote(_)
            | Self::NoVoteTarget(_)
            | Self::NoTwapData
            | Self::NoTwapDataForDenom(_) => ErrorCategory::NotFound,

            Self::Storage(_) | Self::Serialization(_) | Self::Overflow(_) | Self::Internal(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Whether a later retry of the same message could succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RevealPeriodMismatch { .. }
                | Self::NoAggregatePrevote(_)
                | Self::AlreadyVotedAtHeight { .. }
        )
    }
}
