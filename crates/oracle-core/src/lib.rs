//! # Oracle Core
//!
//! Core data structures for the price oracle.
//!
//! This crate provides the fundamental building blocks:
//! - `Dec` - 18-digit fixed-point decimal used for every rate and fraction
//! - `ValAddress` / `AccAddress` / `ConsAddress` - 20-byte identities
//! - `ExchangeRateTuples` - the `"<rate><denom>,..."` vote payload
//! - `AggregateVoteHash` - commit hash binding salt, rates and validator
//! - `Params` - module parameters
//!
//! ## Vote Lifecycle
//!
//! ```text
//!   period N                     period N+1                 period boundary
//!  ┌──────────────────┐        ┌────────────────────┐      ┌─────────────────┐
//!  │ Prevote(hash)    │ ─────► │ Vote(salt, rates)  │ ───► │ tally, prices,  │
//!  │ stored per val   │        │ hash checked       │      │ penalties, TWAP │
//!  └──────────────────┘        └────────────────────┘      └─────────────────┘
//! ```

pub mod decimal;
pub mod error;
pub mod events;
pub mod hash;
pub mod params;
pub mod types;

pub use decimal::*;
pub use error::*;
pub use events::*;
pub use hash::*;
pub use params::*;
pub use types::*;

/// Protocol constants
pub mod constants {
    /// Module name used in event and store namespaces
    pub const MODULE_NAME: &str = "oracle";

    /// Denom every other rate is quoted in; never voted on or stored
    pub const BASE_DENOM: &str = "uusd";

    /// Maximum byte length of a reveal's exchange rate string
    pub const MAX_EXCHANGE_RATES_LEN: usize = 4096;

    /// Maximum salt length
    pub const MAX_SALT_LEN: usize = 64;

    /// Blocks between a misbehaving vote and the validator-set update
    pub const VALIDATOR_UPDATE_DELAY: u64 = 1;
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::constants::*;
    pub use crate::decimal::Dec;
    pub use crate::error::{ErrorCategory, OracleError, Result};
    pub use crate::events::{attribute_keys, event_types, OracleEvent};
    pub use crate::hash::AggregateVoteHash;
    pub use crate::params::Params;
    pub use crate::types::*;
}
