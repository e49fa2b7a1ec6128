//! # Oracle Keeper
//!
//! State machine of the oracle module.
//!
//! ## Components
//!
//! - `context` - block header, execution mode and event sink for one unit of work
//! - `providers` - staking, slashing and metadata interfaces the module consumes
//! - `keeper` - typed accessors for every store table
//! - `msg` / `msg_server` - commit-reveal and delegation messages and their handlers
//! - `ante` - mempool admission checks for votes
//! - `organize` - claim map and per-denom ballots for a tally round
//! - `twap` - price snapshots and time-weighted averages
//! - `whitelist` - vote-target maintenance
//! - `slashing` - penalty counters and slash application
//! - `query` - read-only queries

pub mod ante;
pub mod context;
pub mod keeper;
pub mod msg;
pub mod msg_server;
pub mod organize;
pub mod providers;
pub mod query;
pub mod slashing;
pub mod twap;
pub mod whitelist;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

// Re-exports
pub use ante::SpamPreventionDecorator;
pub use context::{BlockHeader, Context, ExecMode};
pub use keeper::Keeper;
pub use msg::*;
pub use msg_server::MsgServer;
pub use providers::*;
pub use query::{DenomOracleExchangeRate, Querier};
