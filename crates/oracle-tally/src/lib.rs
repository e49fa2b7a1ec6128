//! # Oracle Tally
//!
//! Byzantine-fault-tolerant aggregation of validator price votes.
//! A weighted median is robust as long as honest validators hold more than
//! half of the voting power in a ballot.
//!
//! ## Components
//!
//! 1. Ballots - per-denom votes, sorted before any median is taken
//! 2. Claims - per-validator win bookkeeping for penalties
//! 3. Reference selection - threshold filtering and the cross-rate anchor
//! 4. Tally - weighted median, reward band and round pricing

pub mod ballot;
pub mod claim;
pub mod reference;
pub mod tally;

// Re-exports
pub use ballot::*;
pub use claim::*;
pub use reference::*;
pub use tally::*;
