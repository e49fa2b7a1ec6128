//! # Oracle Economics
//!
//! Participation accounting for oracle voters.
//!
//! - Penalty counting: one success, miss or abstain per validator per round
//! - Slashing: window-level decision to slash, or slash and jail
//!
//! Applying a decision (calling the staking module) is the keeper's job;
//! this crate only decides.

pub mod penalty;
pub mod slashing;

pub use penalty::*;
pub use slashing::*;
