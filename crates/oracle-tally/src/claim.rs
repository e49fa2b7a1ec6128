//! Per-round participation record of each active validator

use oracle_core::types::ValAddress;
use std::collections::BTreeMap;

/// Round-local outcome for one validator; never persisted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claim {
    pub power: i64,
    /// Power accumulated from winning votes
    pub weight: i64,
    /// Denoms on which the validator landed inside the reward band
    pub win_count: i64,
    /// At least one non-abstaining vote was tallied
    pub did_vote: bool,
    pub recipient: ValAddress,
}

impl Claim {
    pub fn new(power: i64, recipient: ValAddress) -> Self {
        Self {
            power,
            weight: 0,
            win_count: 0,
            did_vote: false,
            recipient,
        }
    }
}

pub type ClaimMap = BTreeMap<ValAddress, Claim>;
