//! # Ballots
//!
//! A ballot collects every vote cast for one denom in a round. Ballots are
//! built unsorted as [`ExchangeRateBallot`] and become a [`SortedBallot`]
//! only through [`ExchangeRateBallot::sort`]; the median and spread
//! computations exist only on the sorted form.
//!
//! ## Ordering
//!
//! Ascending by exchange rate; equal rates are ordered by voter address so
//! that every node walks the same sequence.

use oracle_core::decimal::Dec;
use oracle_core::types::{Denom, ValAddress};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One validator's rate for one denom, weighted by its power
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteForTally {
    pub denom: Denom,
    pub exchange_rate: Dec,
    pub voter: ValAddress,
    pub power: i64,
    /// Submitted rate was zero: an explicit abstention
    pub abstain: bool,
}

impl VoteForTally {
    /// Build a vote; a non-positive rate is an abstention with no power
    pub fn new(denom: impl Into<Denom>, exchange_rate: Dec, voter: ValAddress, power: i64) -> Self {
        let abstain = !exchange_rate.is_positive();
        Self {
            denom: denom.into(),
            exchange_rate,
            voter,
            power: if abstain { 0 } else { power },
            abstain,
        }
    }

    /// Same voter with rate and power zeroed; the abstain flag is kept
    fn into_unusable(self) -> Self {
        Self {
            exchange_rate: Dec::ZERO,
            power: 0,
            ..self
        }
    }
}

/// Unsorted votes for one denom
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExchangeRateBallot(Vec<VoteForTally>);

impl ExchangeRateBallot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, vote: VoteForTally) {
        self.0.push(vote);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sort ascending by rate, ties by voter
    pub fn sort(mut self) -> SortedBallot {
        self.0.sort_by(|a, b| {
            a.exchange_rate
                .cmp(&b.exchange_rate)
                .then_with(|| a.voter.cmp(&b.voter))
        });
        SortedBallot(self.0)
    }
}

impl From<Vec<VoteForTally>> for ExchangeRateBallot {
    fn from(votes: Vec<VoteForTally>) -> Self {
        Self(votes)
    }
}

/// Ballot in ascending rate order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SortedBallot(Vec<VoteForTally>);

impl SortedBallot {
    pub fn votes(&self) -> &[VoteForTally] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of vote powers
    pub fn power(&self) -> i64 {
        self.0
            .iter()
            .fold(0i64, |acc, vote| acc.saturating_add(vote.power))
    }

    /// First rate at which cumulative power reaches half the total
    ///
    /// Zero-power votes are skipped. A ballot without power has median zero.
    pub fn weighted_median(&self) -> Dec {
        let total = self.power();
        if total <= 0 {
            return Dec::ZERO;
        }

        let pivot = total / 2;
        let mut cumulative = 0i64;
        for vote in self.0.iter().filter(|v| v.power > 0) {
            cumulative = cumulative.saturating_add(vote.power);
            if cumulative >= pivot {
                return vote.exchange_rate;
            }
        }

        Dec::ZERO
    }

    /// Unweighted standard deviation around `median`; zero on overflow
    pub fn standard_deviation(&self, median: Dec) -> Dec {
        if self.0.is_empty() {
            return Dec::ZERO;
        }

        let sum = self.0.iter().try_fold(Dec::ZERO, |acc, vote| {
            let deviation = vote.exchange_rate.checked_sub(median)?;
            acc.checked_add(deviation.checked_mul(deviation)?)
        });

        sum.and_then(|s| s.checked_quo_int(self.0.len() as i64))
            .and_then(Dec::checked_sqrt)
            .unwrap_or(Dec::ZERO)
    }

    /// Voters with a positive rate, keyed by operator
    pub fn voter_rates(&self) -> BTreeMap<ValAddress, Dec> {
        self.0
            .iter()
            .filter(|v| v.exchange_rate.is_positive())
            .map(|v| (v.voter, v.exchange_rate))
            .collect()
    }

    /// Re-express every rate against the reference denom
    ///
    /// Each vote becomes `reference_rate / rate` using the same voter's
    /// reference rate. A vote without a usable reference rate, or whose
    /// quotient overflows, keeps its place with rate and power zeroed.
    pub fn to_cross_rate(&self, reference_rates: &BTreeMap<ValAddress, Dec>) -> SortedBallot {
        let votes: Vec<_> = self
            .0
            .iter()
            .cloned()
            .map(|vote| {
                let cross = reference_rates
                    .get(&vote.voter)
                    .filter(|_| vote.exchange_rate.is_positive())
                    .and_then(|reference| reference.checked_quo(vote.exchange_rate));
                match cross {
                    Some(rate) => VoteForTally {
                        exchange_rate: rate,
                        ..vote
                    },
                    None => vote.into_unusable(),
                }
            })
            .collect();

        ExchangeRateBallot(votes).sort()
    }
}
