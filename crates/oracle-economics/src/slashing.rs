//! # Slashing System
//!
//! Penalty decision at the end of a slash window.
//!
//! ## Offense Types & Penalties
//!
//! | Offense | Trigger | Penalty | Jail |
//! |---------|---------|---------|------|
//! | Missed Votes | `(W - miss) / W < min_valid_per_window` | `slash_fraction` | yes |
//! | Abstained | `(W - abstain) / W < min_valid_per_window` | `slash_fraction` | no |
//!
//! `W` is the number of vote periods in the window. Missed votes are checked
//! first; a validator is charged at most one offense per window.

use oracle_core::decimal::Dec;
use oracle_core::params::Params;
use oracle_core::types::VotePenaltyCounter;
use serde::{Deserialize, Serialize};

/// Oracle offense types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OracleOffense {
    /// Voted, but too often outside the reward band
    MissedVotes,
    /// Too often cast no usable vote
    Abstained,
}

impl OracleOffense {
    /// Does this offense jail the validator?
    pub fn jails(&self) -> bool {
        matches!(self, Self::MissedVotes)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MissedVotes => "Missed Votes",
            Self::Abstained => "Abstained",
        }
    }
}

/// Penalty to apply to one validator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashDecision {
    pub offense: OracleOffense,
    pub fraction: Dec,
    pub jail: bool,
}

/// Valid participation over a window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowRates {
    pub valid_vote_rate: Dec,
    pub valid_non_abstain_rate: Dec,
}

/// Slash-window evaluator
#[derive(Clone, Debug)]
pub struct SlashingEngine {
    slash_fraction: Dec,
    min_valid_per_window: Dec,
    vote_periods_per_window: u64,
}

impl SlashingEngine {
    pub fn new(slash_fraction: Dec, min_valid_per_window: Dec, vote_periods_per_window: u64) -> Self {
        Self {
            slash_fraction,
            min_valid_per_window,
            vote_periods_per_window,
        }
    }

    pub fn from_params(params: &Params) -> Self {
        Self::new(
            params.slash_fraction,
            params.min_valid_per_window,
            params.vote_periods_per_window(),
        )
    }

    /// Valid vote and non-abstain rates; `None` for an empty window
    pub fn window_rates(&self, counter: &VotePenaltyCounter) -> Option<WindowRates> {
        let window = i64::try_from(self.vote_periods_per_window).ok()?;
        if window == 0 {
            return None;
        }
        let valid = |count: u64| {
            let count = i64::try_from(count).unwrap_or(i64::MAX);
            Dec::from_ratio(window.saturating_sub(count).max(0), window)
        };

        Some(WindowRates {
            valid_vote_rate: valid(counter.miss_count)?,
            valid_non_abstain_rate: valid(counter.abstain_count)?,
        })
    }

    /// Decide the penalty for a counter at the window boundary
    pub fn evaluate(&self, counter: &VotePenaltyCounter) -> Option<SlashDecision> {
        let rates = self.window_rates(counter)?;

        let offense = if rates.valid_vote_rate < self.min_valid_per_window {
            OracleOffense::MissedVotes
        } else if rates.valid_non_abstain_rate < self.min_valid_per_window {
            OracleOffense::Abstained
        } else {
            return None;
        };

        Some(SlashDecision {
            offense,
            fraction: self.slash_fraction,
            jail: offense.jails(),
        })
    }
}
