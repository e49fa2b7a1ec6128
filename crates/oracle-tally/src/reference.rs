//! Reference denom selection
//!
//! Ballots that fail the power threshold leave the round: they are dropped
//! from the working ballots and the vote targets and handed back separately
//! for participation bookkeeping. Among the rest, the ballot with the most
//! power becomes the reference every other denom is cross-rated against.

use crate::ballot::SortedBallot;
use oracle_core::decimal::Dec;
use oracle_core::types::Denom;
use std::collections::{BTreeMap, BTreeSet};

/// `round_half_even(vote_threshold * total_bonded_power)`
pub fn threshold_power(vote_threshold: Dec, total_bonded_power: i64) -> i64 {
    let threshold = Dec::from_int(total_bonded_power)
        .checked_mul(vote_threshold)
        .map(Dec::round_int)
        .unwrap_or(i128::MAX);
    i64::try_from(threshold).unwrap_or(i64::MAX)
}

/// Passing power of a ballot, if it has any and meets the threshold
pub fn ballot_passes(ballot: &SortedBallot, threshold: i64) -> Option<i64> {
    let power = ballot.power();
    (power != 0 && power >= threshold).then_some(power)
}

#[derive(Clone, Debug, Default)]
pub struct ReferenceSelection {
    pub reference_denom: Option<Denom>,
    pub below_threshold: BTreeMap<Denom, SortedBallot>,
}

/// Split `ballots` into passing and failing, and pick the reference denom
///
/// On return `ballots` holds only passing vote targets and `vote_targets`
/// no longer lists the failing ones. Ballots for denoms that are not vote
/// targets are discarded.
pub fn pick_reference_denom(
    ballots: &mut BTreeMap<Denom, SortedBallot>,
    vote_targets: &mut BTreeSet<Denom>,
    threshold: i64,
) -> ReferenceSelection {
    let mut selection = ReferenceSelection::default();
    let mut largest_power = 0i64;

    let denoms: Vec<Denom> = ballots.keys().cloned().collect();
    for denom in denoms {
        let Some(ballot) = ballots.remove(&denom) else {
            continue;
        };
        if !vote_targets.contains(&denom) {
            tracing::debug!(denom = %denom, "Dropping ballot for non-target denom");
            continue;
        }

        match ballot_passes(&ballot, threshold) {
            Some(power) => {
                // BTreeMap order visits smaller denoms first, so a strict
                // comparison keeps the smaller denom on ties
                if power > largest_power || selection.reference_denom.is_none() {
                    largest_power = power;
                    selection.reference_denom = Some(denom.clone());
                }
                ballots.insert(denom, ballot);
            }
            None => {
                vote_targets.remove(&denom);
                selection.below_threshold.insert(denom, ballot);
            }
        }
    }

    selection
}
