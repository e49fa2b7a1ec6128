//! # Tally Engine
//!
//! Turns the ballots of a round into prices.
//!
//! ## Round Procedure
//!
//! 1. Ballots failing the threshold are set aside (see [`crate::reference`])
//! 2. The reference ballot is tallied directly; its median is its price
//! 3. Every other passing ballot is cross-rated against the reference and
//!    tallied; price = `reference_median / cross_median`
//! 4. Below-threshold ballots are tallied for participation only
//!
//! Each tally marks winners in the claim map: a vote within
//! `median ± max(median * reward_band / 2, stddev)` earns its power as weight
//! and one win.

use crate::ballot::SortedBallot;
use crate::claim::ClaimMap;
use crate::reference::pick_reference_denom;
use oracle_core::decimal::Dec;
use oracle_core::types::Denom;
use std::collections::{BTreeMap, BTreeSet};

/// Weighted median of `ballot`, crediting winners in `claims`
pub fn tally(ballot: &SortedBallot, reward_band: Dec, claims: &mut ClaimMap) -> Dec {
    let median = ballot.weighted_median();
    let standard_deviation = ballot.standard_deviation(median);
    let band_spread = reward_band
        .checked_quo_int(2)
        .and_then(|half| median.checked_mul(half))
        .unwrap_or(Dec::ZERO);
    let spread = band_spread.max(standard_deviation);

    let lower = median.checked_sub(spread).unwrap_or(Dec::from_raw(i128::MIN));
    let upper = median.checked_add(spread).unwrap_or(Dec::from_raw(i128::MAX));

    for vote in ballot.votes() {
        let Some(claim) = claims.get_mut(&vote.voter) else {
            continue;
        };
        if vote.exchange_rate >= lower && vote.exchange_rate <= upper {
            claim.weight = claim.weight.saturating_add(vote.power);
            claim.win_count += 1;
        }
        if !vote.abstain {
            claim.did_vote = true;
        }
    }

    median
}

/// Result of one tally round
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundOutcome {
    pub reference_denom: Option<Denom>,
    /// Prices to write, by denom
    pub prices: BTreeMap<Denom, Dec>,
    /// Passing denoms whose cross median was zero
    pub skipped: Vec<Denom>,
    /// Denoms that failed the threshold
    pub below_threshold: Vec<Denom>,
}

/// Run reference selection and every tally of one round
///
/// `vote_targets` loses the denoms that fail the threshold.
pub fn tally_round(
    mut ballots: BTreeMap<Denom, SortedBallot>,
    vote_targets: &mut BTreeSet<Denom>,
    threshold: i64,
    reward_band: Dec,
    claims: &mut ClaimMap,
) -> RoundOutcome {
    let selection = pick_reference_denom(&mut ballots, vote_targets, threshold);
    let mut outcome = RoundOutcome {
        reference_denom: selection.reference_denom.clone(),
        below_threshold: selection.below_threshold.keys().cloned().collect(),
        ..RoundOutcome::default()
    };

    if let Some(reference_denom) = &selection.reference_denom {
        if let Some(reference_ballot) = ballots.get(reference_denom) {
            let reference_rates = reference_ballot.voter_rates();
            let reference_median = tally(reference_ballot, reward_band, claims);
            outcome
                .prices
                .insert(reference_denom.clone(), reference_median);

            for (denom, ballot) in ballots.iter().filter(|(d, _)| *d != reference_denom) {
                let cross_ballot = ballot.to_cross_rate(&reference_rates);
                let cross_median = tally(&cross_ballot, reward_band, claims);

                match reference_median.checked_quo(cross_median) {
                    Some(price) => {
                        outcome.prices.insert(denom.clone(), price);
                    }
                    None => {
                        tracing::warn!(denom = %denom, "Cross-rate median is zero, skipping price update");
                        outcome.skipped.push(denom.clone());
                    }
                }
            }
        }
    }

    for ballot in selection.below_threshold.values() {
        tally(ballot, reward_band, claims);
    }

    outcome
}
