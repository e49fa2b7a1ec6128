//! Ballot organizer
//!
//! Turns the stored reveals of a round into one sorted ballot per denom,
//! weighting each vote by its validator's power in the claim map.

use crate::context::Context;
use crate::keeper::Keeper;
use oracle_core::prelude::*;
use oracle_tally::{Claim, ClaimMap, ExchangeRateBallot, SortedBallot, VoteForTally};
use std::collections::BTreeMap;

impl Keeper {
    /// Claim for each of the top `max_validators` bonded, unjailed validators
    pub fn build_claim_map(&self) -> ClaimMap {
        self.staking
            .validators_by_power()
            .into_iter()
            .filter(|v| v.bonded && !v.jailed)
            .take(self.staking.max_validators())
            .map(|v| (v.operator, Claim::new(v.consensus_power, v.operator)))
            .collect()
    }

    /// Sorted ballot per denom from every reveal whose voter holds a claim
    pub fn organize_ballot_by_denom(
        &self,
        ctx: &Context<'_>,
        claims: &ClaimMap,
    ) -> Result<BTreeMap<Denom, SortedBallot>> {
        let mut ballots: BTreeMap<Denom, ExchangeRateBallot> = BTreeMap::new();

        for vote in self.aggregate_votes(ctx)? {
            let Some(claim) = claims.get(&vote.voter) else {
                tracing::debug!(voter = %vote.voter, "Ignoring vote from inactive validator");
                continue;
            };
            for tuple in vote.exchange_rate_tuples.iter() {
                ballots.entry(tuple.denom.clone()).or_default().push(VoteForTally::new(
                    tuple.denom.clone(),
                    tuple.exchange_rate,
                    vote.voter,
                    claim.power,
                ));
            }
        }

        Ok(ballots
            .into_iter()
            .map(|(denom, ballot)| (denom, ballot.sort()))
            .collect())
    }
}
