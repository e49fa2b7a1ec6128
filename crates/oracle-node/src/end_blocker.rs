//! Round controller
//!
//! Runs after every transaction of a block has been applied.
//!
//! ## Vote Period Boundary
//!
//! 1. Claim map from the active set, ballots from the stored reveals
//! 2. Tally: reference denom, cross rates, prices
//! 3. Price writes for every passing denom
//! 4. One success / miss / abstain per active validator
//! 5. Ballots cleared, vote targets synced with the whitelist
//! 6. Snapshot of all stored prices
//!
//! ## Slash Window Boundary
//!
//! Counters evaluated and reset, then prices of retired denoms removed.

use oracle_core::prelude::*;
use oracle_economics::VoteOutcome;
use oracle_keeper::{Context, Keeper};
use oracle_tally::{tally_round, threshold_power, RoundOutcome};
use std::collections::BTreeSet;

/// Is `height` the last block of a period of `period` blocks?
pub fn is_period_last_block(height: u64, period: u64) -> bool {
    period != 0 && height.wrapping_add(1) % period == 0
}

pub fn end_blocker(keeper: &Keeper, ctx: &mut Context<'_>) -> Result<()> {
    let params = keeper.params(ctx)?;
    let height = ctx.block_height();

    if is_period_last_block(height, params.vote_period) {
        let outcome = run_tally_round(keeper, ctx, &params)?;
        tracing::info!(
            height,
            reference = ?outcome.reference_denom,
            prices = outcome.prices.len(),
            below_threshold = ?outcome.below_threshold,
            "Oracle round tallied"
        );
    }

    if is_period_last_block(height, params.slash_window) {
        tracing::info!(height, "Slash window closed");
        keeper.slash_and_reset_counters(ctx)?;
        keeper.remove_excess_feeds(ctx)?;
    }

    Ok(())
}

fn run_tally_round(keeper: &Keeper, ctx: &mut Context<'_>, params: &Params) -> Result<RoundOutcome> {
    let mut vote_targets: BTreeSet<Denom> = keeper.vote_targets(ctx)?.into_iter().collect();
    let total_targets = vote_targets.len();

    let mut claims = keeper.build_claim_map();
    let ballots = keeper.organize_ballot_by_denom(ctx, &claims)?;
    let threshold = threshold_power(params.vote_threshold, keeper.staking().total_bonded_power());

    let outcome = tally_round(
        ballots,
        &mut vote_targets,
        threshold,
        params.reward_band,
        &mut claims,
    );

    for (denom, price) in &outcome.prices {
        keeper.set_base_exchange_rate_with_event(ctx, denom, *price)?;
    }

    for claim in claims.values() {
        let vote_outcome = VoteOutcome::classify(claim.win_count, claim.did_vote, total_targets);
        keeper.record_vote_outcome(ctx, &claim.recipient, vote_outcome)?;
        tracing::trace!(validator = %claim.recipient, outcome = ?vote_outcome, "Vote outcome recorded");
    }

    keeper.clear_ballots(ctx, params.vote_period)?;
    keeper.apply_whitelist(ctx, &params.whitelist, &vote_targets)?;

    let snapshot = keeper.build_price_snapshot(ctx)?;
    keeper.add_price_snapshot(ctx, snapshot)?;

    Ok(outcome)
}
