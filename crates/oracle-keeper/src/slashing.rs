//! Penalty bookkeeping and slash application

use crate::context::Context;
use crate::keeper::Keeper;
use oracle_core::prelude::*;
use oracle_economics::{record_outcome, SlashingEngine, VoteOutcome};

impl Keeper {
    /// Charge one round outcome to `operator`'s counter
    pub fn record_vote_outcome(
        &self,
        ctx: &mut Context<'_>,
        operator: &ValAddress,
        outcome: VoteOutcome,
    ) -> Result<VotePenaltyCounter> {
        let counter = record_outcome(self.vote_penalty_counter(ctx, operator)?, outcome);
        self.set_vote_penalty_counter(ctx, operator, &counter)?;
        Ok(counter)
    }

    /// Evaluate every counter, slash offenders and reset all counters
    ///
    /// Only bonded, unjailed validators are penalised. The infraction is
    /// dated before the validator-set update delay.
    pub fn slash_and_reset_counters(&self, ctx: &mut Context<'_>) -> Result<()> {
        let params = self.params(ctx)?;
        let engine = SlashingEngine::from_params(&params);
        let infraction_height = ctx
            .block_height()
            .saturating_sub(VALIDATOR_UPDATE_DELAY + 1);

        for (operator, counter) in self.vote_penalty_counters(ctx)? {
            if let Some(decision) = engine.evaluate(&counter) {
                match self.staking.validator(&operator) {
                    Some(validator) if validator.bonded && !validator.jailed => {
                        self.slashing.slash(
                            &validator.cons_address,
                            infraction_height,
                            validator.consensus_power,
                            decision.fraction,
                        );
                        if decision.jail {
                            self.slashing.jail(&validator.cons_address);
                        }

                        tracing::warn!(
                            validator = %operator,
                            offense = decision.offense.name(),
                            miss_count = counter.miss_count,
                            abstain_count = counter.abstain_count,
                            fraction = %decision.fraction,
                            jailed = decision.jail,
                            "Oracle validator slashed"
                        );
                        ctx.emit(
                            OracleEvent::new(event_types::ORACLE_SLASH)
                                .with_attribute(attribute_keys::VALIDATOR, operator)
                                .with_attribute(attribute_keys::FRACTION, decision.fraction)
                                .with_attribute(attribute_keys::JAILED, decision.jail),
                        );
                    }
                    _ => {
                        tracing::debug!(validator = %operator, "Skipping slash for inactive validator");
                    }
                }
            }

            self.delete_vote_penalty_counter(ctx, &operator);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{self, val_addr};
    use oracle_storage::MemStore;

    fn params() -> Params {
        Params {
            vote_period: 1,
            slash_window: 100,
            min_valid_per_window: Dec::with_prec(5, 2),
            ..Params::default()
        }
    }

    fn counter(miss: u64, abstain: u64) -> VotePenaltyCounter {
        VotePenaltyCounter {
            miss_count: miss,
            abstain_count: abstain,
            success_count: 0,
        }
    }

    #[test]
    fn test_record_vote_outcome() {
        let (keeper, _) = testutil::setup(1, 100);
        let mut store = MemStore::new();
        let mut ctx = testutil::context(&mut store, 1);

        keeper.record_vote_outcome(&mut ctx, &val_addr(0), VoteOutcome::Miss).unwrap();
        let counter = keeper
            .record_vote_outcome(&mut ctx, &val_addr(0), VoteOutcome::Success)
            .unwrap();
        assert_eq!(counter.miss_count, 1);
        assert_eq!(counter.success_count, 1);
        assert_eq!(keeper.vote_penalty_counter(&ctx, &val_addr(0)).unwrap(), counter);
    }

    #[test]
    fn test_slash_boundary() {
        let (keeper, staking) = testutil::setup(2, 100);
        let mut store = MemStore::new();
        let mut ctx = testutil::context(&mut store, 99);
        keeper.initialize(&mut ctx, params()).unwrap();

        // valid rate exactly at the minimum
        keeper
            .set_vote_penalty_counter(&mut ctx, &val_addr(0), &counter(95, 0))
            .unwrap();
        // one miss beyond it
        keeper
            .set_vote_penalty_counter(&mut ctx, &val_addr(1), &counter(96, 0))
            .unwrap();

        keeper.slash_and_reset_counters(&mut ctx).unwrap();

        let slashes = staking.slashes();
        assert_eq!(slashes.len(), 1);
        assert_eq!(slashes[0].cons_address, testutil::cons_addr(1));
        assert_eq!(slashes[0].fraction, params().slash_fraction);
        assert_eq!(slashes[0].infraction_height, 97);
        assert!(staking.is_jailed(&val_addr(1)));
        assert!(!staking.is_jailed(&val_addr(0)));
        assert!(keeper.vote_penalty_counters(&ctx).unwrap().is_empty());

        let event = &ctx.events()[0];
        assert_eq!(event.kind, event_types::ORACLE_SLASH);
        assert_eq!(event.attribute(attribute_keys::JAILED), Some("true"));
    }

    #[test]
    fn test_abstain_slashes_without_jail() {
        let (keeper, staking) = testutil::setup(1, 100);
        let mut store = MemStore::new();
        let mut ctx = testutil::context(&mut store, 99);
        keeper.initialize(&mut ctx, params()).unwrap();

        keeper
            .set_vote_penalty_counter(&mut ctx, &val_addr(0), &counter(0, 100))
            .unwrap();
        keeper.slash_and_reset_counters(&mut ctx).unwrap();

        assert_eq!(staking.slashes().len(), 1);
        assert!(!staking.is_jailed(&val_addr(0)));
    }

    #[test]
    fn test_jailed_validator_not_slashed_again() {
        let (keeper, staking) = testutil::setup(1, 100);
        staking.set_jailed(&val_addr(0), true);
        let mut store = MemStore::new();
        let mut ctx = testutil::context(&mut store, 99);
        keeper.initialize(&mut ctx, params()).unwrap();

        keeper
            .set_vote_penalty_counter(&mut ctx, &val_addr(0), &counter(100, 0))
            .unwrap();
        keeper.slash_and_reset_counters(&mut ctx).unwrap();

        assert!(staking.slashes().is_empty());
        assert!(keeper.vote_penalty_counters(&ctx).unwrap().is_empty());
    }
}
