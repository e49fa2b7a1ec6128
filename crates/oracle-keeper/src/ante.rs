//! Mempool admission checks for oracle votes
//!
//! Runs only when a transaction is first admitted; re-checks and
//! simulations pass through. A reveal is refused when the validator has
//! already revealed this period or already sent a vote at this height.

use crate::context::{Context, ExecMode};
use crate::keeper::Keeper;
use crate::msg::OracleMsg;
use oracle_core::prelude::*;
use parking_lot::Mutex;
use std::collections::HashMap;

pub struct SpamPreventionDecorator {
    keeper: Keeper,
    /// Height of the last admitted vote per validator
    last_vote_height: Mutex<HashMap<ValAddress, u64>>,
}

impl SpamPreventionDecorator {
    pub fn new(keeper: Keeper) -> Self {
        Self {
            keeper,
            last_vote_height: Mutex::new(HashMap::new()),
        }
    }

    pub fn ante_handle(&self, ctx: &Context<'_>, msgs: &[OracleMsg]) -> Result<()> {
        if ctx.mode() != ExecMode::Check {
            return Ok(());
        }
        self.check_oracle_spam(ctx, msgs)
    }

    fn check_oracle_spam(&self, ctx: &Context<'_>, msgs: &[OracleMsg]) -> Result<()> {
        let height = ctx.block_height();

        for msg in msgs {
            let (feeder, validator) = match msg {
                OracleMsg::Vote(vote) => (&vote.feeder, &vote.validator),
                OracleMsg::CombinedVote(vote) => (&vote.feeder, &vote.validator),
                OracleMsg::Prevote(_) | OracleMsg::DelegateFeedConsent(_) => continue,
            };
            let feeder: AccAddress = feeder.parse()?;
            let validator: ValAddress = validator.parse()?;
            self.keeper.validate_feeder(ctx, &feeder, &validator)?;

            match self.keeper.aggregate_vote(ctx, &validator) {
                Ok(_) => return Err(OracleError::AggregateVoteExists(validator.to_string())),
                Err(OracleError::NoAggregateVote(_)) => {}
                Err(e) => return Err(e),
            }

            let mut last_vote_height = self.last_vote_height.lock();
            if last_vote_height.get(&validator) == Some(&height) {
                tracing::debug!(validator = %validator, height, "Rejecting duplicate oracle vote");
                return Err(OracleError::AlreadyVotedAtHeight {
                    validator: validator.to_string(),
                    height,
                });
            }
            last_vote_height.insert(validator, height);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::{MsgAggregateExchangeRatePrevote, MsgAggregateExchangeRateVote};
    use crate::testutil::{self, acc_addr, val_addr};
    use oracle_storage::MemStore;

    fn vote(i: u8) -> OracleMsg {
        MsgAggregateExchangeRateVote::new("salt", "1uatom", acc_addr(i), val_addr(i)).into()
    }

    #[test]
    fn test_one_vote_per_height() {
        let (keeper, _) = testutil::setup(2, 100);
        let decorator = SpamPreventionDecorator::new(keeper);
        let mut store = MemStore::new();
        let mut ctx = testutil::context(&mut store, 5).with_mode(ExecMode::Check);

        decorator.ante_handle(&ctx, &[vote(0)]).unwrap();
        assert!(matches!(
            decorator.ante_handle(&ctx, &[vote(0)]),
            Err(OracleError::AlreadyVotedAtHeight { height: 5, .. })
        ));
        decorator.ante_handle(&ctx, &[vote(1)]).unwrap();

        ctx.set_header(6, testutil::time(30));
        decorator.ante_handle(&ctx, &[vote(0)]).unwrap();
    }

    #[test]
    fn test_rejects_existing_aggregate_vote() {
        let (keeper, _) = testutil::setup(1, 100);
        let decorator = SpamPreventionDecorator::new(keeper.clone());
        let mut store = MemStore::new();
        let mut ctx = testutil::context(&mut store, 5).with_mode(ExecMode::Check);

        keeper
            .set_aggregate_vote(
                &mut ctx,
                &val_addr(0),
                &AggregateExchangeRateVote {
                    exchange_rate_tuples: ExchangeRateTuples::parse("1uatom").unwrap(),
                    voter: val_addr(0),
                },
            )
            .unwrap();
        assert!(matches!(
            decorator.ante_handle(&ctx, &[vote(0)]),
            Err(OracleError::AggregateVoteExists(_))
        ));
    }

    #[test]
    fn test_skips_outside_check_mode() {
        let (keeper, _) = testutil::setup(1, 100);
        let decorator = SpamPreventionDecorator::new(keeper);
        let mut store = MemStore::new();

        for mode in [ExecMode::ReCheck, ExecMode::Simulate, ExecMode::Deliver] {
            let ctx = testutil::context(&mut store, 5).with_mode(mode);
            decorator.ante_handle(&ctx, &[vote(0)]).unwrap();
            decorator.ante_handle(&ctx, &[vote(0)]).unwrap();
        }
    }

    #[test]
    fn test_checks_feeder_permission() {
        let (keeper, _) = testutil::setup(2, 100);
        let decorator = SpamPreventionDecorator::new(keeper);
        let mut store = MemStore::new();
        let ctx = testutil::context(&mut store, 5).with_mode(ExecMode::Check);

        let msg: OracleMsg = MsgAggregateExchangeRateVote::new("salt", "1uatom", acc_addr(1), val_addr(0)).into();
        assert!(matches!(
            decorator.ante_handle(&ctx, &[msg]),
            Err(OracleError::NoVotingPermission { .. })
        ));

        // prevotes are not rate limited
        let hash = AggregateVoteHash::compute("salt", "1uatom", &val_addr(0));
        let prevote: OracleMsg = MsgAggregateExchangeRatePrevote::new(hash, acc_addr(1), val_addr(0)).into();
        decorator.ante_handle(&ctx, &[prevote.clone()]).unwrap();
        decorator.ante_handle(&ctx, &[prevote]).unwrap();
    }
}
