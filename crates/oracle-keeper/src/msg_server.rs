//! Message handlers
//!
//! Handlers run statelessly validated messages against the store. A handler
//! that fails may have written nothing the caller keeps: the node executes
//! each message in its own cache layer and drops it on error.

use crate::context::Context;
use crate::keeper::Keeper;
use crate::msg::{
    MsgAggregateExchangeRateCombinedVote, MsgAggregateExchangeRatePrevote,
    MsgAggregateExchangeRateVote, MsgDelegateFeedConsent, OracleMsg,
};
use oracle_core::prelude::*;

/// Period index of `height`
pub fn vote_period_of(height: u64, vote_period: u64) -> u64 {
    height / vote_period.max(1)
}

/// Does a reveal at `height` fall in the period right after the commit?
pub fn is_reveal_period(prevote: &AggregateExchangeRatePrevote, height: u64, vote_period: u64) -> bool {
    let prevote_period = vote_period_of(prevote.submit_block, vote_period);
    vote_period_of(height, vote_period).checked_sub(prevote_period) == Some(1)
}

#[derive(Clone)]
pub struct MsgServer {
    keeper: Keeper,
}

impl MsgServer {
    pub fn new(keeper: Keeper) -> Self {
        Self { keeper }
    }

    pub fn keeper(&self) -> &Keeper {
        &self.keeper
    }

    /// Validate and execute one message
    pub fn handle(&self, ctx: &mut Context<'_>, msg: &OracleMsg) -> Result<()> {
        msg.validate_basic()?;
        match msg {
            OracleMsg::Prevote(msg) => self.aggregate_exchange_rate_prevote(ctx, msg),
            OracleMsg::Vote(msg) => self.aggregate_exchange_rate_vote(ctx, msg),
            OracleMsg::CombinedVote(msg) => self.aggregate_exchange_rate_combined_vote(ctx, msg),
            OracleMsg::DelegateFeedConsent(msg) => self.delegate_feed_consent(ctx, msg),
        }
    }

    /// Store the commit hash, replacing any earlier prevote
    pub fn aggregate_exchange_rate_prevote(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgAggregateExchangeRatePrevote,
    ) -> Result<()> {
        let validator: ValAddress = msg.validator.parse()?;
        let feeder: AccAddress = msg.feeder.parse()?;
        self.keeper.validate_feeder(ctx, &feeder, &validator)?;

        let hash = AggregateVoteHash::from_hex(&msg.hash)?;
        let prevote = AggregateExchangeRatePrevote {
            hash,
            voter: validator,
            submit_block: ctx.block_height(),
        };
        self.keeper.set_aggregate_prevote(ctx, &validator, &prevote)?;

        tracing::debug!(validator = %validator, height = ctx.block_height(), "Aggregate prevote stored");
        ctx.emit(
            OracleEvent::new(event_types::AGGREGATE_PREVOTE)
                .with_attribute(attribute_keys::VOTER, validator)
                .with_attribute(attribute_keys::FEEDER, feeder),
        );
        Ok(())
    }

    /// Check the reveal against its commit and store it
    pub fn aggregate_exchange_rate_vote(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgAggregateExchangeRateVote,
    ) -> Result<()> {
        let validator: ValAddress = msg.validator.parse()?;
        let feeder: AccAddress = msg.feeder.parse()?;
        self.keeper.validate_feeder(ctx, &feeder, &validator)?;

        let params = self.keeper.params(ctx)?;
        let prevote = self.keeper.aggregate_prevote(ctx, &validator)?;
        if !is_reveal_period(&prevote, ctx.block_height(), params.vote_period) {
            return Err(OracleError::RevealPeriodMismatch {
                prevote_period: vote_period_of(prevote.submit_block, params.vote_period),
                reveal_period: vote_period_of(ctx.block_height(), params.vote_period),
            });
        }

        if !prevote.hash.verify(&msg.salt, &msg.exchange_rates, &validator) {
            return Err(OracleError::VerificationFailed {
                expected: prevote.hash.to_hex(),
                actual: AggregateVoteHash::compute(&msg.salt, &msg.exchange_rates, &validator).to_hex(),
            });
        }

        let exchange_rate_tuples = ExchangeRateTuples::parse(&msg.exchange_rates)?;
        if let Some(unknown) = exchange_rate_tuples
            .iter()
            .find(|tuple| !self.keeper.is_vote_target(ctx, &tuple.denom))
        {
            return Err(OracleError::UnknownDenom(unknown.denom.clone()));
        }

        let vote = AggregateExchangeRateVote {
            exchange_rate_tuples,
            voter: validator,
        };
        self.keeper.set_aggregate_vote(ctx, &validator, &vote)?;
        self.keeper.delete_aggregate_prevote(ctx, &validator);

        tracing::debug!(
            validator = %validator,
            height = ctx.block_height(),
            denoms = vote.exchange_rate_tuples.len(),
            "Aggregate vote stored"
        );
        ctx.emit(
            OracleEvent::new(event_types::AGGREGATE_VOTE)
                .with_attribute(attribute_keys::VOTER, validator)
                .with_attribute(attribute_keys::EXCHANGE_RATES, &msg.exchange_rates)
                .with_attribute(attribute_keys::FEEDER, feeder),
        );
        Ok(())
    }

    /// Reveal when a prevote from the previous period exists, then commit
    pub fn aggregate_exchange_rate_combined_vote(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgAggregateExchangeRateCombinedVote,
    ) -> Result<()> {
        let validator: ValAddress = msg.validator.parse()?;
        let vote_period = self.keeper.params(ctx)?.vote_period;

        match self.keeper.aggregate_prevote(ctx, &validator) {
            Ok(prevote) if is_reveal_period(&prevote, ctx.block_height(), vote_period) => {
                self.aggregate_exchange_rate_vote(ctx, &msg.vote())?;
            }
            Ok(_) | Err(OracleError::NoAggregatePrevote(_)) => {
                tracing::debug!(validator = %validator, "No revealable prevote, committing only");
            }
            Err(e) => return Err(e),
        }

        self.aggregate_exchange_rate_prevote(ctx, &msg.prevote())
    }

    /// Record `delegate` as the feeder of `operator`
    pub fn delegate_feed_consent(&self, ctx: &mut Context<'_>, msg: &MsgDelegateFeedConsent) -> Result<()> {
        let operator: ValAddress = msg.operator.parse()?;
        let delegate: AccAddress = msg.delegate.parse()?;

        if self.keeper.staking().validator(&operator).is_none() {
            return Err(OracleError::ValidatorNotFound(operator.to_string()));
        }
        self.keeper.set_feeder_delegation(ctx, &operator, &delegate)?;

        tracing::info!(operator = %operator, feeder = %delegate, "Feeder delegated");
        ctx.emit(
            OracleEvent::new(event_types::FEED_DELEGATE)
                .with_attribute(attribute_keys::OPERATOR, operator)
                .with_attribute(attribute_keys::FEEDER, delegate),
        );
        Ok(())
    }
}
