//! Read-only queries
//!
//! Address arguments are taken as text, as they arrive from clients.

use crate::context::Context;
use crate::keeper::Keeper;
use oracle_core::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenomOracleExchangeRate {
    pub denom: Denom,
    pub oracle_exchange_rate: OracleExchangeRate,
}

#[derive(Clone)]
pub struct Querier {
    keeper: Keeper,
}

impl Querier {
    pub fn new(keeper: Keeper) -> Self {
        Self { keeper }
    }

    pub fn exchange_rate(&self, ctx: &Context<'_>, denom: &str) -> Result<OracleExchangeRate> {
        self.keeper.get_base_exchange_rate(ctx, denom)
    }

    pub fn exchange_rates(&self, ctx: &Context<'_>) -> Result<Vec<DenomOracleExchangeRate>> {
        Ok(self
            .keeper
            .exchange_rates(ctx)?
            .into_iter()
            .map(|(denom, oracle_exchange_rate)| DenomOracleExchangeRate {
                denom,
                oracle_exchange_rate,
            })
            .collect())
    }

    /// Denoms that currently have a price
    pub fn actives(&self, ctx: &Context<'_>) -> Result<Vec<Denom>> {
        Ok(self
            .keeper
            .exchange_rates(ctx)?
            .into_iter()
            .map(|(denom, _)| denom)
            .collect())
    }

    pub fn vote_targets(&self, ctx: &Context<'_>) -> Result<Vec<Denom>> {
        self.keeper.vote_targets(ctx)
    }

    pub fn twaps(&self, ctx: &Context<'_>, lookback_seconds: i64) -> Result<Vec<OracleTwap>> {
        self.keeper.calculate_twaps(ctx, lookback_seconds)
    }

    pub fn price_snapshot_history(&self, ctx: &Context<'_>) -> Result<Vec<PriceSnapshot>> {
        self.keeper.price_snapshots(ctx)
    }

    pub fn feeder_delegation(&self, ctx: &Context<'_>, validator: &str) -> Result<AccAddress> {
        self.keeper.feeder_delegation(ctx, &validator.parse::<ValAddress>()?)
    }

    pub fn vote_penalty_counter(&self, ctx: &Context<'_>, validator: &str) -> Result<VotePenaltyCounter> {
        self.keeper.vote_penalty_counter(ctx, &validator.parse::<ValAddress>()?)
    }

    pub fn aggregate_prevote(&self, ctx: &Context<'_>, validator: &str) -> Result<AggregateExchangeRatePrevote> {
        self.keeper.aggregate_prevote(ctx, &validator.parse::<ValAddress>()?)
    }

    pub fn aggregate_prevotes(&self, ctx: &Context<'_>) -> Result<Vec<AggregateExchangeRatePrevote>> {
        self.keeper.aggregate_prevotes(ctx)
    }

    pub fn aggregate_vote(&self, ctx: &Context<'_>, validator: &str) -> Result<AggregateExchangeRateVote> {
        self.keeper.aggregate_vote(ctx, &validator.parse::<ValAddress>()?)
    }

    pub fn aggregate_votes(&self, ctx: &Context<'_>) -> Result<Vec<AggregateExchangeRateVote>> {
        self.keeper.aggregate_votes(ctx)
    }

    pub fn params(&self, ctx: &Context<'_>) -> Result<Params> {
        self.keeper.params(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{self, val_addr};
    use oracle_storage::MemStore;

    #[test]
    fn test_exchange_rate_queries() {
        let (keeper, _) = testutil::setup(1, 100);
        let querier = Querier::new(keeper.clone());
        let mut store = MemStore::new();
        let mut ctx = testutil::context(&mut store, 3);
        keeper.initialize(&mut ctx, testutil::params()).unwrap();

        keeper.set_base_exchange_rate(&mut ctx, "ueth", Dec::from_int(2)).unwrap();
        keeper.set_base_exchange_rate(&mut ctx, "uatom", Dec::from_int(1)).unwrap();

        assert_eq!(querier.actives(&ctx).unwrap(), vec!["uatom", "ueth"]);
        assert_eq!(querier.exchange_rates(&ctx).unwrap()[1].denom, "ueth");
        assert_eq!(
            querier.exchange_rate(&ctx, "ueth").unwrap().exchange_rate,
            Dec::from_int(2)
        );
        assert!(matches!(
            querier.exchange_rate(&ctx, "ubtc"),
            Err(OracleError::ExchangeRateNotFound(_))
        ));
        assert_eq!(querier.vote_targets(&ctx).unwrap(), vec!["uatom", "ueth"]);
        assert_eq!(querier.params(&ctx).unwrap(), testutil::params());
    }

    #[test]
    fn test_validator_queries_parse_addresses() {
        let (keeper, _) = testutil::setup(1, 100);
        let querier = Querier::new(keeper);
        let mut store = MemStore::new();
        let ctx = testutil::context(&mut store, 3);

        let operator = val_addr(0).to_string();
        assert_eq!(
            querier.vote_penalty_counter(&ctx, &operator).unwrap(),
            VotePenaltyCounter::default()
        );
        assert_eq!(
            querier.feeder_delegation(&ctx, &operator).unwrap(),
            AccAddress::from(val_addr(0))
        );
        assert!(matches!(
            querier.aggregate_vote(&ctx, &operator),
            Err(OracleError::NoAggregateVote(_))
        ));
        assert!(matches!(
            querier.aggregate_prevote(&ctx, "not-an-address"),
            Err(OracleError::InvalidAddress(_))
        ));
    }
}
