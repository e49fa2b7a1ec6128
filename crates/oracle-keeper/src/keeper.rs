//! Oracle keeper - typed access to module state
//!
//! Every table of the module lives behind one of the accessors below. Reads
//! take a shared [`Context`]; writes take it mutably so that a message's
//! changes stay inside that message's cache layer.

use crate::context::Context;
use crate::providers::{ActiveValidatorProvider, DenomMetadataRegistry, SlashingProvider};
use oracle_core::prelude::*;
use oracle_storage::keys;
use oracle_storage::{codec, KvStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

fn read<T: DeserializeOwned>(store: &dyn KvStore, key: &[u8]) -> Result<Option<T>> {
    store.get(key).map(|bytes| codec::decode(&bytes)).transpose()
}

fn write<T: Serialize>(store: &mut dyn KvStore, key: Vec<u8>, value: &T) -> Result<()> {
    store.set(key, codec::encode(value)?);
    Ok(())
}

fn scan<T: DeserializeOwned>(store: &dyn KvStore, prefix: u8) -> Result<Vec<(Vec<u8>, T)>> {
    store
        .scan_prefix(&[prefix])
        .into_iter()
        .map(|(key, bytes)| Ok((key, codec::decode(&bytes)?)))
        .collect()
}

fn operator_from_key(key: &[u8]) -> Result<ValAddress> {
    keys::val_address_from_key(key)
        .ok_or_else(|| OracleError::Storage(format!("malformed validator key {:02x?}", key)))
}

fn denom_from_key(key: &[u8]) -> Result<Denom> {
    keys::denom_from_key(key)
        .ok_or_else(|| OracleError::Storage(format!("malformed denom key {:02x?}", key)))
}

/// Oracle module keeper
#[derive(Clone)]
pub struct Keeper {
    pub(crate) staking: Arc<dyn ActiveValidatorProvider>,
    pub(crate) slashing: Arc<dyn SlashingProvider>,
    pub(crate) metadata: Arc<dyn DenomMetadataRegistry>,
}

impl Keeper {
    pub fn new(
        staking: Arc<dyn ActiveValidatorProvider>,
        slashing: Arc<dyn SlashingProvider>,
        metadata: Arc<dyn DenomMetadataRegistry>,
    ) -> Self {
        Self {
            staking,
            slashing,
            metadata,
        }
    }

    pub fn staking(&self) -> &dyn ActiveValidatorProvider {
        self.staking.as_ref()
    }

    /// Write initial params and derive the vote targets from the whitelist
    pub fn initialize(&self, ctx: &mut Context<'_>, params: Params) -> Result<()> {
        self.set_params(ctx, params.clone())?;
        self.apply_whitelist(ctx, &params.whitelist, &BTreeSet::new())?;
        tracing::info!(
            vote_period = params.vote_period,
            whitelist = ?params.whitelist,
            "Oracle module initialized"
        );
        Ok(())
    }

    // ========================================================================
    // Params
    // ========================================================================

    /// Stored params, or the defaults before initialization
    pub fn params(&self, ctx: &Context<'_>) -> Result<Params> {
        Ok(read(ctx.store(), &keys::params_key())?.unwrap_or_default())
    }

    pub fn set_params(&self, ctx: &mut Context<'_>, params: Params) -> Result<()> {
        params.validate()?;
        write(ctx.store_mut(), keys::params_key(), &params)
    }

    // ========================================================================
    // Exchange Rates
    // ========================================================================

    /// Price of `denom`; the base denom is always 1
    pub fn get_base_exchange_rate(&self, ctx: &Context<'_>, denom: &str) -> Result<OracleExchangeRate> {
        if denom == BASE_DENOM {
            let vote_period = self.params(ctx)?.vote_period.max(1);
            let height = ctx.block_height();
            return Ok(OracleExchangeRate {
                exchange_rate: Dec::ONE,
                last_update: i64::try_from(height - height % vote_period).unwrap_or(i64::MAX),
                last_update_timestamp: ctx.unix_millis(),
            });
        }

        read(ctx.store(), &keys::exchange_rate_key(denom))?
            .ok_or_else(|| OracleError::ExchangeRateNotFound(denom.to_string()))
    }

    /// Persist `{rate, height, block time}` for `denom`
    pub fn set_base_exchange_rate(&self, ctx: &mut Context<'_>, denom: &str, exchange_rate: Dec) -> Result<()> {
        if denom == BASE_DENOM {
            tracing::debug!(denom, "Ignoring write to base denom rate");
            return Ok(());
        }

        let rate = OracleExchangeRate {
            exchange_rate,
            last_update: i64::try_from(ctx.block_height()).unwrap_or(i64::MAX),
            last_update_timestamp: ctx.unix_millis(),
        };
        write(ctx.store_mut(), keys::exchange_rate_key(denom), &rate)
    }

    pub fn set_base_exchange_rate_with_event(
        &self,
        ctx: &mut Context<'_>,
        denom: &str,
        exchange_rate: Dec,
    ) -> Result<()> {
        if denom == BASE_DENOM {
            tracing::debug!(denom, "Ignoring write to base denom rate");
            return Ok(());
        }
        self.set_base_exchange_rate(ctx, denom, exchange_rate)?;
        ctx.emit(
            OracleEvent::new(event_types::EXCHANGE_RATE_UPDATE)
                .with_attribute(attribute_keys::DENOM, denom)
                .with_attribute(attribute_keys::EXCHANGE_RATE, exchange_rate),
        );
        Ok(())
    }

    pub fn delete_base_exchange_rate(&self, ctx: &mut Context<'_>, denom: &str) {
        ctx.store_mut().delete(&keys::exchange_rate_key(denom));
    }

    /// Every stored price, by denom
    pub fn exchange_rates(&self, ctx: &Context<'_>) -> Result<Vec<(Denom, OracleExchangeRate)>> {
        scan(ctx.store(), keys::EXCHANGE_RATE_PREFIX)?
            .into_iter()
            .map(|(key, rate)| Ok((denom_from_key(&key)?, rate)))
            .collect()
    }

    /// Delete prices of denoms that are no longer vote targets
    pub fn remove_excess_feeds(&self, ctx: &mut Context<'_>) -> Result<()> {
        let targets: BTreeSet<Denom> = self.vote_targets(ctx)?.into_iter().collect();
        let excess: Vec<Denom> = self
            .exchange_rates(ctx)?
            .into_iter()
            .map(|(denom, _)| denom)
            .filter(|denom| !targets.contains(denom))
            .collect();

        for denom in excess {
            tracing::info!(denom = %denom, "Removing feed for retired denom");
            self.delete_base_exchange_rate(ctx, &denom);
        }
        Ok(())
    }

    // ========================================================================
    // Feeder Delegation
    // ========================================================================

    /// Account allowed to vote for `operator`; the operator itself by default
    pub fn feeder_delegation(&self, ctx: &Context<'_>, operator: &ValAddress) -> Result<AccAddress> {
        Ok(read(ctx.store(), &keys::feeder_delegation_key(operator))?
            .unwrap_or_else(|| AccAddress::from(*operator)))
    }

    pub fn set_feeder_delegation(
        &self,
        ctx: &mut Context<'_>,
        operator: &ValAddress,
        feeder: &AccAddress,
    ) -> Result<()> {
        write(ctx.store_mut(), keys::feeder_delegation_key(operator), feeder)
    }

    pub fn feeder_delegations(&self, ctx: &Context<'_>) -> Result<Vec<(ValAddress, AccAddress)>> {
        scan(ctx.store(), keys::FEEDER_DELEGATION_PREFIX)?
            .into_iter()
            .map(|(key, feeder)| Ok((operator_from_key(&key)?, feeder)))
            .collect()
    }

    /// Check that `feeder` may vote for `validator` and that it is bonded
    pub fn validate_feeder(
        &self,
        ctx: &Context<'_>,
        feeder: &AccAddress,
        validator: &ValAddress,
    ) -> Result<()> {
        if feeder.as_bytes() != validator.as_bytes() {
            let delegate = self.feeder_delegation(ctx, validator)?;
            if delegate != *feeder {
                return Err(OracleError::NoVotingPermission {
                    feeder: feeder.to_string(),
                    validator: validator.to_string(),
                });
            }
        }

        match self.staking.validator(validator) {
            None => Err(OracleError::ValidatorNotFound(validator.to_string())),
            Some(info) if !info.bonded => Err(OracleError::ValidatorNotBonded(validator.to_string())),
            Some(_) => Ok(()),
        }
    }

    // ========================================================================
    // Penalty Counters
    // ========================================================================

    pub fn vote_penalty_counter(&self, ctx: &Context<'_>, operator: &ValAddress) -> Result<VotePenaltyCounter> {
        Ok(read(ctx.store(), &keys::vote_penalty_counter_key(operator))?.unwrap_or_default())
    }

    pub fn set_vote_penalty_counter(
        &self,
        ctx: &mut Context<'_>,
        operator: &ValAddress,
        counter: &VotePenaltyCounter,
    ) -> Result<()> {
        write(ctx.store_mut(), keys::vote_penalty_counter_key(operator), counter)
    }

    pub fn delete_vote_penalty_counter(&self, ctx: &mut Context<'_>, operator: &ValAddress) {
        ctx.store_mut().delete(&keys::vote_penalty_counter_key(operator));
    }

    pub fn vote_penalty_counters(&self, ctx: &Context<'_>) -> Result<Vec<(ValAddress, VotePenaltyCounter)>> {
        scan(ctx.store(), keys::VOTE_PENALTY_COUNTER_PREFIX)?
            .into_iter()
            .map(|(key, counter)| Ok((operator_from_key(&key)?, counter)))
            .collect()
    }

    // ========================================================================
    // Prevotes & Votes
    // ========================================================================

    pub fn aggregate_prevote(
        &self,
        ctx: &Context<'_>,
        voter: &ValAddress,
    ) -> Result<AggregateExchangeRatePrevote> {
        read(ctx.store(), &keys::aggregate_prevote_key(voter))?
            .ok_or_else(|| OracleError::NoAggregatePrevote(voter.to_string()))
    }

    pub fn set_aggregate_prevote(
        &self,
        ctx: &mut Context<'_>,
        voter: &ValAddress,
        prevote: &AggregateExchangeRatePrevote,
    ) -> Result<()> {
        write(ctx.store_mut(), keys::aggregate_prevote_key(voter), prevote)
    }

    pub fn delete_aggregate_prevote(&self, ctx: &mut Context<'_>, voter: &ValAddress) {
        ctx.store_mut().delete(&keys::aggregate_prevote_key(voter));
    }

    pub fn aggregate_prevotes(&self, ctx: &Context<'_>) -> Result<Vec<AggregateExchangeRatePrevote>> {
        Ok(scan(ctx.store(), keys::AGGREGATE_PREVOTE_PREFIX)?
            .into_iter()
            .map(|(_, prevote)| prevote)
            .collect())
    }

    pub fn aggregate_vote(&self, ctx: &Context<'_>, voter: &ValAddress) -> Result<AggregateExchangeRateVote> {
        read(ctx.store(), &keys::aggregate_vote_key(voter))?
            .ok_or_else(|| OracleError::NoAggregateVote(voter.to_string()))
    }

    pub fn set_aggregate_vote(
        &self,
        ctx: &mut Context<'_>,
        voter: &ValAddress,
        vote: &AggregateExchangeRateVote,
    ) -> Result<()> {
        write(ctx.store_mut(), keys::aggregate_vote_key(voter), vote)
    }

    pub fn delete_aggregate_vote(&self, ctx: &mut Context<'_>, voter: &ValAddress) {
        ctx.store_mut().delete(&keys::aggregate_vote_key(voter));
    }

    /// All reveals, in operator order
    pub fn aggregate_votes(&self, ctx: &Context<'_>) -> Result<Vec<AggregateExchangeRateVote>> {
        Ok(scan(ctx.store(), keys::AGGREGATE_VOTE_PREFIX)?
            .into_iter()
            .map(|(_, vote)| vote)
            .collect())
    }

    /// Delete every reveal and every prevote older than one vote period
    pub fn clear_ballots(&self, ctx: &mut Context<'_>, vote_period: u64) -> Result<()> {
        let height = ctx.block_height();

        let stale: Vec<Vec<u8>> = scan::<AggregateExchangeRatePrevote>(ctx.store(), keys::AGGREGATE_PREVOTE_PREFIX)?
            .into_iter()
            .filter(|(_, prevote)| height > prevote.submit_block.saturating_add(vote_period))
            .map(|(key, _)| key)
            .collect();
        let votes: Vec<Vec<u8>> = ctx
            .store()
            .scan_prefix(&[keys::AGGREGATE_VOTE_PREFIX])
            .into_iter()
            .map(|(key, _)| key)
            .collect();

        tracing::debug!(height, stale_prevotes = stale.len(), votes = votes.len(), "Clearing ballots");
        for key in stale.iter().chain(votes.iter()) {
            ctx.store_mut().delete(key);
        }
        Ok(())
    }

    // ========================================================================
    // Vote Targets
    // ========================================================================

    pub fn is_vote_target(&self, ctx: &Context<'_>, denom: &str) -> bool {
        ctx.store().has(&keys::vote_target_key(denom))
    }

    pub fn vote_target(&self, ctx: &Context<'_>, denom: &str) -> Result<Denom> {
        read(ctx.store(), &keys::vote_target_key(denom))?
            .ok_or_else(|| OracleError::NoVoteTarget(denom.to_string()))
    }

    pub fn set_vote_target(&self, ctx: &mut Context<'_>, denom: &str) -> Result<()> {
        write(ctx.store_mut(), keys::vote_target_key(denom), &denom.to_string())
    }

    /// Vote targets in denom order
    pub fn vote_targets(&self, ctx: &Context<'_>) -> Result<Vec<Denom>> {
        ctx.store()
            .scan_prefix(&[keys::VOTE_TARGET_PREFIX])
            .iter()
            .map(|(key, _)| denom_from_key(key))
            .collect()
    }

    pub fn clear_vote_targets(&self, ctx: &mut Context<'_>) {
        let targets: Vec<Vec<u8>> = ctx
            .store()
            .scan_prefix(&[keys::VOTE_TARGET_PREFIX])
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        for key in targets {
            ctx.store_mut().delete(&key);
        }
    }

    // ========================================================================
    // Price Snapshots
    // ========================================================================

    /// Snapshot history, oldest first
    pub fn price_snapshots(&self, ctx: &Context<'_>) -> Result<Vec<PriceSnapshot>> {
        Ok(read(ctx.store(), &keys::price_snapshot_key())?.unwrap_or_default())
    }

    pub fn set_price_snapshots(&self, ctx: &mut Context<'_>, snapshots: &[PriceSnapshot]) -> Result<()> {
        write(ctx.store_mut(), keys::price_snapshot_key(), &snapshots.to_vec())
    }
}
