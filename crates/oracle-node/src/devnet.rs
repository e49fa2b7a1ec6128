//! In-process devnet
//!
//! Drives an [`OracleNode`] with a fixed validator set whose members feed
//! slightly jittered prices through combined votes each vote period.

use crate::config::{DevnetConfig, NodeConfig};
use crate::node::{Block, BlockResult, OracleNode};
use chrono::{DateTime, Duration, Utc};
use oracle_core::prelude::*;
use oracle_keeper::{
    ActiveValidatorProvider, DenomMetadataRegistry, DenomOracleExchangeRate, Keeper,
    MsgAggregateExchangeRateCombinedVote, SlashingProvider, ValidatorInfo,
};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

pub fn devnet_operator(i: u8) -> ValAddress {
    ValAddress::new([i.wrapping_add(1); ADDRESS_LEN])
}

fn devnet_cons_address(i: u8) -> ConsAddress {
    ConsAddress::new([i.wrapping_add(0x80); ADDRESS_LEN])
}

/// Slash applied by the devnet staking module
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlashEvent {
    pub cons_address: ConsAddress,
    pub infraction_height: u64,
    pub fraction: Dec,
    pub power_before: i64,
    pub power_after: i64,
}

/// Fixed validator set standing in for the staking, slashing and bank modules
#[derive(Debug, Default)]
pub struct DevnetValidators {
    validators: RwLock<Vec<ValidatorInfo>>,
    slashes: RwLock<Vec<SlashEvent>>,
    metadata: RwLock<BTreeMap<Denom, DenomMetadata>>,
}

impl DevnetValidators {
    pub fn new(count: u8, power: i64) -> Self {
        let validators = (0..count)
            .map(|i| ValidatorInfo {
                operator: devnet_operator(i),
                cons_address: devnet_cons_address(i),
                consensus_power: power,
                bonded: true,
                jailed: false,
            })
            .collect();
        Self {
            validators: RwLock::new(validators),
            ..Self::default()
        }
    }

    pub fn slashes(&self) -> Vec<SlashEvent> {
        self.slashes.read().clone()
    }

    pub fn registered_denoms(&self) -> Vec<Denom> {
        self.metadata.read().keys().cloned().collect()
    }
}

impl ActiveValidatorProvider for DevnetValidators {
    fn validators_by_power(&self) -> Vec<ValidatorInfo> {
        let mut validators = self.validators.read().clone();
        validators.sort_by(|a, b| {
            b.consensus_power
                .cmp(&a.consensus_power)
                .then_with(|| a.operator.cmp(&b.operator))
        });
        validators
    }

    fn validator(&self, operator: &ValAddress) -> Option<ValidatorInfo> {
        self.validators
            .read()
            .iter()
            .find(|v| v.operator == *operator)
            .cloned()
    }

    fn total_bonded_power(&self) -> i64 {
        self.validators
            .read()
            .iter()
            .filter(|v| v.bonded)
            .fold(0i64, |acc, v| acc.saturating_add(v.consensus_power))
    }

    fn max_validators(&self) -> usize {
        self.validators.read().len()
    }
}

impl SlashingProvider for DevnetValidators {
    fn slash(&self, cons_address: &ConsAddress, infraction_height: u64, power: i64, fraction: Dec) {
        let mut validators = self.validators.write();
        let Some(validator) = validators.iter_mut().find(|v| v.cons_address == *cons_address) else {
            return;
        };

        let burned = Dec::from_int(power)
            .checked_mul(fraction)
            .map(Dec::truncate_int)
            .and_then(|b| i64::try_from(b).ok())
            .unwrap_or(0);
        let power_before = validator.consensus_power;
        validator.consensus_power = power_before.saturating_sub(burned).max(0);

        self.slashes.write().push(SlashEvent {
            cons_address: *cons_address,
            infraction_height,
            fraction,
            power_before,
            power_after: validator.consensus_power,
        });
    }

    fn jail(&self, cons_address: &ConsAddress) {
        if let Some(validator) = self
            .validators
            .write()
            .iter_mut()
            .find(|v| v.cons_address == *cons_address)
        {
            validator.jailed = true;
            validator.bonded = false;
        }
    }
}

impl DenomMetadataRegistry for DevnetValidators {
    fn has_metadata(&self, base: &str) -> bool {
        self.metadata.read().contains_key(base)
    }

    fn register(&self, metadata: DenomMetadata) {
        self.metadata.write().insert(metadata.base.clone(), metadata);
    }
}

/// Per-validator summary at the end of a run
#[derive(Clone, Debug, Serialize)]
pub struct ValidatorReport {
    pub operator: ValAddress,
    pub consensus_power: i64,
    pub jailed: bool,
    pub counter: VotePenaltyCounter,
}

/// Result of a devnet run
#[derive(Clone, Debug, Serialize)]
pub struct DevnetReport {
    pub chain_id: String,
    pub last_height: u64,
    pub accepted_msgs: usize,
    pub rejected_msgs: usize,
    pub prices: Vec<DenomOracleExchangeRate>,
    pub twaps: Vec<OracleTwap>,
    pub validators: Vec<ValidatorReport>,
    pub slashes: Vec<SlashEvent>,
}

/// Reveal a validator still owes for its last commit
#[derive(Clone, Debug)]
struct PendingReveal {
    salt: String,
    exchange_rates: String,
}

pub struct Devnet {
    node: OracleNode,
    validators: Arc<DevnetValidators>,
    settings: DevnetConfig,
    prices: ExchangeRateTuples,
    genesis_time: DateTime<Utc>,
    pending: BTreeMap<u8, PendingReveal>,
    accepted_msgs: usize,
    rejected_msgs: usize,
}

impl Devnet {
    pub fn new(config: NodeConfig, genesis_time: DateTime<Utc>) -> anyhow::Result<Self> {
        config.validate()?;
        let settings = config.devnet.clone();
        anyhow::ensure!(settings.validators > 0, "devnet needs at least one validator");

        let prices = ExchangeRateTuples::parse(&settings.prices)?;
        let validators = Arc::new(DevnetValidators::new(
            settings.validators,
            settings.validator_power,
        ));
        let keeper = Keeper::new(validators.clone(), validators.clone(), validators.clone());
        let node = OracleNode::new(config, keeper, genesis_time)?;

        Ok(Self {
            node,
            validators,
            settings,
            prices,
            genesis_time,
            pending: BTreeMap::new(),
            accepted_msgs: 0,
            rejected_msgs: 0,
        })
    }

    pub fn node(&self) -> &OracleNode {
        &self.node
    }

    fn block_time(&self, height: u64) -> DateTime<Utc> {
        let offset = i64::try_from(height)
            .unwrap_or(i64::MAX)
            .saturating_mul(self.settings.block_time_secs);
        self.genesis_time + Duration::seconds(offset)
    }

    /// Rates validator `i` reports in `period`, within ±2 per mille of the base
    pub fn feed_rates(&self, i: u8, period: u64) -> String {
        let jitter = i64::try_from((period + u64::from(i) * 7) % 5).unwrap_or(0) - 2;
        let tuples = self
            .prices
            .iter()
            .map(|tuple| {
                let rate = tuple
                    .exchange_rate
                    .checked_mul_int(1000 + jitter)
                    .and_then(|r| r.checked_quo_int(1000))
                    .unwrap_or(tuple.exchange_rate);
                ExchangeRateTuple::new(tuple.denom.clone(), rate)
            })
            .collect();
        ExchangeRateTuples::new(tuples).to_string()
    }

    fn is_present(&self, i: u8) -> bool {
        i < self.settings.validators.saturating_sub(self.settings.absent_validators)
    }

    /// Build and deliver the block at `height`
    pub fn step(&mut self, height: u64) -> anyhow::Result<BlockResult> {
        let vote_period = self.node.config().oracle.vote_period.max(1);
        let mut block = Block::new(height, self.block_time(height));

        if height % vote_period == 0 {
            let period = height / vote_period;
            let present: Vec<u8> = (0..self.settings.validators)
                .filter(|i| self.is_present(*i))
                .collect();
            for i in present {
                let operator = devnet_operator(i);
                let next = PendingReveal {
                    salt: format!("devnet-{}-{}", i, period),
                    exchange_rates: self.feed_rates(i, period),
                };
                let reveal = self.pending.get(&i).cloned().unwrap_or_else(|| next.clone());

                block.msgs.push(
                    MsgAggregateExchangeRateCombinedVote {
                        vote_salt: reveal.salt,
                        vote_exchange_rates: reveal.exchange_rates,
                        prevote_hash: AggregateVoteHash::compute(&next.salt, &next.exchange_rates, &operator)
                            .to_hex(),
                        feeder: AccAddress::from(operator).to_string(),
                        validator: operator.to_string(),
                    }
                    .into(),
                );
                self.pending.insert(i, next);
            }
        }

        let result = self.node.deliver_block(&block)?;
        self.rejected_msgs += result.failed();
        self.accepted_msgs += result.msg_results.len() - result.failed();
        Ok(result)
    }

    /// Run the configured number of blocks and summarise the final state
    pub fn run(&mut self) -> anyhow::Result<DevnetReport> {
        for height in 1..=self.settings.blocks {
            self.step(height)?;
        }
        self.report()
    }

    pub fn report(&self) -> anyhow::Result<DevnetReport> {
        let prices = self.node.query(|q, ctx| q.exchange_rates(ctx))?;
        let twaps = match self
            .node
            .query(|q, ctx| q.twaps(ctx, self.settings.twap_lookback_secs))
        {
            Ok(twaps) => twaps,
            Err(e) => {
                tracing::warn!(error = %e, "No TWAP available for report");
                Vec::new()
            }
        };

        let validators = self
            .validators
            .validators_by_power()
            .into_iter()
            .map(|v| -> Result<ValidatorReport> {
                let counter = self
                    .node
                    .query(|q, ctx| q.vote_penalty_counter(ctx, &v.operator.to_string()))?;
                Ok(ValidatorReport {
                    operator: v.operator,
                    consensus_power: v.consensus_power,
                    jailed: v.jailed,
                    counter,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DevnetReport {
            chain_id: self.node.config().node.chain_id.clone(),
            last_height: self.node.last_height(),
            accepted_msgs: self.accepted_msgs,
            rejected_msgs: self.rejected_msgs,
            prices,
            twaps,
            validators,
            slashes: self.validators.slashes(),
        })
    }
}
