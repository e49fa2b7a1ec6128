//! Test helpers: an in-memory staking module and context builders

use crate::context::{BlockHeader, Context};
use crate::keeper::Keeper;
use crate::providers::{ActiveValidatorProvider, DenomMetadataRegistry, SlashingProvider, ValidatorInfo};
use chrono::{DateTime, Utc};
use oracle_core::prelude::*;
use oracle_storage::KvStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const TEST_CHAIN_ID: &str = "oracle-test";

/// Seconds between consecutive test blocks
pub const BLOCK_TIME_SECS: i64 = 5;

pub fn val_addr(i: u8) -> ValAddress {
    ValAddress::new([i.wrapping_add(1); ADDRESS_LEN])
}

pub fn acc_addr(i: u8) -> AccAddress {
    AccAddress::from(val_addr(i))
}

pub fn cons_addr(i: u8) -> ConsAddress {
    ConsAddress::new([i.wrapping_add(0x80); ADDRESS_LEN])
}

pub fn time(unix_seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(unix_seconds, 0).unwrap_or_default()
}

/// Params with one-block vote periods and a 100-block slash window
pub fn params() -> Params {
    Params {
        vote_period: 1,
        slash_window: 100,
        ..Params::default()
    }
}

/// Context at `height`, with block time advancing by [`BLOCK_TIME_SECS`]
pub fn context(store: &mut dyn KvStore, height: u64) -> Context<'_> {
    let secs = i64::try_from(height).unwrap_or(i64::MAX).saturating_mul(BLOCK_TIME_SECS);
    context_at(store, height, secs)
}

pub fn context_at(store: &mut dyn KvStore, height: u64, unix_seconds: i64) -> Context<'_> {
    Context::new(store, BlockHeader::new(TEST_CHAIN_ID, height, time(unix_seconds)))
}

/// Keeper over `n` bonded validators of equal power
pub fn setup(n: u8, power: i64) -> (Keeper, Arc<MockStaking>) {
    let staking = Arc::new(MockStaking::with_validators(n, power));
    let keeper = Keeper::new(staking.clone(), staking.clone(), staking.clone());
    (keeper, staking)
}

/// One recorded slash call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashRecord {
    pub cons_address: ConsAddress,
    pub infraction_height: u64,
    pub power: i64,
    pub fraction: Dec,
}

#[derive(Debug, Default)]
struct MockState {
    validators: BTreeMap<ValAddress, ValidatorInfo>,
    max_validators: usize,
    slashes: Vec<SlashRecord>,
    metadata: BTreeMap<Denom, DenomMetadata>,
}

/// Staking, slashing and bank-metadata stand-in
#[derive(Debug, Default)]
pub struct MockStaking {
    state: RwLock<MockState>,
}

impl MockStaking {
    pub fn with_validators(n: u8, power: i64) -> Self {
        let staking = Self::default();
        staking.state.write().max_validators = 100;
        for i in 0..n {
            staking.add_validator(ValidatorInfo {
                operator: val_addr(i),
                cons_address: cons_addr(i),
                consensus_power: power,
                bonded: true,
                jailed: false,
            });
        }
        staking
    }

    pub fn add_validator(&self, info: ValidatorInfo) {
        self.state.write().validators.insert(info.operator, info);
    }

    fn update(&self, operator: &ValAddress, f: impl FnOnce(&mut ValidatorInfo)) {
        if let Some(info) = self.state.write().validators.get_mut(operator) {
            f(info);
        }
    }

    pub fn set_power(&self, operator: &ValAddress, power: i64) {
        self.update(operator, |v| v.consensus_power = power);
    }

    pub fn set_bonded(&self, operator: &ValAddress, bonded: bool) {
        self.update(operator, |v| v.bonded = bonded);
    }

    pub fn set_jailed(&self, operator: &ValAddress, jailed: bool) {
        self.update(operator, |v| v.jailed = jailed);
    }

    pub fn set_max_validators(&self, max: usize) {
        self.state.write().max_validators = max;
    }

    pub fn is_jailed(&self, operator: &ValAddress) -> bool {
        self.state
            .read()
            .validators
            .get(operator)
            .is_some_and(|v| v.jailed)
    }

    pub fn slashes(&self) -> Vec<SlashRecord> {
        self.state.read().slashes.clone()
    }

    pub fn metadata(&self, base: &str) -> Option<DenomMetadata> {
        self.state.read().metadata.get(base).cloned()
    }
}

impl ActiveValidatorProvider for MockStaking {
    fn validators_by_power(&self) -> Vec<ValidatorInfo> {
        let mut validators: Vec<_> = self.state.read().validators.values().cloned().collect();
        validators.sort_by(|a, b| {
            b.consensus_power
                .cmp(&a.consensus_power)
                .then_with(|| a.operator.cmp(&b.operator))
        });
        validators
    }

    fn validator(&self, operator: &ValAddress) -> Option<ValidatorInfo> {
        self.state.read().validators.get(operator).cloned()
    }

    fn total_bonded_power(&self) -> i64 {
        self.state
            .read()
            .validators
            .values()
            .filter(|v| v.bonded)
            .fold(0i64, |acc, v| acc.saturating_add(v.consensus_power))
    }

    fn max_validators(&self) -> usize {
        self.state.read().max_validators
    }
}

impl SlashingProvider for MockStaking {
    fn slash(&self, cons_address: &ConsAddress, infraction_height: u64, power: i64, fraction: Dec) {
        self.state.write().slashes.push(SlashRecord {
            cons_address: *cons_address,
            infraction_height,
            power,
            fraction,
        });
    }

    fn jail(&self, cons_address: &ConsAddress) {
        let mut state = self.state.write();
        if let Some(info) = state
            .validators
            .values_mut()
            .find(|v| v.cons_address == *cons_address)
        {
            info.jailed = true;
        }
    }
}

impl DenomMetadataRegistry for MockStaking {
    fn has_metadata(&self, base: &str) -> bool {
        self.state.read().metadata.contains_key(base)
    }

    fn register(&self, metadata: DenomMetadata) {
        self.state.write().metadata.insert(metadata.base.clone(), metadata);
    }
}
