//! Interfaces of the modules the oracle depends on
//!
//! The oracle never owns validator stake or bank metadata; it reads the
//! active set and asks for slashes through these traits.

use oracle_core::decimal::Dec;
use oracle_core::types::{ConsAddress, DenomMetadata, ValAddress};

/// Staking view of one validator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorInfo {
    pub operator: ValAddress,
    pub cons_address: ConsAddress,
    pub consensus_power: i64,
    pub bonded: bool,
    pub jailed: bool,
}

pub trait ActiveValidatorProvider: Send + Sync {
    /// Validators in descending power order
    fn validators_by_power(&self) -> Vec<ValidatorInfo>;

    fn validator(&self, operator: &ValAddress) -> Option<ValidatorInfo>;

    fn total_bonded_power(&self) -> i64;

    fn max_validators(&self) -> usize;
}

pub trait SlashingProvider: Send + Sync {
    /// Slash `fraction` of the stake that was bonded at `infraction_height`
    fn slash(&self, cons_address: &ConsAddress, infraction_height: u64, power: i64, fraction: Dec);

    fn jail(&self, cons_address: &ConsAddress);
}

pub trait DenomMetadataRegistry: Send + Sync {
    fn has_metadata(&self, base: &str) -> bool;

    fn register(&self, metadata: DenomMetadata);
}
