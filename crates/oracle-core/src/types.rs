//! Core type definitions for the oracle
//!
//! Addresses, denoms, exchange-rate tuples and the records persisted by the
//! oracle keeper.

use crate::decimal::Dec;
use crate::error::{OracleError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Byte length of every account, operator and consensus address
pub const ADDRESS_LEN: usize = 20;

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        pub struct $name([u8; ADDRESS_LEN]);

        impl $name {
            pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parse from a 40-character hex string
            pub fn from_hex(s: &str) -> Result<Self> {
                let bytes = hex::decode(s).map_err(|_| OracleError::InvalidAddress(s.to_string()))?;
                let bytes: [u8; ADDRESS_LEN] = bytes
                    .try_into()
                    .map_err(|_| OracleError::InvalidAddress(s.to_string()))?;
                Ok(Self(bytes))
            }
        }

        impl From<[u8; ADDRESS_LEN]> for $name {
            fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
                Self(bytes)
            }
        }

        impl FromStr for $name {
            type Err = OracleError;

            fn from_str(s: &str) -> Result<Self> {
                Self::from_hex(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.to_hex()[..12])
            }
        }
    };
}

address_type!(
    /// Account address (transaction signer, feeder)
    AccAddress
);

address_type!(
    /// Validator operator address
    ValAddress
);

address_type!(
    /// Validator consensus address (slashing/jailing key)
    ConsAddress
);

impl From<ValAddress> for AccAddress {
    fn from(val: ValAddress) -> Self {
        Self(val.0)
    }
}

impl From<AccAddress> for ValAddress {
    fn from(acc: AccAddress) -> Self {
        Self(acc.0)
    }
}

// ============================================================================
// Denoms
// ============================================================================

/// Asset identifier, e.g. `uatom`
pub type Denom = String;

/// Check `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`
pub fn validate_denom(denom: &str) -> Result<()> {
    let bytes = denom.as_bytes();
    let valid_len = (3..=128).contains(&bytes.len());
    let valid_head = bytes.first().is_some_and(|b| b.is_ascii_alphabetic());
    let valid_tail = bytes
        .iter()
        .skip(1)
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b':' | b'.' | b'_' | b'-'));

    if valid_len && valid_head && valid_tail {
        Ok(())
    } else {
        Err(OracleError::InvalidDenom(denom.to_string()))
    }
}

// ============================================================================
// Exchange Rate Tuples
// ============================================================================

/// One `(denom, rate)` pair of a vote
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRateTuple {
    pub denom: Denom,
    pub exchange_rate: Dec,
}

impl ExchangeRateTuple {
    pub fn new(denom: impl Into<Denom>, exchange_rate: Dec) -> Self {
        Self {
            denom: denom.into(),
            exchange_rate,
        }
    }
}

impl fmt::Display for ExchangeRateTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.exchange_rate, self.denom)
    }
}

impl FromStr for ExchangeRateTuple {
    type Err = OracleError;

    /// Parse `"<decimal><denom>"`, e.g. `"1700.5uatom"`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_ascii_alphabetic())
            .ok_or_else(|| OracleError::InvalidExchangeRate(s.to_string()))?;
        let (amount, denom) = s.split_at(split);
        if amount.is_empty() {
            return Err(OracleError::InvalidExchangeRate(s.to_string()));
        }

        let exchange_rate: Dec = amount
            .parse()
            .map_err(|_| OracleError::InvalidExchangeRate(s.to_string()))?;
        if exchange_rate.is_negative() {
            return Err(OracleError::InvalidExchangeRate(s.to_string()));
        }
        validate_denom(denom)?;

        Ok(Self::new(denom, exchange_rate))
    }
}

/// Ordered list of rate tuples, as submitted in a reveal
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRateTuples(Vec<ExchangeRateTuple>);

impl ExchangeRateTuples {
    pub fn new(tuples: Vec<ExchangeRateTuple>) -> Self {
        Self(tuples)
    }

    /// Parse a comma-separated tuple list; the empty string yields no tuples
    pub fn parse(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut seen = BTreeSet::new();
        let mut tuples = Vec::new();
        for part in s.split(',') {
            let tuple: ExchangeRateTuple = part.parse()?;
            if !seen.insert(tuple.denom.clone()) {
                return Err(OracleError::DuplicateDenom(tuple.denom));
            }
            tuples.push(tuple);
        }

        Ok(Self(tuples))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExchangeRateTuple> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<ExchangeRateTuple> {
        self.0
    }
}

impl fmt::Display for ExchangeRateTuples {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tuple) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", tuple)?;
        }
        Ok(())
    }
}

impl FromStr for ExchangeRateTuples {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ============================================================================
// Persisted Records
// ============================================================================

/// Canonical price of a denom
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleExchangeRate {
    pub exchange_rate: Dec,
    /// Height of the block that wrote the rate
    pub last_update: i64,
    /// Block time of that write, Unix milliseconds
    pub last_update_timestamp: i64,
}

/// Commit half of the commit-reveal vote
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateExchangeRatePrevote {
    pub hash: crate::hash::AggregateVoteHash,
    pub voter: ValAddress,
    pub submit_block: u64,
}

/// Reveal half of the commit-reveal vote
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateExchangeRateVote {
    pub exchange_rate_tuples: ExchangeRateTuples,
    pub voter: ValAddress,
}

/// Per-validator participation counters for the current slash window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePenaltyCounter {
    pub miss_count: u64,
    pub abstain_count: u64,
    pub success_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshotItem {
    pub denom: Denom,
    pub oracle_exchange_rate: OracleExchangeRate,
}

/// All stored prices at one point in time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// Unix seconds
    pub snapshot_timestamp: i64,
    pub price_snapshot_items: Vec<PriceSnapshotItem>,
}

/// Time-weighted average price of one denom
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleTwap {
    pub denom: Denom,
    pub twap: Dec,
    /// Seconds actually covered by snapshot data
    pub lookback_seconds: i64,
}

// ============================================================================
// Denom Metadata
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenomUnit {
    pub denom: Denom,
    pub exponent: u32,
    pub aliases: Vec<String>,
}

/// Display metadata registered for a vote target
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenomMetadata {
    pub description: String,
    pub denom_units: Vec<DenomUnit>,
    pub base: Denom,
    pub display: String,
    pub name: String,
    pub symbol: String,
}

impl DenomMetadata {
    /// Metadata for a micro-denom `u<x>`: units `u<x>` (0), `m<x>` (3), `<x>` (6)
    pub fn for_micro_denom(base: &str) -> Self {
        let display = base.strip_prefix('u').unwrap_or(base).to_string();
        let unit = |denom: String, exponent: u32| DenomUnit {
            denom,
            exponent,
            aliases: Vec::new(),
        };

        Self {
            description: format!("The native staking token of {}", display),
            denom_units: vec![
                unit(base.to_string(), 0),
                unit(format!("m{}", display), 3),
                unit(display.clone(), 6),
            ],
            base: base.to_string(),
            display: display.clone(),
            name: display.to_uppercase(),
            symbol: display.to_uppercase(),
        }
    }
}
