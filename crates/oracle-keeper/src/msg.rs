//! Oracle transaction messages
//!
//! Messages arrive as text fields and are checked statelessly by
//! [`OracleMsg::validate_basic`] before any handler runs.

use oracle_core::prelude::*;
use serde::{Deserialize, Serialize};

fn check_salt(salt: &str) -> Result<()> {
    if salt.is_empty() || salt.len() > MAX_SALT_LEN {
        return Err(OracleError::InvalidSaltLength {
            actual: salt.len(),
            max: MAX_SALT_LEN,
        });
    }
    Ok(())
}

fn check_exchange_rates(exchange_rates: &str) -> Result<ExchangeRateTuples> {
    if exchange_rates.len() > MAX_EXCHANGE_RATES_LEN {
        return Err(OracleError::ExchangeRatesTooLong {
            actual: exchange_rates.len(),
            max: MAX_EXCHANGE_RATES_LEN,
        });
    }
    let tuples = ExchangeRateTuples::parse(exchange_rates)?;
    if tuples.is_empty() {
        return Err(OracleError::EmptyExchangeRates);
    }
    Ok(tuples)
}

/// Commit to a hash of the next reveal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgAggregateExchangeRatePrevote {
    /// Hex-encoded [`AggregateVoteHash`]
    pub hash: String,
    pub feeder: String,
    pub validator: String,
}

impl MsgAggregateExchangeRatePrevote {
    pub fn new(hash: AggregateVoteHash, feeder: AccAddress, validator: ValAddress) -> Self {
        Self {
            hash: hash.to_hex(),
            feeder: feeder.to_string(),
            validator: validator.to_string(),
        }
    }

    pub fn validate_basic(&self) -> Result<()> {
        AggregateVoteHash::from_hex(&self.hash)?;
        self.feeder.parse::<AccAddress>()?;
        self.validator.parse::<ValAddress>()?;
        Ok(())
    }
}

/// Reveal the rates committed one period earlier
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgAggregateExchangeRateVote {
    pub salt: String,
    /// Comma-separated `<rate><denom>` list
    pub exchange_rates: String,
    pub feeder: String,
    pub validator: String,
}

impl MsgAggregateExchangeRateVote {
    pub fn new(
        salt: impl Into<String>,
        exchange_rates: impl Into<String>,
        feeder: AccAddress,
        validator: ValAddress,
    ) -> Self {
        Self {
            salt: salt.into(),
            exchange_rates: exchange_rates.into(),
            feeder: feeder.to_string(),
            validator: validator.to_string(),
        }
    }

    pub fn validate_basic(&self) -> Result<()> {
        self.feeder.parse::<AccAddress>()?;
        self.validator.parse::<ValAddress>()?;
        check_exchange_rates(&self.exchange_rates)?;
        check_salt(&self.salt)
    }
}

/// Reveal for the previous period and commit for the next one
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgAggregateExchangeRateCombinedVote {
    pub vote_salt: String,
    pub vote_exchange_rates: String,
    pub prevote_hash: String,
    pub feeder: String,
    pub validator: String,
}

impl MsgAggregateExchangeRateCombinedVote {
    pub fn validate_basic(&self) -> Result<()> {
        self.feeder.parse::<AccAddress>()?;
        self.validator.parse::<ValAddress>()?;
        check_exchange_rates(&self.vote_exchange_rates)?;
        check_salt(&self.vote_salt)?;
        AggregateVoteHash::from_hex(&self.prevote_hash)?;
        Ok(())
    }

    /// The reveal half
    pub fn vote(&self) -> MsgAggregateExchangeRateVote {
        MsgAggregateExchangeRateVote {
            salt: self.vote_salt.clone(),
            exchange_rates: self.vote_exchange_rates.clone(),
            feeder: self.feeder.clone(),
            validator: self.validator.clone(),
        }
    }

    /// The commit half
    pub fn prevote(&self) -> MsgAggregateExchangeRatePrevote {
        MsgAggregateExchangeRatePrevote {
            hash: self.prevote_hash.clone(),
            feeder: self.feeder.clone(),
            validator: self.validator.clone(),
        }
    }
}

/// Let `delegate` vote on behalf of `operator`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDelegateFeedConsent {
    pub operator: String,
    pub delegate: String,
}

impl MsgDelegateFeedConsent {
    pub fn new(operator: ValAddress, delegate: AccAddress) -> Self {
        Self {
            operator: operator.to_string(),
            delegate: delegate.to_string(),
        }
    }

    pub fn validate_basic(&self) -> Result<()> {
        self.operator.parse::<ValAddress>()?;
        self.delegate.parse::<AccAddress>()?;
        Ok(())
    }
}

/// Any oracle transaction message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OracleMsg {
    Prevote(MsgAggregateExchangeRatePrevote),
    Vote(MsgAggregateExchangeRateVote),
    CombinedVote(MsgAggregateExchangeRateCombinedVote),
    DelegateFeedConsent(MsgDelegateFeedConsent),
}

impl OracleMsg {
    pub fn validate_basic(&self) -> Result<()> {
        match self {
            Self::Prevote(msg) => msg.validate_basic(),
            Self::Vote(msg) => msg.validate_basic(),
            Self::CombinedVote(msg) => msg.validate_basic(),
            Self::DelegateFeedConsent(msg) => msg.validate_basic(),
        }
    }

    /// Account that must sign the message
    pub fn signer(&self) -> &str {
        match self {
            Self::Prevote(msg) => &msg.feeder,
            Self::Vote(msg) => &msg.feeder,
            Self::CombinedVote(msg) => &msg.feeder,
            Self::DelegateFeedConsent(msg) => &msg.operator,
        }
    }

    /// Message type name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Prevote(_) => "aggregate_exchange_rate_prevote",
            Self::Vote(_) => "aggregate_exchange_rate_vote",
            Self::CombinedVote(_) => "aggregate_exchange_rate_combined_vote",
            Self::DelegateFeedConsent(_) => "delegate_feed_consent",
        }
    }
}

impl From<MsgAggregateExchangeRatePrevote> for OracleMsg {
    fn from(msg: MsgAggregateExchangeRatePrevote) -> Self {
        Self::Prevote(msg)
    }
}

impl From<MsgAggregateExchangeRateVote> for OracleMsg {
    fn from(msg: MsgAggregateExchangeRateVote) -> Self {
        Self::Vote(msg)
    }
}

impl From<MsgAggregateExchangeRateCombinedVote> for OracleMsg {
    fn from(msg: MsgAggregateExchangeRateCombinedVote) -> Self {
        Self::CombinedVote(msg)
    }
}

impl From<MsgDelegateFeedConsent> for OracleMsg {
    fn from(msg: MsgDelegateFeedConsent) -> Self {
        Self::DelegateFeedConsent(msg)
    }
}
