//! Events emitted by oracle state transitions

use serde::{Deserialize, Serialize};

pub mod event_types {
    pub const EXCHANGE_RATE_UPDATE: &str = "exchange_rate_update";
    pub const AGGREGATE_PREVOTE: &str = "aggregate_prevote";
    pub const AGGREGATE_VOTE: &str = "aggregate_vote";
    pub const FEED_DELEGATE: &str = "feed_delegate";
    pub const ORACLE_SLASH: &str = "oracle_slash";
}

pub mod attribute_keys {
    pub const DENOM: &str = "denom";
    pub const EXCHANGE_RATE: &str = "exchange_rate";
    pub const EXCHANGE_RATES: &str = "exchange_rates";
    pub const VOTER: &str = "voter";
    pub const OPERATOR: &str = "operator";
    pub const FEEDER: &str = "feeder";
    pub const VALIDATOR: &str = "validator";
    pub const FRACTION: &str = "fraction";
    pub const JAILED: &str = "jailed";
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
}

/// Typed key/value event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleEvent {
    pub kind: String,
    pub attributes: Vec<EventAttribute>,
}

impl OracleEvent {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.push(EventAttribute {
            key: key.into(),
            value: value.to_string(),
        });
        self
    }

    /// First value stored under `key`
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}
