//! # Oracle Storage
//!
//! Ordered key/value state for the oracle module.
//!
//! ## Storage Layout
//!
//! | prefix | key | value |
//! |--------|-----|-------|
//! | `0x01` | denom | `OracleExchangeRate` |
//! | `0x02` | operator | feeder `AccAddress` |
//! | `0x03` | operator | `VotePenaltyCounter` |
//! | `0x04` | operator | `AggregateExchangeRatePrevote` |
//! | `0x05` | operator | `AggregateExchangeRateVote` |
//! | `0x06` | denom | vote-target marker |
//! | `0x07` | - | `Vec<PriceSnapshot>` history blob |
//! | `0x08` | - | `Params` |
//!
//! - `kv` - store trait and the committed in-memory store
//! - `cache` - write overlay used to roll back a failed message
//! - `keys` - key construction and decoding
//! - `codec` - bincode value encoding

pub mod kv {
    //! Store trait and committed in-memory store

    use std::collections::BTreeMap;

    /// Ordered byte-keyed store
    pub trait KvStore {
        fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

        fn set(&mut self, key: Vec<u8>, value: Vec<u8>);

        fn delete(&mut self, key: &[u8]);

        /// All entries whose key starts with `prefix`, in key order
        fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;

        fn has(&self, key: &[u8]) -> bool {
            self.get(key).is_some()
        }
    }

    /// BTreeMap-backed store holding committed state
    #[derive(Clone, Debug, Default)]
    pub struct MemStore {
        data: BTreeMap<Vec<u8>, Vec<u8>>,
    }

    impl MemStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn len(&self) -> usize {
            self.data.len()
        }

        pub fn is_empty(&self) -> bool {
            self.data.is_empty()
        }
    }

    impl KvStore for MemStore {
        fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
            self.data.get(key).cloned()
        }

        fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
            self.data.insert(key, value);
        }

        fn delete(&mut self, key: &[u8]) {
            self.data.remove(key);
        }

        fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
            self.data
                .range(prefix.to_vec()..)
                .take_while(|(k, _)| k.starts_with(prefix))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        }
    }
}

pub mod cache {
    //! Write overlay over a parent store
    //!
    //! A message executes against a `CacheStore`; on success its
    //! `ChangeSet` is written to the parent, on failure it is dropped.

    use crate::kv::KvStore;
    use std::collections::BTreeMap;

    /// Pending writes; `None` marks a deletion
    #[derive(Clone, Debug, Default)]
    pub struct ChangeSet {
        writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    }

    impl ChangeSet {
        pub fn len(&self) -> usize {
            self.writes.len()
        }

        pub fn is_empty(&self) -> bool {
            self.writes.is_empty()
        }

        /// Write every pending change to `store`
        pub fn apply(self, store: &mut dyn KvStore) {
            tracing::trace!(changes = self.writes.len(), "Applying change set");
            for (key, value) in self.writes {
                match value {
                    Some(value) => store.set(key, value),
                    None => store.delete(&key),
                }
            }
        }
    }

    pub struct CacheStore<'a> {
        parent: &'a dyn KvStore,
        changes: ChangeSet,
    }

    impl<'a> CacheStore<'a> {
        pub fn new(parent: &'a dyn KvStore) -> Self {
            Self {
                parent,
                changes: ChangeSet::default(),
            }
        }

        pub fn into_change_set(self) -> ChangeSet {
            self.changes
        }
    }

    impl KvStore for CacheStore<'_> {
        fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
            match self.changes.writes.get(key) {
                Some(pending) => pending.clone(),
                None => self.parent.get(key),
            }
        }

        fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
            self.changes.writes.insert(key, Some(value));
        }

        fn delete(&mut self, key: &[u8]) {
            self.changes.writes.insert(key.to_vec(), None);
        }

        fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
            let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
                self.parent.scan_prefix(prefix).into_iter().collect();
            for (key, pending) in self
                .changes
                .writes
                .range(prefix.to_vec()..)
                .take_while(|(k, _)| k.starts_with(prefix))
            {
                match pending {
                    Some(value) => {
                        merged.insert(key.clone(), value.clone());
                    }
                    None => {
                        merged.remove(key);
                    }
                }
            }
            merged.into_iter().collect()
        }
    }
}

pub mod keys {
    //! Key construction and decoding

    use oracle_core::types::{ValAddress, ADDRESS_LEN};

    pub const EXCHANGE_RATE_PREFIX: u8 = 0x01;
    pub const FEEDER_DELEGATION_PREFIX: u8 = 0x02;
    pub const VOTE_PENALTY_COUNTER_PREFIX: u8 = 0x03;
    pub const AGGREGATE_PREVOTE_PREFIX: u8 = 0x04;
    pub const AGGREGATE_VOTE_PREFIX: u8 = 0x05;
    pub const VOTE_TARGET_PREFIX: u8 = 0x06;
    pub const PRICE_SNAPSHOT_KEY: u8 = 0x07;
    pub const PARAMS_KEY: u8 = 0x08;

    fn prefixed(prefix: u8, body: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(1 + body.len());
        key.push(prefix);
        key.extend_from_slice(body);
        key
    }

    pub fn exchange_rate_key(denom: &str) -> Vec<u8> {
        prefixed(EXCHANGE_RATE_PREFIX, denom.as_bytes())
    }

    pub fn feeder_delegation_key(operator: &ValAddress) -> Vec<u8> {
        prefixed(FEEDER_DELEGATION_PREFIX, operator.as_bytes())
    }

    pub fn vote_penalty_counter_key(operator: &ValAddress) -> Vec<u8> {
        prefixed(VOTE_PENALTY_COUNTER_PREFIX, operator.as_bytes())
    }

    pub fn aggregate_prevote_key(operator: &ValAddress) -> Vec<u8> {
        prefixed(AGGREGATE_PREVOTE_PREFIX, operator.as_bytes())
    }

    pub fn aggregate_vote_key(operator: &ValAddress) -> Vec<u8> {
        prefixed(AGGREGATE_VOTE_PREFIX, operator.as_bytes())
    }

    pub fn vote_target_key(denom: &str) -> Vec<u8> {
        prefixed(VOTE_TARGET_PREFIX, denom.as_bytes())
    }

    pub fn price_snapshot_key() -> Vec<u8> {
        vec![PRICE_SNAPSHOT_KEY]
    }

    pub fn params_key() -> Vec<u8> {
        vec![PARAMS_KEY]
    }

    /// Denom suffix of an exchange-rate or vote-target key
    pub fn denom_from_key(key: &[u8]) -> Option<String> {
        key.get(1..)
            .and_then(|body| std::str::from_utf8(body).ok())
            .map(str::to_string)
    }

    /// Operator suffix of a validator-keyed entry
    pub fn val_address_from_key(key: &[u8]) -> Option<ValAddress> {
        let body: [u8; ADDRESS_LEN] = key.get(1..)?.try_into().ok()?;
        Some(ValAddress::new(body))
    }
}

pub mod codec {
    //! Bincode value encoding

    use oracle_core::error::{OracleError, Result};
    use serde::de::DeserializeOwned;
    use serde::Serialize;

    pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| OracleError::Serialization(e.to_string()))
    }

    pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| OracleError::Serialization(e.to_string()))
    }
}

// Re-export for convenience
pub use cache::{CacheStore, ChangeSet};
pub use kv::{KvStore, MemStore};
