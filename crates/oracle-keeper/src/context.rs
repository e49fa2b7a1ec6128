//! Per-block execution context

use chrono::{DateTime, Utc};
use oracle_core::events::OracleEvent;
use oracle_storage::KvStore;
use serde::{Deserialize, Serialize};

/// Header of the block being executed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub chain_id: String,
    pub height: u64,
    pub time: DateTime<Utc>,
}

impl BlockHeader {
    pub fn new(chain_id: impl Into<String>, height: u64, time: DateTime<Utc>) -> Self {
        Self {
            chain_id: chain_id.into(),
            height,
            time,
        }
    }
}

/// How the current message is being executed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecMode {
    /// Mempool admission
    Check,
    /// Mempool re-admission after a commit
    ReCheck,
    /// Gas estimation
    Simulate,
    /// Block execution
    #[default]
    Deliver,
}

/// Store handle, block header and event sink for one unit of execution
pub struct Context<'a> {
    store: &'a mut dyn KvStore,
    header: BlockHeader,
    mode: ExecMode,
    events: Vec<OracleEvent>,
}

impl<'a> Context<'a> {
    pub fn new(store: &'a mut dyn KvStore, header: BlockHeader) -> Self {
        Self {
            store,
            header,
            mode: ExecMode::Deliver,
            events: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: ExecMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn block_height(&self) -> u64 {
        self.header.height
    }

    pub fn block_time(&self) -> DateTime<Utc> {
        self.header.time
    }

    /// Block time in Unix seconds
    pub fn unix_seconds(&self) -> i64 {
        self.header.time.timestamp()
    }

    /// Block time in Unix milliseconds
    pub fn unix_millis(&self) -> i64 {
        self.header.time.timestamp_millis()
    }

    pub fn mode(&self) -> ExecMode {
        self.mode
    }

    pub fn store(&self) -> &dyn KvStore {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut dyn KvStore {
        &mut *self.store
    }

    pub fn emit(&mut self, event: OracleEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[OracleEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<OracleEvent> {
        std::mem::take(&mut self.events)
    }

    /// Same context at another height and time
    pub fn set_header(&mut self, height: u64, time: DateTime<Utc>) {
        self.header.height = height;
        self.header.time = time;
    }
}
