//! Oracle node runtime
//!
//! Owns the committed store and applies blocks to it. Every message runs in
//! its own cache layer and is committed only if it succeeds; the round
//! controller runs last, in one layer for the whole boundary.

use crate::config::NodeConfig;
use crate::end_blocker::end_blocker;
use chrono::{DateTime, Utc};
use oracle_core::prelude::*;
use oracle_keeper::{
    BlockHeader, Context, ExecMode, Keeper, MsgServer, OracleMsg, Querier, SpamPreventionDecorator,
};
use oracle_storage::{CacheStore, MemStore};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Block proposed for execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub time: DateTime<Utc>,
    pub msgs: Vec<OracleMsg>,
}

impl Block {
    pub fn new(height: u64, time: DateTime<Utc>) -> Self {
        Self {
            height,
            time,
            msgs: Vec::new(),
        }
    }

    pub fn with_msg(mut self, msg: impl Into<OracleMsg>) -> Self {
        self.msgs.push(msg.into());
        self
    }
}

/// Outcome of one message
#[derive(Clone, Debug)]
pub struct MsgResult {
    pub msg_type: &'static str,
    pub result: Result<()>,
    pub events: Vec<OracleEvent>,
}

impl MsgResult {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcome of one block
#[derive(Clone, Debug)]
pub struct BlockResult {
    pub height: u64,
    pub msg_results: Vec<MsgResult>,
    /// Events emitted by the round controller
    pub end_block_events: Vec<OracleEvent>,
}

impl BlockResult {
    pub fn failed(&self) -> usize {
        self.msg_results.iter().filter(|r| !r.is_ok()).count()
    }
}

/// Read access to committed state, safe to share across threads
#[derive(Clone)]
pub struct QueryHandle {
    store: Arc<RwLock<MemStore>>,
    header: Arc<RwLock<BlockHeader>>,
    querier: Querier,
}

impl QueryHandle {
    /// Run `f` against the last committed state
    ///
    /// Writes made through the context are discarded.
    pub fn query<T>(&self, f: impl FnOnce(&Querier, &Context<'_>) -> Result<T>) -> Result<T> {
        let store = self.store.read();
        let mut cache = CacheStore::new(&*store);
        let ctx = Context::new(&mut cache, self.header.read().clone());
        f(&self.querier, &ctx)
    }

    pub fn last_height(&self) -> u64 {
        self.header.read().height
    }
}

/// Single-writer oracle node
pub struct OracleNode {
    config: NodeConfig,
    keeper: Keeper,
    msg_server: MsgServer,
    ante: SpamPreventionDecorator,
    store: Arc<RwLock<MemStore>>,
    /// Header of the last committed block
    header: Arc<RwLock<BlockHeader>>,
    queries: QueryHandle,
}

impl OracleNode {
    /// Create a node and write genesis state at height 0
    pub fn new(config: NodeConfig, keeper: Keeper, genesis_time: DateTime<Utc>) -> Result<Self> {
        let header = BlockHeader::new(config.node.chain_id.clone(), 0, genesis_time);
        let mut store = MemStore::new();
        {
            let mut ctx = Context::new(&mut store, header.clone());
            keeper.initialize(&mut ctx, config.oracle.clone())?;
        }

        let store = Arc::new(RwLock::new(store));
        let header = Arc::new(RwLock::new(header));
        let queries = QueryHandle {
            store: store.clone(),
            header: header.clone(),
            querier: Querier::new(keeper.clone()),
        };

        tracing::info!(
            chain_id = %config.node.chain_id,
            node = %config.node.name,
            vote_period = config.oracle.vote_period,
            "Oracle node initialized"
        );

        Ok(Self {
            msg_server: MsgServer::new(keeper.clone()),
            ante: SpamPreventionDecorator::new(keeper.clone()),
            keeper,
            config,
            store,
            header,
            queries,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn keeper(&self) -> &Keeper {
        &self.keeper
    }

    pub fn query_handle(&self) -> QueryHandle {
        self.queries.clone()
    }

    pub fn query<T>(&self, f: impl FnOnce(&Querier, &Context<'_>) -> Result<T>) -> Result<T> {
        self.queries.query(f)
    }

    pub fn last_height(&self) -> u64 {
        self.header.read().height
    }

    /// Mempool admission of a transaction's messages
    pub fn check_tx(&self, msgs: &[OracleMsg]) -> Result<()> {
        for msg in msgs {
            msg.validate_basic()?;
        }

        let store = self.store.read();
        let mut cache = CacheStore::new(&*store);
        let ctx = Context::new(&mut cache, self.header.read().clone()).with_mode(ExecMode::Check);
        self.ante.ante_handle(&ctx, msgs)
    }

    /// Execute and commit one block
    ///
    /// Heights must increase past the last committed one and block time may
    /// not go backwards. Failed messages are reported and leave no trace in
    /// the store. Messages and the round controller share one block layer,
    /// so an error from the round controller aborts the whole block.
    pub fn deliver_block(&self, block: &Block) -> Result<BlockResult> {
        let last = self.header.read().clone();
        if block.height <= last.height {
            return Err(OracleError::Internal(format!(
                "block height {} does not follow committed height {}",
                block.height, last.height
            )));
        }
        if block.time < last.time {
            return Err(OracleError::Internal(format!(
                "block time {} precedes committed time {}",
                block.time, last.time
            )));
        }

        let header = BlockHeader::new(self.config.node.chain_id.clone(), block.height, block.time);
        let mut store = self.store.write();
        let mut block_cache = CacheStore::new(&*store);
        let mut msg_results = Vec::with_capacity(block.msgs.len());

        for msg in &block.msgs {
            let mut cache = CacheStore::new(&block_cache);
            let result = {
                let mut ctx = Context::new(&mut cache, header.clone());
                self.msg_server
                    .handle(&mut ctx, msg)
                    .map(|()| ctx.take_events())
            };

            match result {
                Ok(events) => {
                    cache.into_change_set().apply(&mut block_cache);
                    msg_results.push(MsgResult {
                        msg_type: msg.name(),
                        result: Ok(()),
                        events,
                    });
                }
                Err(e) => {
                    tracing::debug!(
                        height = block.height,
                        msg = msg.name(),
                        code = e.code(),
                        error = %e,
                        "Message rejected"
                    );
                    msg_results.push(MsgResult {
                        msg_type: msg.name(),
                        result: Err(e),
                        events: Vec::new(),
                    });
                }
            }
        }

        let end_block_events = {
            let mut ctx = Context::new(&mut block_cache, header.clone());
            if let Err(e) = end_blocker(&self.keeper, &mut ctx) {
                tracing::error!(height = block.height, error = %e, "Round controller failed");
                return Err(e);
            }
            ctx.take_events()
        };
        let changes = block_cache.into_change_set();
        changes.apply(&mut *store);

        *self.header.write() = header;
        tracing::debug!(
            height = block.height,
            msgs = msg_results.len(),
            events = end_block_events.len(),
            "Block committed"
        );

        Ok(BlockResult {
            height: block.height,
            msg_results,
            end_block_events,
        })
    }
}
