//! # Oracle Node
//!
//! Block execution for the oracle module: configuration, logging, the
//! end-of-block round controller and an in-process devnet.

pub mod config;
pub mod devnet;
pub mod end_blocker;
pub mod logging;
pub mod node;

pub use config::NodeConfig;
pub use devnet::{Devnet, DevnetReport, DevnetValidators};
pub use end_blocker::{end_blocker, is_period_last_block};
pub use logging::init_logging;
pub use node::{Block, BlockResult, MsgResult, OracleNode, QueryHandle};
