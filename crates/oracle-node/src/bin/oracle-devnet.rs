//! Oracle devnet
//!
//! Runs a local validator set against the oracle module and prints the
//! resulting prices, TWAPs and penalty state as JSON.

use chrono::Utc;
use clap::Parser;
use oracle_node::{init_logging, Devnet, NodeConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oracle-devnet")]
#[command(version = "0.1.0")]
#[command(about = "Simulate oracle voting rounds on a local validator set", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ORACLE_CONFIG")]
    config: Option<PathBuf>,

    /// Blocks to run, overriding the configuration
    #[arg(short, long)]
    blocks: Option<u64>,

    /// Number of validators, overriding the configuration
    #[arg(long)]
    validators: Option<u8>,

    /// Validators that never vote
    #[arg(long)]
    absent: Option<u8>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = NodeConfig::load(cli.config.as_deref())?;
    if let Some(blocks) = cli.blocks {
        config.devnet.blocks = blocks;
    }
    if let Some(validators) = cli.validators {
        config.devnet.validators = validators;
    }
    if let Some(absent) = cli.absent {
        config.devnet.absent_validators = absent;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    init_logging(&config.logging)?;
    tracing::info!(
        chain_id = %config.node.chain_id,
        validators = config.devnet.validators,
        blocks = config.devnet.blocks,
        "Starting oracle devnet"
    );

    let mut devnet = Devnet::new(config, Utc::now())?;
    let report = devnet.run()?;

    tracing::info!(
        height = report.last_height,
        accepted = report.accepted_msgs,
        rejected = report.rejected_msgs,
        slashes = report.slashes.len(),
        "Devnet finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
