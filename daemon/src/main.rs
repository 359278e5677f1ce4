//! Tessera daemon: entry point for replaying and inspecting ledgers.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::info;

use tessera_ledger::{LedgerState, LedgerSummary, PersistedLedger};
use tessera_node::{
    init_logging, spawn_worker, DirectSource, EventBus, GenesisOverride, LedgerEvent, LogFormat,
    NodeConfig, NodeController, NodeState, TokioSleeper,
};
use tessera_types::{NetworkId, RawBlock, TxId};

#[derive(Parser)]
#[command(name = "tessera-daemon", about = "Tessera ledger derivation engine")]
struct Cli {
    /// Path to a TOML configuration file. CLI flags and env vars override
    /// its settings.
    #[arg(long, global = true, env = "TESSERA_CONFIG")]
    config: Option<PathBuf>,

    /// Network: "mainnet", "testnet" or "regtest".
    #[arg(long, global = true, env = "TESSERA_NETWORK")]
    network: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, global = true, env = "TESSERA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, global = true, env = "TESSERA_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Parse a JSON dump of raw blocks as a full node and print the result.
    Replay {
        /// JSON array of raw blocks, in height order.
        #[arg(long)]
        blocks: PathBuf,

        /// Genesis transaction id (hex), replacing the network's.
        #[arg(long)]
        genesis_tx: Option<String>,

        /// Genesis block height, replacing the network's.
        #[arg(long)]
        genesis_height: Option<u32>,

        /// Write the resulting ledger to this file.
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Print the summary and state hash of a saved ledger.
    Inspect {
        #[arg(long)]
        snapshot: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct LedgerReport {
    network: NetworkId,
    chain_height: u32,
    state_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    recent_blocks_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stale: Option<bool>,
    summary: LedgerSummary,
}

impl LedgerReport {
    fn new(ledger: &LedgerState) -> Self {
        Self {
            network: ledger.network(),
            chain_height: ledger.chain_height(),
            state_hash: hex::encode(ledger.state_hash()),
            recent_blocks_hash: None,
            stale: None,
            summary: ledger.summary(),
        }
    }

    fn from_controller(controller: &NodeController) -> Self {
        Self {
            recent_blocks_hash: Some(hex::encode(controller.recent_blocks_hash())),
            stale: Some(controller.is_stale()),
            ..Self::new(controller.ledger())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);

    let report = match cli.command {
        Command::Replay {
            blocks,
            genesis_tx,
            genesis_height,
            save,
        } => {
            apply_genesis_override(&mut config, genesis_tx.as_deref(), genesis_height)?;
            replay(&config, &blocks, save.as_deref()).await?
        }
        Command::Inspect { snapshot } => inspect(&snapshot)?,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = NodeConfig::from_toml_file(path)?;
            info!(path = %path.display(), "loaded config");
            config
        }
        None => NodeConfig::default(),
    };
    if let Some(network) = &cli.network {
        config.network = network.parse()?;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.parse::<LogFormat>().map_err(anyhow::Error::msg)?;
    }
    Ok(config)
}

fn apply_genesis_override(
    config: &mut NodeConfig,
    tx_id: Option<&str>,
    height: Option<u32>,
) -> anyhow::Result<()> {
    if tx_id.is_none() && height.is_none() {
        return Ok(());
    }
    let current = config.genesis_info();
    let tx_id = match tx_id {
        Some(hex) => hex.parse::<TxId>().context("invalid genesis tx id")?,
        None => current.tx_id,
    };
    config.genesis = Some(GenesisOverride {
        tx_id,
        block_height: height.unwrap_or(current.block_height),
    });
    Ok(())
}

async fn replay(config: &NodeConfig, path: &Path, save: Option<&Path>) -> anyhow::Result<LedgerReport> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading block dump {}", path.display()))?;
    let blocks: Vec<RawBlock> = serde_json::from_str(&contents).context("parsing block dump")?;
    info!(blocks = blocks.len(), network = %config.network, "replaying block dump");

    let mut bus = EventBus::new();
    bus.subscribe(Box::new(|event| {
        if let LedgerEvent::GovernanceRecord(record) = event {
            info!(
                tx_id = %record.tx_id,
                height = record.block_height,
                tx_type = ?record.tx_type,
                "governance record"
            );
        }
    }));
    let controller = NodeController::new(config, Box::new(bus));
    let handle = spawn_worker(controller, DirectSource::new(blocks), TokioSleeper, 64);
    let mut status = handle.status();
    status
        .wait_for(|s| s.state == NodeState::CaughtUp || s.stale)
        .await
        .context("ledger worker stopped early")?;
    let controller = handle.shutdown().await?;

    if let Some(save) = save {
        PersistedLedger::new(controller.snapshot()).save(save)?;
        info!(path = %save.display(), "ledger saved");
    }
    Ok(LedgerReport::from_controller(&controller))
}

fn inspect(path: &Path) -> anyhow::Result<LedgerReport> {
    let persisted = PersistedLedger::load(path)?
        .with_context(|| format!("no ledger at {}", path.display()))?;
    Ok(LedgerReport::new(&persisted.state))
}
