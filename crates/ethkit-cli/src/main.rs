//! # ethkit
//!
//! Command-line client for Ethereum-compatible nodes.
//!
//! ## Usage
//!
//! ```bash
//! export ETHKIT_PRIVATE_KEY=0x...
//!
//! # Value transfer
//! ethkit transfer --to 0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d --amount 0.001
//!
//! # Counter contract
//! ethkit counter deploy
//! ethkit counter increment 0x5FbDB2315678afecb367f032d93F642f64180aa3
//! ethkit counter count 0x5FbDB2315678afecb367f032d93F642f64180aa3
//! ethkit counter watch 0x5FbDB2315678afecb367f032d93F642f64180aa3 --from-block 0
//!
//! # Queries
//! ethkit query block latest
//! ethkit query balance 0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266
//! ethkit query chain-id
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod error;
mod output;

pub use config::Config;
pub use error::CliError;
pub use output::Output;

use commands::Session;

/// ethkit CLI
#[derive(Parser, Debug)]
#[command(name = "ethkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// RPC endpoint URL
    #[arg(long, global = true, env = "ETHKIT_RPC_URL")]
    rpc_url: Option<String>,

    /// Expected chain id
    #[arg(long, global = true)]
    chain_id: Option<u64>,

    /// Private key (hex)
    #[arg(long, global = true, env = "ETHKIT_PRIVATE_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Config file (default: ~/.ethkit/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// CLI commands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Send ether
    Transfer(commands::transfer::TransferArgs),
    /// Query chain state
    #[command(subcommand)]
    Query(commands::query::QueryCommand),
    /// Deploy and use the Counter contract
    #[command(subcommand)]
    Counter(commands::counter::CounterCommand),
    /// Show or edit configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Set RPC URL
        #[arg(long)]
        set_rpc: Option<String>,
        /// Set expected chain id
        #[arg(long)]
        set_chain_id: Option<u64>,
    },
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    let json = cli.json;
    if let Err(e) = run(cli).await {
        if json {
            println!(
                "{}",
                serde_json::json!({
                    "error": format!("{e:#}"),
                    "success": false
                })
            );
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();
    let mut config = Config::load(config_path).context("loading configuration")?;

    if let Commands::Config {
        show,
        set_rpc,
        set_chain_id,
    } = cli.command
    {
        return Ok(handle_config(
            &mut config,
            config_path,
            show,
            set_rpc,
            set_chain_id,
            cli.json,
        )?);
    }

    if let Some(rpc_url) = cli.rpc_url {
        config.rpc_url = rpc_url;
    }
    if let Some(chain_id) = cli.chain_id {
        config.chain_id = Some(chain_id);
    }
    let session = Session::new(config, cli.json, cli.key);

    match cli.command {
        Commands::Transfer(args) => args.execute(&session).await?,
        Commands::Query(cmd) => cmd.execute(&session).await?,
        Commands::Counter(cmd) => cmd.execute(&session).await?,
        Commands::Config { .. } => {}
    }
    Ok(())
}

fn handle_config(
    config: &mut Config,
    path: Option<&Path>,
    show: bool,
    set_rpc: Option<String>,
    set_chain_id: Option<u64>,
    json: bool,
) -> Result<(), CliError> {
    let mut modified = false;

    if let Some(rpc) = set_rpc {
        config.rpc_url = rpc;
        modified = true;
    }

    if let Some(chain_id) = set_chain_id {
        config.chain_id = Some(chain_id);
        modified = true;
    }

    if modified {
        let saved = config.save(path)?;
        Output::new(json)
            .field("status", "saved")
            .field("path", &saved.display().to_string())
            .message(&format!("Configuration saved to {}", saved.display()))
            .print();
    } else if show {
        let chain = config
            .chain_id
            .map_or_else(|| "from node".to_string(), |id| id.to_string());
        let mut out = Output::new(json)
            .field("rpc_url", &config.rpc_url)
            .field_u64("gas_limit", config.gas_limit)
            .field_u64("deploy_gas_limit", config.deploy_gas_limit)
            .field_u64("call_gas_limit", config.call_gas_limit)
            .field_u64("poll_interval_ms", config.pipeline.poll_interval_ms)
            .field_u64(
                "confirmation_timeout_secs",
                config.pipeline.confirmation_timeout_secs,
            );
        if let Some(id) = config.chain_id {
            out = out.field_u64("chain_id", id);
        }
        out.message(&format!(
            "RPC URL: {}\nChain ID: {chain}\nGas Limit: {}\nDeploy Gas Limit: {}\nCall Gas Limit: {}",
            config.rpc_url, config.gas_limit, config.deploy_gas_limit, config.call_gas_limit
        ))
        .print();
    } else {
        Output::new(json)
            .message("Use --show to display config, or --set-rpc/--set-chain-id to modify")
            .print();
    }

    Ok(())
}
