//! flipper: read, flip and re-read an ink! contract.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────┐   enable / accounts / sign   ┌────────────────────┐
//!   │   flow   │─────────────────────────────▶│ wallet (extension) │
//!   │  runner  │                              └────────────────────┘
//!   │          │   query / estimate / tx      ┌────────────────────┐
//!   │          │─────────────────────────────▶│ contract handle    │
//!   └──────────┘                              └─────────┬──────────┘
//!                                                       │ NodeApi
//!                                             ┌─────────▼──────────┐
//!                                             │ chain: NodeClient  │
//!                                             └─────────┬──────────┘
//!                                                       │ JSON-RPC
//!                                             ┌─────────▼──────────┐
//!                                             │ rpc: WebSocket     │──▶ node
//!                                             └────────────────────┘
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use serde_json::{json, Value};

use flipper_client::chain::AccountId;
use flipper_client::config::{load_or_default, ClientConfig, LogFormat};
use flipper_client::contract::QueryResult;
use flipper_client::lifecycle::shutdown_signal;
use flipper_client::observability::{init_logging, metrics};
use flipper_client::{FlowOptions, Session};

#[derive(Parser)]
#[command(name = "flipper")]
#[command(about = "Read and flip an ink! contract through a wallet extension", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults target the public testnet.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log format.
    #[arg(long, value_parser = ["pretty", "json"])]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read, estimate, submit, wait for finalization, read again
    Run,
    /// Dry-run one message and print the decoded result
    Query {
        /// Message label, e.g. `get`
        message: String,
        /// Arguments as JSON values; bare words are taken as strings
        args: Vec<String>,
        /// Account to simulate the call as
        #[arg(long)]
        caller: Option<String>,
    },
    /// Show chain name, genesis hash, runtime version and best block
    Info,
    /// Print new best-block headers, then unsubscribe
    Heads {
        #[arg(long, default_value_t = 3)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_or_default(cli.config.as_deref())?;
    match cli.log_format.as_deref() {
        Some("json") => config.observability.log_format = LogFormat::Json,
        Some(_) => config.observability.log_format = LogFormat::Pretty,
        None => {}
    }
    init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        endpoint = %config.node.endpoint,
        contract = %config.contract.address,
        "flipper starting"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let session = Session::open(&config).await?;
    let command = cli.command.unwrap_or(Commands::Run);

    let outcome = tokio::select! {
        result = execute(&session, &config, command) => result,
        _ = shutdown_signal() => {
            tracing::warn!("Interrupted, closing session");
            Err("interrupted".into())
        }
    };

    session.close().await;
    tracing::info!("Shutdown complete");
    outcome
}

async fn execute(session: &Session, config: &ClientConfig, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Run => {
            let report = session.flow(FlowOptions::from_config(config)).run().await?;
            tracing::info!(
                tx_hash = %report.tx_hash,
                finalized = %report.finalized,
                before = %render(&report.before),
                after = %render(&report.after),
                "Flow complete"
            );
        }
        Commands::Query { message, args, caller } => {
            let caller: AccountId = caller
                .or_else(|| config.wallet.account.clone())
                .unwrap_or_else(|| config.contract.address.clone())
                .parse()?;
            let args: Vec<Value> = args.iter().map(String::as_str).map(parse_arg).collect();
            let options = FlowOptions::from_config(config).query_options;

            let result = session.contract().query(&caller, &message, &args, &options).await?;
            println!("{}", serde_json::to_string_pretty(&query_json(&result))?);
        }
        Commands::Info => {
            let info = session.node().chain_info().await?;
            let out = json!({
                "chain": info.chain,
                "genesisHash": info.genesis_hash,
                "runtime": info.runtime,
                "bestNumber": info.best_number,
                "bestHash": info.best_hash,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Heads { count } => {
            let mut heads = session.node().subscribe_new_heads().await?;
            for _ in 0..count {
                match heads.next().await {
                    Some(header) => {
                        let header = header?;
                        println!("#{} parent {}", header.number, header.parent_hash);
                    }
                    None => break,
                }
            }
        }
    }
    Ok(())
}

fn parse_arg(arg: &str) -> Value {
    serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.to_string()))
}

fn render(result: &QueryResult) -> String {
    match &result.result {
        Ok(value) => value.to_string(),
        Err(e) => format!("error: {}", e),
    }
}

fn query_json(result: &QueryResult) -> Value {
    let mut out = json!({
        "outcome": result.outcome(),
        "gasConsumed": result.gas_consumed,
        "gasRequired": result.gas_required,
        "storageDeposit": result.storage_deposit,
        "debugMessage": result.debug_message,
    });
    match &result.result {
        Ok(value) => out["output"] = value.clone(),
        Err(e) => out["error"] = Value::String(e.to_string()),
    }
    out
}
