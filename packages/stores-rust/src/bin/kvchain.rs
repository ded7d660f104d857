//! `kvchain`: inspect and modify a chain declared in a JSON config file.
//!
//! Values are arbitrary JSON documents. Every command prints its result as
//! JSON on stdout; logs go to stderr.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use cascade_core::{ChainStore, KvStore, StoreContext};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "kvchain")]
#[command(about = "Read and write a cascading key-value chain")]
struct Cli {
    /// Chain configuration file
    #[arg(short, long, env = "KVCHAIN_CONFIG")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Abort the command after this many milliseconds
    #[arg(long, env = "KVCHAIN_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read one key, backfilling faster tiers on a hit
    Get { key: String },
    /// Report whether any tier holds the key
    Contains { key: String },
    /// Write a JSON value to every tier
    Put { key: String, value: String },
    /// Remove a key from every tier
    Delete { key: String },
    /// Read several keys at once
    Mget {
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

async fn execute(
    chain: &ChainStore<String, Value>,
    ctx: &StoreContext,
    command: Command,
) -> anyhow::Result<Value> {
    let output = match command {
        Command::Get { key } => {
            let value = chain.get(ctx, &key).await?;
            json!({ "key": key, "found": value.is_some(), "value": value })
        }
        Command::Contains { key } => {
            let exists = chain.contains(ctx, &key).await?;
            json!({ "key": key, "exists": exists })
        }
        Command::Put { key, value } => {
            let value: Value = serde_json::from_str(&value)
                .with_context(|| format!("value for {key} is not valid JSON"))?;
            chain.put(ctx, &key, &value).await?;
            json!({ "key": key, "written": true })
        }
        Command::Delete { key } => {
            chain.delete(ctx, &key).await?;
            json!({ "key": key, "deleted": true })
        }
        Command::Mget { keys } => {
            let result = chain.get_batch_result(ctx, &keys).await?;
            let items: HashMap<String, Value> = result.items;
            json!({ "items": items, "missing": result.missing })
        }
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cascade_stores::telemetry::init_logging(cli.log_json)?;

    let config = cascade_stores::load_config(&cli.config)?;
    let chain: ChainStore<String, Value> = cascade_stores::build_chain(&config)?;

    let ctx = match cli.timeout_ms {
        Some(ms) => StoreContext::background().with_timeout(Duration::from_millis(ms)),
        None => StoreContext::background(),
    };

    let output = execute(&chain, &ctx, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
