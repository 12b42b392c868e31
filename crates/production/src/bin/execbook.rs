//! Execution book operator tool.
//!
//! # Usage
//!
//! ```bash
//! # Generate a sequencer key (prints JSON with private and public key hex)
//! execbook keygen --key-type secp256k1
//!
//! # Sign a transaction hash at a sequence number
//! execbook sign --key <hex> --key-type ed25519 --tx-hash <hex> --sequence 42
//!
//! # Inspect the book described by a node config
//! execbook stats --config node.toml
//! execbook sequencers --config node.toml
//!
//! # Serve the sequencer RPC
//! execbook serve --config node.toml --listen-addr 0.0.0.0:8645
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use execbook_book::ExecutionBook;
use execbook_production::rpc::{RpcServer, RpcServerConfig};
use execbook_production::{GetStatsResponse, NodeConfig, SequencerIngress};
use execbook_types::{sign_sequencer_tx, KeyPair, KeyType, TxHash};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Execution book operator tool.
#[derive(Parser, Debug)]
#[command(name = "execbook")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level filter (used when RUST_LOG is unset)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a sequencer keypair
    Keygen {
        /// Key type: ed25519 or secp256k1
        #[arg(long, default_value = "ed25519")]
        key_type: String,

        /// Derive the key from a 32-byte hex seed instead of randomly
        #[arg(long)]
        seed: Option<String>,
    },

    /// Sign a (tx hash, sequence number) pair as a sequencer
    Sign {
        /// Private key (hex)
        #[arg(long)]
        key: String,

        /// Key type: ed25519 or secp256k1
        #[arg(long, default_value = "ed25519")]
        key_type: String,

        /// Transaction hash (64 hex chars)
        #[arg(long)]
        tx_hash: String,

        /// Global sequence number
        #[arg(long)]
        sequence: u64,
    },

    /// Print execution book statistics as JSON
    Stats {
        /// Path to configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// List registered sequencer ids
    Sequencers {
        /// Path to configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Serve the sequencer RPC until interrupted
    Serve {
        /// Path to configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Listen address (overrides config)
        #[arg(long)]
        listen_addr: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so command output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    match cli.command {
        Command::Keygen { key_type, seed } => keygen(&key_type, seed.as_deref()),
        Command::Sign {
            key,
            key_type,
            tx_hash,
            sequence,
        } => sign(&key, &key_type, &tx_hash, sequence),
        Command::Stats { config } => {
            let (_, book) = open_book(&config)?;
            let stats = GetStatsResponse::from(book.get_stats());
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Command::Sequencers { config } => {
            let (_, book) = open_book(&config)?;
            for id in book.sequencer_ids() {
                println!("{id}");
            }
            Ok(())
        }
        Command::Serve {
            config,
            listen_addr,
        } => serve(&config, listen_addr).await,
    }
}

fn keygen(key_type: &str, seed: Option<&str>) -> Result<()> {
    let key_type: KeyType = key_type.parse()?;
    let keypair = match seed {
        Some(seed_hex) => {
            let bytes = hex::decode(seed_hex).context("Failed to decode hex seed")?;
            let Ok(seed) = <[u8; 32]>::try_from(bytes.as_slice()) else {
                bail!("Seed must be 32 bytes (64 hex chars), got {}", bytes.len());
            };
            KeyPair::from_seed(key_type, &seed)
        }
        None => KeyPair::generate(key_type),
    };

    let output = serde_json::json!({
        "key_type": key_type.as_str(),
        "private_key": hex::encode(keypair.secret_bytes()),
        "public_key": keypair.public_key().to_hex(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn sign(key_hex: &str, key_type: &str, tx_hash: &str, sequence: u64) -> Result<()> {
    let keypair = KeyPair::from_hex(key_hex, key_type).context("Failed to load private key")?;
    let tx_hash = TxHash::from_hex(tx_hash).context("Invalid transaction hash")?;
    println!("{}", hex::encode(sign_sequencer_tx(&tx_hash, sequence, &keypair)));
    Ok(())
}

fn open_book(path: &Path) -> Result<(NodeConfig, ExecutionBook)> {
    let config = NodeConfig::load(path)?;
    let book_config = config
        .to_book_config()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok((config, ExecutionBook::new(book_config)))
}

async fn serve(path: &Path, listen_addr: Option<SocketAddr>) -> Result<()> {
    let (config, book) = open_book(path)?;
    let book = Arc::new(book);

    let rpc_config = RpcServerConfig {
        listen_addr: listen_addr.unwrap_or(config.rpc.listen_addr),
        rate_limit: config.rpc.rate_limit(),
    };
    let handle = RpcServer::new(rpc_config, SequencerIngress::new(Arc::clone(&book)))
        .start()
        .await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    handle.shutdown().await?;
    book.flush();
    Ok(())
}
