//! vela daemon: entry point for running a vela node and key utilities.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use vela_blocks::{Block, SendBlock};
use vela_crypto::{deterministic_key, encode_account, KeyPair};
use vela_ledger::{Genesis, Ledger, ProcessResult};
use vela_node::{Node, NodeConfig};
use vela_store::Store;
use vela_types::{Amount, Network, RawKey};

#[derive(Parser)]
#[command(name = "vela-daemon", about = "vela block-lattice node daemon")]
struct Cli {
    /// Network to join.
    #[arg(long, default_value = "live")]
    network: Network,

    /// Data directory for the ledger environment.
    #[arg(long, default_value = "./vela_data")]
    data_dir: PathBuf,

    /// Optional TOML configuration file. When given, the network and
    /// data-dir flags are ignored in favor of its contents.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the node.
    Run {
        /// Port for UDP gossip and TCP bootstrap.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print store health information and exit.
    Diagnostics,
    /// Generate a fresh key pair.
    KeyCreate,
    /// Derive the public key and address for a secret key.
    KeyExpand {
        /// 64 hex characters of secret key.
        key: String,
    },
    /// Derive an account from a seed and index.
    AccountCreate {
        /// 64 hex characters of wallet seed.
        seed: String,
        #[arg(long, default_value_t = 0)]
        index: u32,
    },
    /// Fill a test-network ledger with synthetic send activity.
    GenerateDebugActivity {
        #[arg(long, default_value_t = 32)]
        count: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)?,
        None => NodeConfig {
            network: cli.network,
            data_dir: cli.data_dir.clone(),
            port: cli.network.default_port(),
            ..NodeConfig::default()
        },
    };
    vela_utils::init_tracing(Some(&config.log_level), config.log_format == "json");

    match cli.command {
        Command::Run { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            let node = Node::new(config).await?;
            node.start().await?;
            tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
            node.stop().await;
        }
        Command::Diagnostics => {
            let store = std::sync::Arc::new(Store::open(&config.data_dir)?);
            let ledger = Ledger::new(store.clone(), config.network);
            let txn = store.begin_read()?;
            let version = store.version_get(&txn)?.unwrap_or(0);
            let counts = store.block_counts(&txn)?;
            println!("schema version: {version}");
            println!("accounts:       {}", store.account_count(&txn)?);
            println!(
                "blocks:         {} (send {}, receive {}, open {}, change {})",
                counts.iter().sum::<u64>(),
                counts[0],
                counts[1],
                counts[2],
                counts[3]
            );
            println!("pending:        {}", store.pending_count(&txn)?);
            println!("unchecked:      {}", store.unchecked_count(&txn)?);

            let report = vela_ledger::check_integrity(&ledger, &txn)?;
            if report.is_clean() {
                println!(
                    "integrity:      ok ({} accounts, {} blocks)",
                    report.accounts_checked, report.blocks_checked
                );
            } else {
                for violation in &report.violations {
                    eprintln!("integrity:      {violation}");
                }
                bail!("{} integrity violations", report.violations.len());
            }
        }
        Command::KeyCreate => {
            let keys = KeyPair::generate();
            print_key(&config.network, &keys);
        }
        Command::KeyExpand { key } => {
            let key = RawKey::decode_hex(&key).context("key must be 64 hex characters")?;
            let keys = KeyPair::from_private(key);
            print_key(&config.network, &keys);
        }
        Command::AccountCreate { seed, index } => {
            let seed = RawKey::decode_hex(&seed).context("seed must be 64 hex characters")?;
            let keys = KeyPair::from_private(deterministic_key(&seed, index));
            print_key(&config.network, &keys);
        }
        Command::GenerateDebugActivity { count } => {
            if config.network != Network::Test {
                bail!("debug activity is only generated on the test network");
            }
            generate_debug_activity(&config, count)?;
        }
    }
    Ok(())
}

fn print_key(network: &Network, keys: &KeyPair) {
    println!("private: {}", hex::encode_upper(keys.private.as_bytes()));
    println!("public:  {}", keys.public.encode_hex());
    println!(
        "account: {}",
        encode_account(network.address_prefix(), &keys.public)
    );
}

/// Drive the ledger with synthetic sends off the genesis chain.
fn generate_debug_activity(config: &NodeConfig, count: u32) -> anyhow::Result<()> {
    let store = std::sync::Arc::new(Store::open(&config.data_dir)?);
    let ledger = Ledger::new(store.clone(), config.network);
    let genesis_keys = KeyPair::from_private(config.network.genesis_key());

    {
        let mut txn = store.begin_write()?;
        Genesis::new(config.network).initialize(&store, &mut txn)?;
        txn.commit()?;
    }

    let mut txn = store.begin_write()?;
    let mut applied = 0u32;
    for _ in 0..count {
        let destination = KeyPair::generate().public;
        let head = ledger
            .latest(&txn, &genesis_keys.public)?
            .context("genesis chain disappeared")?;
        let balance = ledger.account_balance(&txn, &genesis_keys.public)?;
        let spend = Amount::new(1 + rand::random::<u64>() as u128);
        let Some(remainder) = balance.checked_sub(spend) else {
            break;
        };
        let work = vela_work::generate_work(&head, config.network.work_threshold())
            .context("work generation exhausted its budget")?;
        let send = SendBlock::new(
            head,
            destination,
            remainder,
            &genesis_keys.private,
            &genesis_keys.public,
            work,
        );
        let outcome = ledger.process(&mut txn, &Block::Send(send))?;
        if outcome.code != ProcessResult::Progress {
            bail!("debug send rejected: {:?}", outcome.code);
        }
        applied += 1;
    }
    txn.commit()?;
    println!("applied {applied} synthetic sends");
    Ok(())
}
