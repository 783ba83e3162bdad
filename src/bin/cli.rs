//! chainkv CLI
//!
//! Command-line interface for a single chainkv store file.

use std::process;

use chainkv::{ChainStore, Config, KvPair, SyncStrategy};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// chainkv CLI
#[derive(Parser, Debug)]
#[command(name = "chainkv-cli")]
#[command(about = "CLI for the chainkv ordered block-chain store")]
#[command(version)]
struct Args {
    /// Store file
    #[arg(short, long, default_value = "./chainkv.db")]
    file: String,

    /// Records per block (must match the capacity the file was created with)
    #[arg(short, long, default_value = "16")]
    capacity: usize,

    /// Skip fsync after each write
    #[arg(long)]
    no_sync: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Insert a new key (fails if it exists)
    Insert {
        /// The key to insert
        key: String,

        /// The value to store
        value: String,
    },

    /// Replace a key's value (inserts if absent)
    Update {
        /// The key to update
        key: String,

        /// The new value
        value: String,
    },

    /// Update if present, insert otherwise
    Upsert {
        /// The key to write
        key: String,

        /// The value to store
        value: String,
    },

    /// Remove a key
    Remove {
        /// The key to remove
        key: String,
    },

    /// Get a value by key
    Find {
        /// The key to look up
        key: String,
    },

    /// List every record in key order
    List,

    /// List records whose key starts with a prefix
    Prefix {
        /// The key prefix
        prefix: String,
    },

    /// Verify chain and directory invariants
    Check,

    /// Show the block directory
    Blocks,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,chainkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let sync_strategy = if args.no_sync {
        SyncStrategy::OsBuffered
    } else {
        SyncStrategy::EveryWrite
    };
    let config = Config::builder()
        .path(&args.file)
        .block_capacity(args.capacity)
        .sync_strategy(sync_strategy)
        .build();

    let store = match ChainStore::open(config) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open store {}: {}", args.file, e);
            process::exit(2);
        }
    };

    match run(&store, args.command) {
        Ok(true) => {}
        Ok(false) => {
            println!("Invalid");
            process::exit(1);
        }
        Err(e) => {
            tracing::error!("{}", e);
            process::exit(2);
        }
    }

    if let Err(e) = store.close() {
        tracing::error!("Failed to close store: {}", e);
        process::exit(2);
    }
}

/// Execute one command; `Ok(false)` is a failed precondition
fn run(store: &ChainStore, command: Commands) -> chainkv::Result<bool> {
    match command {
        Commands::Insert { key, value } => store.insert(key.as_bytes(), value.as_bytes()),
        Commands::Update { key, value } => store.update(key.as_bytes(), value.as_bytes()),
        Commands::Upsert { key, value } => {
            store.insert_or_update(key.as_bytes(), value.as_bytes())
        }
        Commands::Remove { key } => store.remove(key.as_bytes()),
        Commands::Find { key } => match store.find(key.as_bytes())? {
            Some(value) => {
                println!("{}", String::from_utf8_lossy(&value));
                Ok(true)
            }
            None => Ok(false),
        },
        Commands::List => {
            print_pairs(&store.find_all()?);
            Ok(true)
        }
        Commands::Prefix { prefix } => {
            print_pairs(&store.find_prefix(prefix.as_bytes())?);
            Ok(true)
        }
        Commands::Check => {
            let stats = store.verify()?;
            println!(
                "ok: {} block(s), {} empty, {} record(s)",
                stats.blocks, stats.empty_blocks, stats.records
            );
            Ok(true)
        }
        Commands::Blocks => {
            for (i, entry) in store.directory_entries().iter().enumerate() {
                println!(
                    "#{:<4} @{:<10} [{} .. {}]",
                    i,
                    entry.offset,
                    String::from_utf8_lossy(&entry.first_key),
                    String::from_utf8_lossy(&entry.last_key)
                );
            }
            Ok(true)
        }
    }
}

fn print_pairs(pairs: &[KvPair]) {
    for (key, value) in pairs {
        println!(
            "{}\t{}",
            String::from_utf8_lossy(key),
            String::from_utf8_lossy(value)
        );
    }
}
