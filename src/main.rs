//! Mini-Ledger CLI Application
//!
//! A command-line driver for the ledger demos.

use clap::{Parser, Subcommand};
use mini_ledger::cli;
use mini_ledger::core::BlockMode;
use mini_ledger::LedgerConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ledger")]
#[command(version = "0.1.0")]
#[command(about = "An educational proof-of-work ledger in Rust", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine two blocks of plain transfers and print the chain
    Demo {
        /// Mining difficulty (number of leading zero hex characters)
        #[arg(short, long)]
        difficulty: Option<u32>,

        /// Block mode: merkle or flat
        #[arg(short, long)]
        mode: Option<BlockMode>,

        /// Number of mining threads
        #[arg(short, long)]
        threads: Option<usize>,

        /// Print the chain as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign a transfer between two wallets, verify it and mine it
    SignedDemo {
        /// Block mode: merkle or flat
        #[arg(short, long)]
        mode: Option<BlockMode>,
    },

    /// Hash a string
    Hash {
        /// Text to hash
        input: String,
    },

    /// Generate a key pair
    Keygen,

    /// Compute the merkle root of a list of items
    Merkle {
        /// Items, in order
        items: Vec<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = LedgerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Demo {
            difficulty,
            mode,
            threads,
            json,
        } => {
            if let Some(d) = difficulty {
                config.difficulty = d;
            }
            if let Some(m) = mode {
                config.block_mode = m;
            }
            if let Some(t) = threads {
                config.mining_threads = t;
            }
            config.validate()?;
            cli::cmd_demo(&config, json)?;
        }

        Commands::SignedDemo { mode } => {
            if let Some(m) = mode {
                config.block_mode = m;
            }
            cli::cmd_signed_demo(&config)?;
        }

        Commands::Hash { input } => {
            cli::cmd_hash(&input)?;
        }

        Commands::Keygen => {
            cli::cmd_keygen(&config)?;
        }

        Commands::Merkle { items } => {
            cli::cmd_merkle(&items)?;
        }
    }

    Ok(())
}
