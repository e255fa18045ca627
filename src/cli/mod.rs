//! Command-line driver for the ledger demos

pub mod commands;

pub use commands::{
    cmd_demo, cmd_hash, cmd_keygen, cmd_merkle, cmd_signed_demo, display_chain, CliResult,
};
