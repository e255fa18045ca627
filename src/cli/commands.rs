//! CLI commands for the ledger
//!
//! Implements all command handlers for the CLI interface.

use crate::config::LedgerConfig;
use crate::core::{Blockchain, Transaction};
use crate::crypto::{calculate_merkle_root, leaf_hashes, sha256_hex, KeyPair};
use crate::wallet::Wallet;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn first_block_transactions() -> Vec<Transaction> {
    vec![
        Transaction::new("Aruzhan", "Akerke", 50),
        Transaction::new("Dinara", "Laura", 100),
        Transaction::new("Aigul", "Aym", 150),
        Transaction::new("Aizere", "Meruert", 200),
        Transaction::new("Madina", "Gauhar", 250),
        Transaction::new("Aisha", "Nazerke", 300),
        Transaction::new("Aliya", "Elmira", 350),
        Transaction::new("Aydana", "Sholpan", 400),
        Transaction::new("Zhanar", "Inzhu", 450),
        Transaction::new("Ayaru", "Tomiris", 500),
    ]
}

fn second_block_transactions() -> Vec<Transaction> {
    vec![
        Transaction::new("Charlie", "David", 15),
        Transaction::new("Eve", "Frank", 40),
        Transaction::new("Alice", "Eve", 10),
    ]
}

/// Print every block with its fields and transactions
pub fn display_chain(blockchain: &Blockchain) {
    for block in blockchain.blocks() {
        println!("Block {}", block.index);
        println!(
            "  Timestamp     : {}",
            block.timestamp.format("%a %b %e %H:%M:%S %Y")
        );
        println!("  Hash          : {}", block.hash);
        println!("  Previous Hash : {}", block.previous_hash);
        println!(
            "  Merkle Root   : {}",
            block.merkle_root.as_deref().unwrap_or("-")
        );
        println!("  Nonce         : {}", block.nonce);
        println!("  Transactions  :");
        for tx in &block.transactions {
            println!("    - {}", tx);
        }
        println!("{}", "-".repeat(40));
    }
}

fn report_validation(blockchain: &Blockchain) {
    println!("\n🔍 Validating blockchain...");
    if blockchain.validate_chain() {
        println!("✅ Blockchain is valid");
        println!("   {} blocks verified", blockchain.blocks().len());
    } else {
        println!("❌ Blockchain is corrupted");
    }
}

/// Build a ledger with two blocks of plain transfers and print it
pub fn cmd_demo(config: &LedgerConfig, json: bool) -> CliResult<()> {
    let mut blockchain = Blockchain::with_config(config)?;

    println!(
        "⛏️  Mining with difficulty {} ({} blocks)",
        blockchain.difficulty(),
        blockchain.mode()
    );

    blockchain.add_block(first_block_transactions())?;
    blockchain.add_block(second_block_transactions())?;

    if json {
        println!("{}", serde_json::to_string_pretty(blockchain.blocks())?);
    } else {
        println!("\nBlockchain:");
        display_chain(&blockchain);
    }

    report_validation(&blockchain);
    Ok(())
}

/// Sign a transfer between two fresh wallets, admit it and mine it
pub fn cmd_signed_demo(config: &LedgerConfig) -> CliResult<()> {
    let mut blockchain = Blockchain::with_config(config)?;
    let mut rng = rand::thread_rng();

    let alice = Wallet::generate_with(&mut rng, config.max_keygen_attempts)?;
    let bob = Wallet::generate_with(&mut rng, config.max_keygen_attempts)?;

    println!("🔐 Alice: {}", alice.public_key());
    println!("🔐 Bob:   {}", bob.public_key());

    let tx = alice.create_transaction(bob.identity(), 50);
    println!("\n📤 Transaction: {}", tx);
    if let Some(signature) = &tx.signature {
        println!("   Signature: {:?}", signature);
    }

    blockchain.add_transaction(tx)?;
    println!("✅ Signature verified, transaction queued");

    let block = blockchain.mine_block()?;
    println!("\n   Block {} mined!", block.index);
    println!("   ├─ Hash: {}", block.hash);
    println!("   └─ Transactions: {}", block.tx_count());

    println!("\nBlockchain:");
    display_chain(&blockchain);
    report_validation(&blockchain);
    Ok(())
}

/// Hash a string with the ledger's SHA-256
pub fn cmd_hash(input: &str) -> CliResult<()> {
    println!("{}", sha256_hex(input.as_bytes()));
    Ok(())
}

/// Generate and print a key pair, with an encryption round trip
pub fn cmd_keygen(config: &LedgerConfig) -> CliResult<()> {
    let key_pair = KeyPair::generate_with(&mut rand::thread_rng(), config.max_keygen_attempts)?;

    println!("🔑 Key pair generated (toy sizes, NOT secure)");
    println!("   ├─ Public key:  {}", key_pair.public_key);
    println!(
        "   └─ Private key: ({}, {})",
        key_pair.private_key.d, key_pair.private_key.n
    );

    let message = "hello";
    let ciphertext = key_pair.public_key.encrypt(message);
    let plaintext = key_pair.private_key.decrypt(&ciphertext)?;
    println!("\n   Encrypt {:?} -> {:?}", message, ciphertext);
    println!("   Decrypt -> {:?}", plaintext);

    Ok(())
}

/// Print the leaves and root of a merkle tree over the given items
pub fn cmd_merkle(items: &[String]) -> CliResult<()> {
    println!("🌳 Merkle tree over {} item(s)", items.len());
    for (item, leaf) in items.iter().zip(leaf_hashes(items)) {
        println!("   ├─ {} = {}", leaf, item);
    }
    println!("   └─ Root: {}", calculate_merkle_root(items));
    Ok(())
}
