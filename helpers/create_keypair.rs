//! Wallet Keypair Generation Tool
//!
//! Generates a Solana keypair and writes it in the `solana-keygen` JSON
//! format, ready to be used as `WALLET_KEYPAIR_PATH`.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example create_keypair -- --output-dir keys
//! ```
use chrono::Local;
use clap::Parser;
use eyre::{Result, WrapErr};
use solana_sdk::signature::{write_keypair_file, Keypair, Signer};
use std::{fs, path::Path};

/// Command line arguments for keypair generation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output directory for the keypair file
    #[arg(short, long, default_value = ".")]
    output_dir: String,

    /// Custom output filename. Defaults to a timestamp-based name
    #[arg(short, long)]
    filename: Option<String>,

    /// Force overwrite if file exists
    #[arg(long)]
    force: bool,
}

/// `wallet_YYYYMMDD_HHMMSS.json`
fn generate_default_filename() -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    format!("wallet_{}.json", timestamp)
}

fn main() -> Result<()> {
    let args = Args::parse();

    fs::create_dir_all(&args.output_dir).wrap_err("Failed to create output directory")?;

    let filename = args.filename.unwrap_or_else(generate_default_filename);
    let path = Path::new(&args.output_dir).join(filename);
    if path.exists() && !args.force {
        return Err(eyre::eyre!(
            "File {} already exists. Use --force to overwrite",
            path.display()
        ));
    }

    let keypair = Keypair::new();
    write_keypair_file(&keypair, &path)
        .map_err(|e| eyre::eyre!("Failed to write keypair: {}", e))?;

    println!("Generated wallet {}", keypair.pubkey());
    println!("Keypair stored at: {}", path.display());
    println!("Set WALLET_KEYPAIR_PATH={} to use it", path.display());
    Ok(())
}
