//! # Sponsored Relay CLI
//!
//! Sends SPL token transfers whose network fee is paid by a relayer and
//! reimbursed in a token of the sender's choice.
//!
//! ## Usage
//!
//! ```bash
//! sponsored-relay relayer-config
//! sponsored-relay balance --mint <MINT> [--mint <MINT> ...]
//! sponsored-relay transfer --mint <MINT> --recipient <OWNER> --amount <BASE_UNITS> --fee-token <MINT>
//! ```
//!
//! Settings are read from the environment (and `.env`): `RELAYER_URL`,
//! `SOLANA_RPC_URL` and, for commands that sign, `WALLET_KEYPAIR_PATH`.
use std::{str::FromStr, sync::Arc};

use clap::{Parser, Subcommand};
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use dotenvy::dotenv;
use futures::future::join_all;
use log::{info, warn};
use solana_sdk::pubkey::Pubkey;
use sponsored_relay::{
    config::ClientConfig,
    domain::{AccountResolver, SponsoredRelayEngine, SponsoredSend},
    logging::setup_logging,
    models::ConfirmationOutcome,
    services::{
        HttpRelayerClient, LocalWalletSigner, RelayerServiceTrait, SolanaProvider, WalletSigner,
    },
};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transfer tokens with the network fee sponsored by the relayer
    Transfer {
        /// Mint of the token to send
        #[arg(long)]
        mint: String,
        /// Owner account of the recipient (not its holding account)
        #[arg(long)]
        recipient: String,
        /// Amount in base units
        #[arg(long)]
        amount: u64,
        /// Mint of the token the relayer is paid in
        #[arg(long)]
        fee_token: String,
        /// Create the recipient's holding account if it does not exist, paid by the sender
        #[arg(long)]
        create_recipient_account: bool,
        /// Return after submission instead of waiting for confirmation
        #[arg(long)]
        no_wait: bool,
    },
    /// Show token balances
    Balance {
        /// Mint of a token; repeat for several
        #[arg(long, required = true)]
        mint: Vec<String>,
        /// Owner account; defaults to the wallet
        #[arg(long)]
        owner: Option<String>,
    },
    /// Show the relayer's fee payer and accepted fee tokens
    RelayerConfig,
}

fn parse_pubkey(name: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).map_err(|e| eyre!("Invalid {} '{}': {}", name, value, e))
}

fn load_wallet(config: &ClientConfig) -> Result<LocalWalletSigner> {
    let path = config
        .wallet_keypair_path
        .as_deref()
        .ok_or_else(|| eyre!("WALLET_KEYPAIR_PATH must be set"))?;
    LocalWalletSigner::from_file(path).wrap_err("Failed to load wallet keypair")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error reporting with eyre
    color_eyre::install().wrap_err("Failed to initialize error reporting")?;

    dotenv().ok();
    setup_logging().wrap_err("Failed to initialize logging")?;

    let args = Args::parse();
    let config = ClientConfig::from_env().wrap_err("Failed to load configuration")?;

    let provider = Arc::new(
        SolanaProvider::new(&config.rpc_url, config.rpc_timeout(), config.commitment)
            .with_skip_preflight(config.skip_preflight),
    );
    let relayer = Arc::new(
        HttpRelayerClient::new(&config.relayer_url, config.rpc_timeout())
            .wrap_err("Failed to create relayer client")?,
    );

    match args.command {
        Command::RelayerConfig => {
            let relayer_config = relayer.get_config().await?;
            println!("fee payer: {}", relayer_config.fee_payer);
            for token in &relayer_config.accepted_fee_tokens {
                println!("accepts:   {}", token);
            }
        }
        Command::Balance { mint, owner } => {
            let mints = mint
                .iter()
                .map(|mint| parse_pubkey("mint", mint))
                .collect::<Result<Vec<_>>>()?;
            let owner = match owner {
                Some(owner) => parse_pubkey("owner", &owner)?,
                None => load_wallet(&config)?.pubkey()?,
            };
            let balances = join_all(
                mints
                    .iter()
                    .map(|mint| AccountResolver::token_balance(provider.as_ref(), &owner, mint)),
            )
            .await;
            for (mint, balance) in mints.iter().zip(balances) {
                match balance? {
                    Some(balance) => println!(
                        "{} {} (holding account {})",
                        balance.amount, mint, balance.holding_account
                    ),
                    None => println!("no balance of {} for {}", mint, owner),
                }
            }
        }
        Command::Transfer {
            mint,
            recipient,
            amount,
            fee_token,
            create_recipient_account,
            no_wait,
        } => {
            let mint = parse_pubkey("mint", &mint)?;
            let recipient = parse_pubkey("recipient", &recipient)?;
            parse_pubkey("fee token", &fee_token)?;

            let wallet = Arc::new(load_wallet(&config)?);
            let initiator = wallet.pubkey()?;

            let (program_id, decimals) =
                AccountResolver::mint_info(provider.as_ref(), &mint).await?;
            let mut instructions = Vec::new();
            if create_recipient_account {
                instructions.push(AccountResolver::create_holding_account_instruction(
                    &initiator,
                    &recipient,
                    &mint,
                    &program_id,
                ));
            }
            instructions.push(AccountResolver::create_transfer_checked_instruction(
                &program_id,
                &AccountResolver::holding_account(&initiator, &mint, &program_id),
                &mint,
                &AccountResolver::holding_account(&recipient, &mint, &program_id),
                &initiator,
                amount,
                decimals,
            )?);

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling");
                    on_interrupt.cancel();
                }
            });

            let engine =
                SponsoredRelayEngine::new(provider, relayer, wallet, config.engine_config());
            let send = SponsoredSend {
                initiator,
                fee_token,
                instructions,
            };
            let receipt = if no_wait {
                engine.send(send, &cancel).await?
            } else {
                engine.send_and_confirm(send, &cancel).await?
            };

            info!("Session {} finished in {}", receipt.session_id, receipt.state);
            println!("signature: {}", receipt.submission.signature);
            println!(
                "fee:       {} {}",
                receipt.fee_quote.fee_amount, receipt.fee_quote.fee_token
            );
            match receipt.outcome {
                Some(ConfirmationOutcome::Confirmed { slot }) => match slot {
                    Some(slot) => println!("status:    confirmed at slot {}", slot),
                    None => println!("status:    confirmed"),
                },
                Some(ConfirmationOutcome::Failed(reason)) => {
                    return Err(eyre!("Transaction failed: {}", reason));
                }
                Some(ConfirmationOutcome::TimedOut) => {
                    return Err(eyre!(
                        "Transaction was not confirmed before its blockhash expired; it may still land"
                    ));
                }
                None => println!("status:    submitted"),
            }
        }
    }

    Ok(())
}
