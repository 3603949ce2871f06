use std::sync::Arc;

use anyhow::{bail, Context};
use base64::Engine;
use clap::Parser;
use log::{error, info, warn};
use solana_rpc_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::config::RpcSimulateTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::VersionedTransaction;
use swap_sender_core::solana_rpc::{create_rpc_client, SolanaRpc};
use swap_sender_core::structures::confirmation_outcome::ConfirmationOutcome;
use swap_sender_core::structures::prepared_transaction::PreparedTransaction;
use swap_sender_services::confirmation_waiter::ConfirmationWaiter;

mod cli;
mod jupiter;

use crate::cli::Args;
use crate::jupiter::JupiterClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let keypair = load_keypair_from_env()?;
    info!("swapping as {}", keypair.pubkey());

    let jupiter = JupiterClient::new()?;
    let quote = jupiter.get_quote(&args.quote_request()).await?;
    let quoted_amount = |key: &str| quote.get(key).and_then(|value| value.as_str());
    if let (Some(in_amount), Some(out_amount)) = (quoted_amount("inAmount"), quoted_amount("outAmount")) {
        info!(
            "quote: {in_amount} {} -> {out_amount} {}",
            args.input_mint, args.output_mint
        );
    }

    let swap = jupiter
        .get_swap_transaction(&quote, &keypair.pubkey())
        .await?;
    let transaction_bytes = base64::engine::general_purpose::STANDARD
        .decode(&swap.swap_transaction)
        .context("decode swap transaction from base64")?;
    let unsigned = bincode::deserialize::<VersionedTransaction>(&transaction_bytes)
        .context("deserialize swap transaction")?;
    let signed = VersionedTransaction::try_new(unsigned.message, &[&keypair])
        .context("sign swap transaction")?;

    let rpc_client = Arc::new(create_rpc_client(&args.rpc_url));

    if args.skip_simulation {
        warn!("skipping preflight simulation");
    } else {
        simulate(&rpc_client, &signed).await?;
    }

    let wire_transaction =
        bincode::serialize(&signed).context("serialize signed transaction")?;
    let prepared = PreparedTransaction::from_wire(wire_transaction, swap.last_valid_block_height)?;
    info!("explorer: {}", prepared.explorer_url());

    let waiter = ConfirmationWaiter::new(
        Arc::new(SolanaRpc::new(rpc_client)),
        args.waiter_config(),
    );
    let outcome = waiter.wait_for_confirmation(&prepared).await?;

    match outcome {
        ConfirmationOutcome::Confirmed(confirmed) => match confirmed.execution_error {
            None => {
                info!(
                    "swap confirmed in slot {} after {:.3}s",
                    confirmed.slot,
                    confirmed.elapsed.as_secs_f32()
                );
                println!("{}", prepared.explorer_url());
            }
            Some(err) => {
                // landed on chain but the swap itself failed; resending
                // cannot change this, so it is a terminal failed swap
                error!("swap failed on chain: {err}");
                println!("{}", prepared.explorer_url());
                std::process::exit(1);
            }
        },
        ConfirmationOutcome::BlockheightExceeded { elapsed } => {
            // not proof of failure: the transaction may still land
            warn!(
                "no confirmation after {:.3}s; outcome unknown, check {}",
                elapsed.as_secs_f32(),
                prepared.explorer_url()
            );
            std::process::exit(2);
        }
    }

    Ok(())
}

fn load_keypair_from_env() -> anyhow::Result<Keypair> {
    let private_key =
        std::env::var("PRIVATE_KEY").context("PRIVATE_KEY environment variable not set")?;
    let bytes = bs58::decode(private_key.trim())
        .into_vec()
        .context("PRIVATE_KEY is not valid base58")?;
    Keypair::from_bytes(&bytes).context("PRIVATE_KEY is not a valid keypair")
}

async fn simulate(rpc_client: &RpcClient, transaction: &VersionedTransaction) -> anyhow::Result<()> {
    let config = RpcSimulateTransactionConfig {
        replace_recent_blockhash: true,
        commitment: Some(CommitmentConfig::processed()),
        ..Default::default()
    };
    let simulation = rpc_client
        .simulate_transaction_with_config(transaction, config)
        .await
        .context("simulate transaction")?;
    if let Some(err) = simulation.value.err {
        for line in simulation.value.logs.unwrap_or_default() {
            warn!("simulation log: {line}");
        }
        bail!("simulation failed: {err}");
    }
    Ok(())
}
