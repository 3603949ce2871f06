use std::time::Duration;

use clap::Parser;
use swap_sender_services::confirmation_waiter::WaiterConfig;
use url::Url;

use crate::jupiter::{QuoteRequest, SwapMode, SOL_MINT, USDC_MINT};

/// Swap a token pair via Jupiter and wait until the cluster reports the
/// transaction's outcome.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// JSON-RPC endpoint used to broadcast and confirm
    #[arg(long, env = "RPC_URL", default_value = "https://api.mainnet-beta.solana.com")]
    pub rpc_url: Url,
    /// Mint swapped out of
    #[arg(long, default_value = SOL_MINT)]
    pub input_mint: String,
    /// Mint swapped into
    #[arg(long, default_value = USDC_MINT)]
    pub output_mint: String,
    /// Amount in the input mint's base units (lamports for SOL)
    #[arg(long, default_value_t = 100_000_000)]
    pub amount: u64,
    /// Allowed slippage in basis points
    #[arg(long, default_value_t = 50)]
    pub slippage_bps: u16,
    /// Quote with a fixed input (exact-in) or fixed output (exact-out) amount
    #[arg(long, value_enum)]
    pub swap_mode: Option<SwapMode>,
    /// Platform fee in basis points, charged on top of the swap
    #[arg(long)]
    pub platform_fee_bps: Option<u16>,
    /// Restrict routing to single-hop routes
    #[arg(long)]
    pub only_direct_routes: bool,
    /// Request a legacy (non-versioned) transaction
    #[arg(long)]
    pub as_legacy_transaction: bool,
    /// Cap the number of accounts the route may touch
    #[arg(long)]
    pub max_accounts: Option<u16>,
    /// Skip the preflight simulation before broadcasting
    #[arg(long)]
    pub skip_simulation: bool,
    /// Seconds between rebroadcasts of the signed transaction
    #[arg(long, default_value_t = 2)]
    pub resend_interval_secs: u64,
    /// Seconds between signature status polls
    #[arg(long, default_value_t = 2)]
    pub status_poll_interval_secs: u64,
    /// Seconds between block height polls for the expiry deadline
    #[arg(long, default_value_t = 5)]
    pub height_poll_interval_secs: u64,
    /// Hard wall-clock ceiling in seconds on top of the blockheight deadline
    #[arg(long)]
    pub max_wait_secs: Option<u64>,
}

impl Args {
    pub fn quote_request(&self) -> QuoteRequest {
        QuoteRequest {
            input_mint: self.input_mint.clone(),
            output_mint: self.output_mint.clone(),
            amount: self.amount,
            slippage_bps: Some(self.slippage_bps),
            swap_mode: self.swap_mode,
            platform_fee_bps: self.platform_fee_bps,
            only_direct_routes: self.only_direct_routes,
            as_legacy_transaction: self.as_legacy_transaction,
            max_accounts: self.max_accounts,
        }
    }

    pub fn waiter_config(&self) -> WaiterConfig {
        WaiterConfig {
            resend_interval: Duration::from_secs(self.resend_interval_secs),
            status_poll_interval: Duration::from_secs(self.status_poll_interval_secs),
            height_poll_interval: Duration::from_secs(self.height_poll_interval_secs),
            max_wait: self.max_wait_secs.map(Duration::from_secs),
        }
    }
}
