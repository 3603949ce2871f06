// Client for the Jupiter v6 quote/swap API. The quote response is kept as
// opaque JSON because it round-trips verbatim into the swap request; only the
// fields this flow actually needs are modeled.

use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use url::Url;

pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

const QUOTE_API: &str = "https://quote-api.jup.ag/v6/quote";
const SWAP_API: &str = "https://quote-api.jup.ag/v6/swap";

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SwapMode {
    ExactIn,
    ExactOut,
}

impl SwapMode {
    fn as_str(&self) -> &'static str {
        match self {
            SwapMode::ExactIn => "ExactIn",
            SwapMode::ExactOut => "ExactOut",
        }
    }
}

#[derive(Clone, Debug)]
pub struct QuoteRequest {
    pub input_mint: String,
    pub output_mint: String,
    /// Amount in the input mint's base units.
    pub amount: u64,
    pub slippage_bps: Option<u16>,
    pub swap_mode: Option<SwapMode>,
    pub platform_fee_bps: Option<u16>,
    pub only_direct_routes: bool,
    pub as_legacy_transaction: bool,
    pub max_accounts: Option<u16>,
}

impl QuoteRequest {
    pub fn to_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("inputMint", &self.input_mint);
            query.append_pair("outputMint", &self.output_mint);
            query.append_pair("amount", &self.amount.to_string());
            if let Some(slippage_bps) = self.slippage_bps {
                query.append_pair("slippageBps", &slippage_bps.to_string());
            }
            if let Some(swap_mode) = self.swap_mode {
                query.append_pair("swapMode", swap_mode.as_str());
            }
            if let Some(platform_fee_bps) = self.platform_fee_bps {
                query.append_pair("platformFeeBps", &platform_fee_bps.to_string());
            }
            if self.only_direct_routes {
                query.append_pair("onlyDirectRoutes", "true");
            }
            if self.as_legacy_transaction {
                query.append_pair("asLegacyTransaction", "true");
            }
            if let Some(max_accounts) = self.max_accounts {
                query.append_pair("maxAccounts", &max_accounts.to_string());
            }
        }
        url
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    /// Base64-encoded serialized transaction, unsigned.
    pub swap_transaction: String,
    pub last_valid_block_height: u64,
    #[serde(default)]
    pub prioritization_fee_lamports: Option<u64>,
}

pub struct JupiterClient {
    http: reqwest::Client,
    quote_url: Url,
    swap_url: Url,
}

impl JupiterClient {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            quote_url: Url::parse(QUOTE_API).context("parse quote API url")?,
            swap_url: Url::parse(SWAP_API).context("parse swap API url")?,
        })
    }

    pub async fn get_quote(&self, request: &QuoteRequest) -> anyhow::Result<serde_json::Value> {
        let url = request.to_url(&self.quote_url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("quote request failed")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("quote API returned {status}: {body}");
        }
        response.json().await.context("decode quote response")
    }

    pub async fn get_swap_transaction(
        &self,
        quote: &serde_json::Value,
        user_public_key: &Pubkey,
    ) -> anyhow::Result<SwapResponse> {
        let body = json!({
            "quoteResponse": quote,
            "userPublicKey": user_public_key.to_string(),
            // auto wrap and unwrap SOL
            "wrapAndUnwrapSol": true,
        });
        let response = self
            .http
            .post(self.swap_url.clone())
            .json(&body)
            .send()
            .await
            .context("swap request failed")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("swap API returned {status}: {body}");
        }
        response.json().await.context("decode swap response")
    }
}
