use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use log::trace;
use solana_rpc_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::config::RpcSendTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use solana_transaction_status::TransactionStatus;
use url::Url;

use crate::ledger_rpc::LedgerRpc;
use crate::structures::prepared_transaction::WireTransaction;
use crate::structures::signature_status::{FinalizedStatus, SignatureStatus};

pub fn create_rpc_client(rpc_url: &Url) -> RpcClient {
    RpcClient::new_with_commitment(rpc_url.to_string(), CommitmentConfig::confirmed())
}

/// `LedgerRpc` backed by a standard Solana JSON-RPC endpoint.
///
/// A status counts as terminal once it satisfies `commitment`; anything
/// below that is reported as still processing.
pub struct SolanaRpc {
    rpc_client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl SolanaRpc {
    pub fn new(rpc_client: Arc<RpcClient>) -> Self {
        Self {
            rpc_client,
            commitment: CommitmentConfig::confirmed(),
        }
    }
}

#[async_trait]
impl LedgerRpc for SolanaRpc {
    async fn send_transaction(
        &self,
        wire_transaction: &WireTransaction,
    ) -> anyhow::Result<Signature> {
        let tx = bincode::deserialize::<VersionedTransaction>(wire_transaction)
            .context("deserialize wire transaction for send")?;
        // the waiter owns the retry policy, so RPC-side retries stay off
        let send_config = RpcSendTransactionConfig {
            skip_preflight: true,
            preflight_commitment: None,
            encoding: None,
            max_retries: Some(0),
            min_context_slot: None,
        };
        let signature = self
            .rpc_client
            .send_transaction_with_config(&tx, send_config)
            .await?;
        Ok(signature)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> anyhow::Result<SignatureStatus> {
        let statuses = self
            .rpc_client
            .get_signature_statuses(&[*signature])
            .await?
            .value;
        let status = statuses.into_iter().next().flatten();
        trace!("status for {signature}: {status:?}");
        Ok(map_signature_status(status, self.commitment))
    }

    async fn get_block_height(&self) -> anyhow::Result<u64> {
        let height = self
            .rpc_client
            .get_block_height_with_commitment(self.commitment)
            .await?;
        Ok(height)
    }
}

pub fn map_signature_status(
    status: Option<TransactionStatus>,
    commitment: CommitmentConfig,
) -> SignatureStatus {
    match status {
        None => SignatureStatus::NotFound,
        Some(status) if status.satisfies_commitment(commitment) => {
            SignatureStatus::Finalized(FinalizedStatus {
                slot: status.slot,
                confirmation_status: status.confirmation_status(),
                err: status.err,
            })
        }
        Some(status) => SignatureStatus::Processing { slot: status.slot },
    }
}
