use async_trait::async_trait;
use solana_sdk::signature::Signature;

use crate::structures::prepared_transaction::WireTransaction;
use crate::structures::signature_status::SignatureStatus;

/// Narrow view of the cluster used by the send-and-confirm services.
///
/// Kept small so tests can substitute a scripted double that simulates
/// transport errors and height progression deterministically.
#[async_trait]
pub trait LedgerRpc: Send + Sync + 'static {
    /// Fire-and-forget broadcast of already-signed wire bytes. Errors are
    /// transport-level only; the cluster dedups by signature, so resubmitting
    /// an already-landed transaction is harmless.
    async fn send_transaction(
        &self,
        wire_transaction: &WireTransaction,
    ) -> anyhow::Result<Signature>;

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> anyhow::Result<SignatureStatus>;

    /// Current block height at the confirmed commitment, used to evaluate
    /// the blockhash validity window.
    async fn get_block_height(&self) -> anyhow::Result<u64>;
}
