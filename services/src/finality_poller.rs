// Polls the cluster for a signature's status until it turns terminal or the
// coordinator pulls the exit signal.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace, warn};
use prometheus::{register_int_counter, IntCounter};
use solana_sdk::signature::Signature;
use swap_sender_core::ledger_rpc::LedgerRpc;
use swap_sender_core::structures::signature_status::{FinalizedStatus, SignatureStatus};
use tokio::sync::watch;
use tokio::task::JoinHandle;

lazy_static::lazy_static! {
    static ref STATUS_POLLS: IntCounter =
        register_int_counter!("swapsender_status_polls", "Number of signature status queries").unwrap();
    static ref STATUS_POLL_ERRORS: IntCounter =
        register_int_counter!("swapsender_status_poll_errors", "Number of signature status queries that failed at the transport level").unwrap();
}

#[derive(Clone)]
pub struct FinalityPoller {
    rpc: Arc<dyn LedgerRpc>,
    poll_interval: Duration,
}

impl FinalityPoller {
    pub fn new(rpc: Arc<dyn LedgerRpc>, poll_interval: Duration) -> Self {
        Self { rpc, poll_interval }
    }

    /// Resolves with `Some` only for a terminal status, `None` when stopped
    /// by the exit signal first. Transport errors are retried at the poll
    /// interval: flaky transport must not be read as non-confirmation.
    pub fn start(
        &self,
        signature: Signature,
        mut exit_signal: watch::Receiver<bool>,
    ) -> JoinHandle<anyhow::Result<Option<FinalizedStatus>>> {
        let rpc = self.rpc.clone();
        let poll_interval = self.poll_interval;
        tokio::spawn(async move {
            loop {
                if *exit_signal.borrow() {
                    debug!("poller for {signature} stopped before finality");
                    return Ok(None);
                }
                STATUS_POLLS.inc();
                match rpc.get_signature_status(&signature).await {
                    Ok(SignatureStatus::Finalized(finalized)) => {
                        debug!(
                            "{} reached {:?} in slot {}",
                            signature, finalized.confirmation_status, finalized.slot
                        );
                        return Ok(Some(finalized));
                    }
                    Ok(SignatureStatus::Processing { slot }) => {
                        trace!("{signature} landed in slot {slot}, below desired commitment");
                    }
                    Ok(SignatureStatus::NotFound) => {
                        trace!("{signature} not seen by cluster yet");
                    }
                    Err(err) => {
                        STATUS_POLL_ERRORS.inc();
                        warn!("status query for {signature} failed, retrying: {err:#}");
                    }
                }
                tokio::select! {
                    res = exit_signal.changed() => {
                        if res.is_err() {
                            return Ok(None);
                        }
                    }
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockLedgerRpc, ScriptedStatus};
    use solana_transaction_status::TransactionConfirmationStatus;
    use std::sync::atomic::Ordering;

    const TICK: Duration = Duration::from_millis(10);

    fn finalized(slot: u64) -> SignatureStatus {
        SignatureStatus::Finalized(FinalizedStatus {
            slot,
            confirmation_status: TransactionConfirmationStatus::Confirmed,
            err: None,
        })
    }

    #[tokio::test]
    async fn keeps_polling_through_transport_errors() {
        let rpc = MockLedgerRpc::new(
            vec![
                ScriptedStatus::TransportError,
                ScriptedStatus::TransportError,
                ScriptedStatus::Status(finalized(7)),
            ],
            vec![1],
        );
        let poller = FinalityPoller::new(rpc.clone(), TICK);
        let (_exit_sender, exit_receiver) = watch::channel(false);
        let result = poller
            .start(Signature::default(), exit_receiver)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.map(|finalized| finalized.slot), Some(7));
        assert_eq!(rpc.status_queries.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn yields_none_when_cancelled_without_finality() {
        let rpc = MockLedgerRpc::new(
            vec![ScriptedStatus::Status(SignatureStatus::NotFound)],
            vec![1],
        );
        let poller = FinalityPoller::new(rpc.clone(), TICK);
        let (exit_sender, exit_receiver) = watch::channel(false);
        let jh = poller.start(Signature::default(), exit_receiver);

        tokio::time::sleep(TICK * 3).await;
        exit_sender.send(true).unwrap();
        let result = jh.await.unwrap().unwrap();
        assert!(result.is_none());
    }
}
