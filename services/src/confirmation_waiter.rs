// Coordinates one broadcaster and one finality poller per transaction and
// races them against the blockhash validity window.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use log::{debug, info, trace, warn};
use prometheus::{register_int_counter, IntCounter};
use swap_sender_core::ledger_rpc::LedgerRpc;
use swap_sender_core::structures::confirmation_outcome::{
    ConfirmationOutcome, ConfirmedTransaction,
};
use swap_sender_core::structures::prepared_transaction::PreparedTransaction;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::finality_poller::FinalityPoller;
use crate::transaction_broadcaster::TransactionBroadcaster;

lazy_static::lazy_static! {
    static ref TXS_CONFIRMED: IntCounter =
        register_int_counter!("swapsender_txs_confirmed", "Number of transactions observed at a terminal status").unwrap();
    static ref TXS_EXPIRED: IntCounter =
        register_int_counter!("swapsender_txs_expired", "Number of transactions whose validity window closed unconfirmed").unwrap();
}

/// Intervals driving the send-and-confirm loop. The defaults balance network
/// load against responsiveness to the validity window.
#[derive(Clone, Copy, Debug)]
pub struct WaiterConfig {
    pub resend_interval: Duration,
    pub status_poll_interval: Duration,
    pub height_poll_interval: Duration,
    /// Extra wall-clock ceiling on top of the blockheight deadline. The
    /// deadline itself always derives from the chain tip, never from wall
    /// clock alone.
    pub max_wait: Option<Duration>,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            resend_interval: Duration::from_secs(2),
            status_poll_interval: Duration::from_secs(2),
            height_poll_interval: Duration::from_secs(5),
            max_wait: None,
        }
    }
}

#[derive(Clone)]
pub struct ConfirmationWaiter {
    rpc: Arc<dyn LedgerRpc>,
    config: WaiterConfig,
}

impl ConfirmationWaiter {
    pub fn new(rpc: Arc<dyn LedgerRpc>, config: WaiterConfig) -> Self {
        Self { rpc, config }
    }

    /// Rebroadcasts `transaction` and polls for its status until the cluster
    /// reports a terminal state or the validity window closes. Both
    /// background tasks are joined before this returns, so no resend or
    /// status query happens after the outcome is handed back.
    pub async fn wait_for_confirmation(
        &self,
        transaction: &PreparedTransaction,
    ) -> anyhow::Result<ConfirmationOutcome> {
        let started_at = Instant::now();
        let last_valid_block_height = transaction.expiry.last_valid_block_height;
        info!(
            "sending {} (valid until block height {})",
            transaction.signature, last_valid_block_height
        );

        let (exit_sender, exit_receiver) = watch::channel(false);

        let broadcaster =
            TransactionBroadcaster::new(self.rpc.clone(), self.config.resend_interval);
        let broadcaster_jh = broadcaster.start(transaction.clone(), exit_receiver.clone());

        let poller = FinalityPoller::new(self.rpc.clone(), self.config.status_poll_interval);
        let mut poller_jh = poller.start(transaction.signature, exit_receiver);

        let finalized = tokio::select! {
            res = &mut poller_jh => res.context("join finality poller")??,
            _ = self.blockheight_deadline(last_valid_block_height) => {
                let _ = exit_sender.send(true);
                // a confirmation observed while tearing down still wins over
                // the deadline
                poller_jh.await.context("join finality poller")??
            }
            _ = wall_clock_ceiling(self.config.max_wait) => {
                warn!(
                    "wall clock ceiling reached before blockheight deadline for {}",
                    transaction.signature
                );
                let _ = exit_sender.send(true);
                poller_jh.await.context("join finality poller")??
            }
        };

        let _ = exit_sender.send(true);
        broadcaster_jh.await.context("join broadcaster")??;

        let elapsed = started_at.elapsed();
        let outcome = match finalized {
            Some(finalized) => {
                TXS_CONFIRMED.inc();
                info!(
                    "{} confirmed in slot {} after {:.3}s",
                    transaction.signature,
                    finalized.slot,
                    elapsed.as_secs_f32()
                );
                ConfirmationOutcome::Confirmed(ConfirmedTransaction {
                    slot: finalized.slot,
                    confirmation_status: finalized.confirmation_status,
                    execution_error: finalized.err,
                    elapsed,
                })
            }
            None => {
                TXS_EXPIRED.inc();
                info!(
                    "validity window for {} closed after {:.3}s without confirmation",
                    transaction.signature,
                    elapsed.as_secs_f32()
                );
                ConfirmationOutcome::BlockheightExceeded { elapsed }
            }
        };
        Ok(outcome)
    }

    /// Resolves once the chain tip passes `last_valid_block_height`. Height
    /// query errors are retried at the same cadence.
    async fn blockheight_deadline(&self, last_valid_block_height: u64) {
        loop {
            match self.rpc.get_block_height().await {
                Ok(height) if height > last_valid_block_height => {
                    debug!(
                        "block height {height} passed last valid height {last_valid_block_height}"
                    );
                    return;
                }
                Ok(height) => {
                    trace!(
                        "block height {height} within validity window (last valid {last_valid_block_height})"
                    );
                }
                Err(err) => {
                    warn!("block height query failed, retrying: {err:#}");
                }
            }
            tokio::time::sleep(self.config.height_poll_interval).await;
        }
    }
}

async fn wall_clock_ceiling(max_wait: Option<Duration>) {
    match max_wait {
        Some(limit) => tokio::time::sleep(limit).await,
        None => futures::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{prepared_transaction_for_tests, MockLedgerRpc, ScriptedStatus};
    use solana_transaction_status::TransactionConfirmationStatus;
    use std::sync::atomic::Ordering;
    use swap_sender_core::structures::signature_status::{FinalizedStatus, SignatureStatus};

    const TICK: Duration = Duration::from_millis(10);

    fn test_config() -> WaiterConfig {
        WaiterConfig {
            resend_interval: TICK,
            status_poll_interval: TICK,
            height_poll_interval: TICK,
            max_wait: None,
        }
    }

    fn finalized(
        slot: u64,
        err: Option<solana_sdk::transaction::TransactionError>,
    ) -> ScriptedStatus {
        ScriptedStatus::Status(SignatureStatus::Finalized(FinalizedStatus {
            slot,
            confirmation_status: TransactionConfirmationStatus::Confirmed,
            err,
        }))
    }

    async fn run_waiter(
        rpc: Arc<MockLedgerRpc>,
        config: WaiterConfig,
        last_valid_block_height: u64,
    ) -> ConfirmationOutcome {
        let waiter = ConfirmationWaiter::new(rpc, config);
        let transaction = prepared_transaction_for_tests(last_valid_block_height);
        tokio::time::timeout(
            Duration::from_secs(2),
            waiter.wait_for_confirmation(&transaction),
        )
        .await
        .expect("waiter must resolve well before the harness timeout")
        .expect("waiter must not error")
    }

    #[tokio::test]
    async fn confirms_after_initial_not_found() {
        let rpc = MockLedgerRpc::new(
            vec![
                ScriptedStatus::Status(SignatureStatus::NotFound),
                finalized(5, None),
            ],
            vec![10],
        );
        let outcome = run_waiter(rpc.clone(), test_config(), 100).await;

        let ConfirmationOutcome::Confirmed(confirmed) = outcome else {
            panic!("expected confirmation, got {outcome:?}");
        };
        assert_eq!(confirmed.slot, 5);
        assert!(confirmed.execution_error.is_none());
        // first query not found, second terminal
        assert_eq!(rpc.status_queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expires_when_blockheight_passes_window() {
        let rpc = MockLedgerRpc::new(
            vec![ScriptedStatus::Status(SignatureStatus::NotFound)],
            vec![90, 95, 99, 101],
        );
        let outcome = run_waiter(rpc.clone(), test_config(), 100).await;
        assert!(matches!(
            outcome,
            ConfirmationOutcome::BlockheightExceeded { .. }
        ));

        // cancellation completeness: both activities are fully stopped
        let sends = rpc.sends.load(Ordering::SeqCst);
        let status_queries = rpc.status_queries.load(Ordering::SeqCst);
        tokio::time::sleep(TICK * 5).await;
        assert_eq!(rpc.sends.load(Ordering::SeqCst), sends);
        assert_eq!(rpc.status_queries.load(Ordering::SeqCst), status_queries);
    }

    #[tokio::test]
    async fn surfaces_execution_error_on_confirmed_transaction() {
        let rpc = MockLedgerRpc::new(
            vec![finalized(
                8,
                Some(solana_sdk::transaction::TransactionError::InsufficientFundsForFee),
            )],
            vec![10],
        );
        let outcome = run_waiter(rpc, test_config(), 100).await;

        assert!(outcome.is_confirmed());
        assert_eq!(
            outcome.execution_error(),
            Some(&solana_sdk::transaction::TransactionError::InsufficientFundsForFee),
            "a confirmed transaction with an on-chain error is a failed swap, not a success"
        );
    }

    #[tokio::test]
    async fn transport_errors_during_polling_do_not_end_the_wait() {
        let rpc = MockLedgerRpc::new(
            vec![
                ScriptedStatus::TransportError,
                ScriptedStatus::Status(SignatureStatus::NotFound),
                ScriptedStatus::TransportError,
                finalized(9, None),
            ],
            vec![10],
        );
        let outcome = run_waiter(rpc, test_config(), 100).await;
        assert!(outcome.is_confirmed());
    }

    #[tokio::test]
    async fn resend_cadence_does_not_change_the_outcome() {
        // aggressive resending and a single send must land on the same
        // terminal status; the cluster dedups by signature
        let script = || {
            vec![
                ScriptedStatus::Status(SignatureStatus::NotFound),
                ScriptedStatus::Status(SignatureStatus::Processing { slot: 4 }),
                finalized(5, None),
            ]
        };

        let aggressive = MockLedgerRpc::new(script(), vec![10]);
        let config = WaiterConfig {
            resend_interval: Duration::from_millis(1),
            ..test_config()
        };
        let outcome_aggressive = run_waiter(aggressive.clone(), config, 100).await;

        let lazy = MockLedgerRpc::new(script(), vec![10]);
        let config = WaiterConfig {
            resend_interval: Duration::from_secs(3600),
            ..test_config()
        };
        let outcome_lazy = run_waiter(lazy.clone(), config, 100).await;

        assert!(aggressive.sends.load(Ordering::SeqCst) > lazy.sends.load(Ordering::SeqCst));
        assert_eq!(lazy.sends.load(Ordering::SeqCst), 1);

        let slot_of = |outcome: &ConfirmationOutcome| match outcome {
            ConfirmationOutcome::Confirmed(confirmed) => confirmed.slot,
            other => panic!("expected confirmation, got {other:?}"),
        };
        assert_eq!(slot_of(&outcome_aggressive), slot_of(&outcome_lazy));
        assert!(outcome_aggressive.execution_error().is_none());
        assert!(outcome_lazy.execution_error().is_none());
    }

    #[tokio::test]
    async fn wall_clock_ceiling_bounds_the_wait_when_height_stalls() {
        let rpc = MockLedgerRpc::new(
            vec![ScriptedStatus::Status(SignatureStatus::NotFound)],
            vec![10],
        );
        let config = WaiterConfig {
            max_wait: Some(TICK * 5),
            ..test_config()
        };
        let outcome = run_waiter(rpc, config, 100).await;
        assert!(matches!(
            outcome,
            ConfirmationOutcome::BlockheightExceeded { .. }
        ));
    }
}
