// Resend pump for one signed transaction. It keeps pushing the identical
// wire bytes at the cluster until the coordinator tells it to stop.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace};
use prometheus::{register_int_counter, IntCounter};
use swap_sender_core::ledger_rpc::LedgerRpc;
use swap_sender_core::structures::prepared_transaction::PreparedTransaction;
use swap_sender_core::AnyhowJoinHandle;
use tokio::sync::watch;

lazy_static::lazy_static! {
    static ref TXS_RESENT: IntCounter =
        register_int_counter!("swapsender_txs_resent", "Number of times the wire transaction was rebroadcast").unwrap();
    static ref TXS_RESEND_ERRORS: IntCounter =
        register_int_counter!("swapsender_txs_resend_errors", "Number of rebroadcast attempts that failed at the transport level").unwrap();
}

/// Has no success or failure concept of its own: the cluster dedups by
/// signature, so resubmitting an already-landed transaction is harmless, and
/// transport errors are swallowed rather than aborting the loop.
#[derive(Clone)]
pub struct TransactionBroadcaster {
    rpc: Arc<dyn LedgerRpc>,
    resend_interval: Duration,
}

impl TransactionBroadcaster {
    pub fn new(rpc: Arc<dyn LedgerRpc>, resend_interval: Duration) -> Self {
        Self {
            rpc,
            resend_interval,
        }
    }

    /// Stops as soon as the exit signal flips, even mid-interval; the payload
    /// is never mutated or re-signed.
    pub fn start(
        &self,
        transaction: PreparedTransaction,
        mut exit_signal: watch::Receiver<bool>,
    ) -> AnyhowJoinHandle {
        let rpc = self.rpc.clone();
        let resend_interval = self.resend_interval;
        tokio::spawn(async move {
            loop {
                if *exit_signal.borrow() {
                    break;
                }
                match rpc.send_transaction(&transaction.wire_transaction).await {
                    Ok(_) => {
                        TXS_RESENT.inc();
                        trace!("rebroadcast {}", transaction.signature);
                    }
                    Err(err) => {
                        // expected for duplicate submissions and flaky transport
                        TXS_RESEND_ERRORS.inc();
                        debug!("rebroadcast of {} failed: {err:#}", transaction.signature);
                    }
                }
                tokio::select! {
                    res = exit_signal.changed() => {
                        if res.is_err() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(resend_interval) => {}
                }
            }
            debug!("broadcaster for {} stopped", transaction.signature);
            Ok(())
        })
    }
}
