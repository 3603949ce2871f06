// Scripted stand-in for the cluster: plays back a fixed sequence of status
// observations and a fixed height progression, counting every call. The last
// script entry repeats forever, so `[NotFound]` models a transaction the
// cluster never sees.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use async_trait::async_trait;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{Transaction, VersionedTransaction};
use swap_sender_core::ledger_rpc::LedgerRpc;
use swap_sender_core::structures::prepared_transaction::{PreparedTransaction, WireTransaction};
use swap_sender_core::structures::signature_status::SignatureStatus;

#[derive(Clone, Debug)]
pub enum ScriptedStatus {
    Status(SignatureStatus),
    TransportError,
}

pub struct MockLedgerRpc {
    statuses: Mutex<VecDeque<ScriptedStatus>>,
    heights: Mutex<VecDeque<u64>>,
    pub sends: AtomicU64,
    pub status_queries: AtomicU64,
    pub height_queries: AtomicU64,
    pub fail_sends: AtomicBool,
}

impl MockLedgerRpc {
    pub fn new(statuses: Vec<ScriptedStatus>, heights: Vec<u64>) -> Arc<Self> {
        assert!(!statuses.is_empty(), "status script must not be empty");
        assert!(!heights.is_empty(), "height script must not be empty");
        Arc::new(Self {
            statuses: Mutex::new(statuses.into()),
            heights: Mutex::new(heights.into()),
            sends: AtomicU64::new(0),
            status_queries: AtomicU64::new(0),
            height_queries: AtomicU64::new(0),
            fail_sends: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl LedgerRpc for MockLedgerRpc {
    async fn send_transaction(
        &self,
        _wire_transaction: &WireTransaction,
    ) -> anyhow::Result<Signature> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        if self.fail_sends.load(Ordering::SeqCst) {
            bail!("simulated transport error on send");
        }
        Ok(Signature::default())
    }

    async fn get_signature_status(
        &self,
        _signature: &Signature,
    ) -> anyhow::Result<SignatureStatus> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        let entry = {
            let mut script = self.statuses.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            }
        };
        match entry {
            ScriptedStatus::Status(status) => Ok(status),
            ScriptedStatus::TransportError => bail!("simulated transport error on status query"),
        }
    }

    async fn get_block_height(&self) -> anyhow::Result<u64> {
        self.height_queries.fetch_add(1, Ordering::SeqCst);
        let mut heights = self.heights.lock().unwrap();
        if heights.len() > 1 {
            Ok(heights.pop_front().unwrap())
        } else {
            Ok(*heights.front().unwrap())
        }
    }
}

pub fn prepared_transaction_for_tests(last_valid_block_height: u64) -> PreparedTransaction {
    let mut tx = Transaction::default();
    tx.signatures = vec![Signature::from([7u8; 64])];
    let wire = bincode::serialize(&VersionedTransaction::from(tx)).unwrap();
    PreparedTransaction::from_wire(wire, last_valid_block_height).unwrap()
}
