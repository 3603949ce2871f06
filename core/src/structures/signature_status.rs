use solana_sdk::clock::Slot;
use solana_sdk::transaction::TransactionError;
use solana_transaction_status::TransactionConfirmationStatus;

/// Terminal view of a signature: the cluster durably recorded the
/// transaction. `err` carries the execution-level error when the transaction
/// landed but its instructions failed.
#[derive(Clone, Debug, PartialEq)]
pub struct FinalizedStatus {
    pub slot: Slot,
    pub confirmation_status: TransactionConfirmationStatus,
    pub err: Option<TransactionError>,
}

/// One observation of ledger state for a signature.
#[derive(Clone, Debug, PartialEq)]
pub enum SignatureStatus {
    /// Not seen by the cluster (yet).
    NotFound,
    /// Landed in a block but still below the desired commitment.
    Processing { slot: Slot },
    /// Reached the desired commitment; never reverts.
    Finalized(FinalizedStatus),
}

impl SignatureStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SignatureStatus::Finalized(_))
    }
}
