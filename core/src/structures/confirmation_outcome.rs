use std::time::Duration;

use solana_sdk::clock::Slot;
use solana_sdk::transaction::TransactionError;
use solana_transaction_status::TransactionConfirmationStatus;

#[derive(Clone, Debug, PartialEq)]
pub struct ConfirmedTransaction {
    pub slot: Slot,
    pub confirmation_status: TransactionConfirmationStatus,
    /// Execution-level error: the transaction landed on chain but its
    /// instructions failed. Resending cannot change this outcome.
    pub execution_error: Option<TransactionError>,
    pub elapsed: Duration,
}

/// Terminal result of waiting for a transaction.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfirmationOutcome {
    Confirmed(ConfirmedTransaction),
    /// The blockhash validity window closed before finality was observed.
    /// Not proof of failure: the transaction may still land afterwards, so
    /// callers must treat this as "unknown", never as "rejected".
    BlockheightExceeded { elapsed: Duration },
}

impl ConfirmationOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ConfirmationOutcome::Confirmed(_))
    }

    pub fn execution_error(&self) -> Option<&TransactionError> {
        match self {
            ConfirmationOutcome::Confirmed(confirmed) => confirmed.execution_error.as_ref(),
            ConfirmationOutcome::BlockheightExceeded { .. } => None,
        }
    }
}
