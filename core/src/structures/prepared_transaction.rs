use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use thiserror::Error;

pub type WireTransaction = Vec<u8>;

/// Validity window attached to a transaction. The cluster is guaranteed to
/// reject the transaction once the chain tip passes `last_valid_block_height`,
/// which is what bounds how long resending can make sense.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockhashExpiry {
    pub recent_blockhash: Hash,
    pub last_valid_block_height: u64,
}

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("failed to deserialize wire transaction: {0}")]
    MalformedPayload(#[from] bincode::Error),
    #[error("transaction has no signatures")]
    MissingSignature,
}

/// A fully signed transaction ready for broadcast, kept in the exact wire
/// encoding that goes out on every resend. The first signature is the
/// cluster's dedup key and stays stable across resubmissions.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedTransaction {
    pub signature: Signature,
    pub wire_transaction: WireTransaction,
    pub expiry: BlockhashExpiry,
}

impl PreparedTransaction {
    pub fn from_wire(
        wire_transaction: WireTransaction,
        last_valid_block_height: u64,
    ) -> Result<Self, PrepareError> {
        let tx = bincode::deserialize::<VersionedTransaction>(&wire_transaction)?;
        let signature = tx
            .signatures
            .first()
            .copied()
            .ok_or(PrepareError::MissingSignature)?;
        let recent_blockhash = *tx.message.recent_blockhash();
        Ok(Self {
            signature,
            wire_transaction,
            expiry: BlockhashExpiry {
                recent_blockhash,
                last_valid_block_height,
            },
        })
    }

    /// Human-usable link for the signature; valid before any confirmation.
    pub fn explorer_url(&self) -> String {
        format!("https://solscan.io/tx/{}", self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::transaction::Transaction;

    fn signed_wire_transaction() -> WireTransaction {
        let mut tx = Transaction::default();
        tx.signatures = vec![Signature::from([7u8; 64])];
        bincode::serialize(&VersionedTransaction::from(tx)).unwrap()
    }

    #[test]
    fn from_wire_extracts_signature_and_blockhash() {
        let prepared = PreparedTransaction::from_wire(signed_wire_transaction(), 1234).unwrap();
        assert_eq!(prepared.signature, Signature::from([7u8; 64]));
        assert_eq!(prepared.expiry.last_valid_block_height, 1234);
        assert_eq!(prepared.expiry.recent_blockhash, Hash::default());
    }

    #[test]
    fn from_wire_rejects_garbage() {
        let result = PreparedTransaction::from_wire(vec![0xde, 0xad, 0xbe, 0xef], 1);
        assert!(matches!(result, Err(PrepareError::MalformedPayload(_))));
    }

    #[test]
    fn from_wire_rejects_unsigned_transaction() {
        let wire =
            bincode::serialize(&VersionedTransaction::from(Transaction::default())).unwrap();
        let result = PreparedTransaction::from_wire(wire, 1);
        assert!(matches!(result, Err(PrepareError::MissingSignature)));
    }

    #[test]
    fn explorer_url_points_at_solscan() {
        let prepared = PreparedTransaction::from_wire(signed_wire_transaction(), 1).unwrap();
        assert_eq!(
            prepared.explorer_url(),
            format!("https://solscan.io/tx/{}", prepared.signature)
        );
    }
}
