//! Single-slot mailbox holding the most recent successful disbursement.

use spigot_common::types::TransferTransaction;
use tokio::sync::Mutex;

/// Capacity-1 slot between a successful claim and the result view.
///
/// `set` overwrites (last write wins, by design of the single-slot scheme);
/// `take` atomically reads and clears so the result is displayed exactly
/// once.
#[derive(Default)]
pub struct DisbursementSession {
    slot: Mutex<Option<TransferTransaction>>,
}

impl DisbursementSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, tx: TransferTransaction) {
        *self.slot.lock().await = Some(tx);
    }

    pub async fn take(&self) -> Option<TransferTransaction> {
        self.slot.lock().await.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spigot_common::types::{AssetKind, Fixed8, ScriptHash, TransactionOutput};

    fn sample_tx(tag: u8) -> TransferTransaction {
        TransferTransaction {
            inputs: vec![],
            outputs: vec![TransactionOutput {
                asset: AssetKind::Coin,
                value: Fixed8::from_units(i64::from(tag)),
                script_hash: ScriptHash([tag; 20]),
            }],
            witnesses: vec![],
        }
    }

    #[tokio::test]
    async fn test_take_returns_value_exactly_once() {
        let session = DisbursementSession::new();
        session.set(sample_tx(1)).await;

        assert_eq!(session.take().await, Some(sample_tx(1)));
        assert_eq!(session.take().await, None);
    }

    #[tokio::test]
    async fn test_take_on_empty_slot() {
        let session = DisbursementSession::new();
        assert_eq!(session.take().await, None);
    }

    #[tokio::test]
    async fn test_set_overwrites_pending_result() {
        let session = DisbursementSession::new();
        session.set(sample_tx(1)).await;
        session.set(sample_tx(2)).await;

        assert_eq!(session.take().await, Some(sample_tx(2)));
        assert_eq!(session.take().await, None);
    }
}
