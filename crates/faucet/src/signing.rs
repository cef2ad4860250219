//! Drives the wallet's signing capability for a funded transfer.

use crate::error::{FaucetError, FaucetResult};
use spigot_common::types::TransferTransaction;
use spigot_wallet::UserWallet;
use std::sync::Arc;
use tracing::debug;

/// Runs a funded transaction through the wallet signing workflow and checks
/// the resulting context for completeness.
pub struct SigningCoordinator {
    wallet: Arc<UserWallet>,
}

impl SigningCoordinator {
    pub fn new(wallet: Arc<UserWallet>) -> Self {
        Self { wallet }
    }

    /// Collect signatures for `tx`. On a complete context the witness
    /// scripts are attached and the transaction is saved to the wallet's
    /// local history so balance queries reflect the pending spend. An
    /// incomplete context discards the transaction.
    pub async fn sign(&self, mut tx: TransferTransaction) -> FaucetResult<TransferTransaction> {
        let mut ctx = self.wallet.signing_context(&tx);
        self.wallet.sign(&mut ctx)?;

        if !ctx.is_complete() {
            debug!(
                tx = %tx.id(),
                collected = ctx.signature_count(),
                "signature threshold not met, discarding transaction"
            );
            return Err(FaucetError::IncompleteSignature);
        }

        tx.witnesses = ctx.witnesses();
        self.wallet.save_transaction(&tx).await;
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;
    use rand::rngs::OsRng;

    #[tokio::test]
    async fn test_single_signer_wallet_signs_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let wallet =
            Arc::new(UserWallet::create(dir.path().join("w.json"), "pw", "faucet").unwrap());
        let coordinator = SigningCoordinator::new(wallet.clone());

        let signed = coordinator.sign(TransferTransaction::default()).await.unwrap();
        assert_eq!(signed.witnesses.len(), 1);
        assert_eq!(wallet.history().await.len(), 1);
    }

    #[tokio::test]
    async fn test_multisig_below_threshold_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let cosigner = SigningKey::random(&mut OsRng)
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec();
        let wallet = Arc::new(
            UserWallet::create_multisig(dir.path().join("w.json"), "pw", "faucet", 2, &[cosigner])
                .unwrap(),
        );
        let coordinator = SigningCoordinator::new(wallet.clone());

        match coordinator.sign(TransferTransaction::default()).await {
            Err(FaucetError::IncompleteSignature) => {}
            other => panic!("expected IncompleteSignature, got {:?}", other.map(|_| ())),
        }
        // The discarded transaction never reaches the wallet history.
        assert!(wallet.history().await.is_empty());
    }
}
