//! Shapes the fixed two-output disbursement transfer.

use spigot_common::types::{AssetKind, Fixed8, ScriptHash, TransactionOutput, TransferTransaction};

/// Builds unsigned disbursement transfers.
///
/// Amounts are server-side policy and never come from the request, so a
/// caller cannot over-withdraw by shaping the form input. Input selection,
/// fees and balance checks stay with the wallet.
#[derive(Debug, Clone)]
pub struct TransferBuilder {
    share_amount: Fixed8,
    coin_amount: Fixed8,
}

impl TransferBuilder {
    pub fn new(share_amount: Fixed8, coin_amount: Fixed8) -> Self {
        Self {
            share_amount,
            coin_amount,
        }
    }

    pub fn share_amount(&self) -> Fixed8 {
        self.share_amount
    }

    pub fn coin_amount(&self) -> Fixed8 {
        self.coin_amount
    }

    /// Produce the unsigned transfer: exactly two outputs, one per asset
    /// kind, both to `destination`.
    pub fn build(&self, destination: ScriptHash) -> TransferTransaction {
        TransferTransaction {
            inputs: vec![],
            outputs: vec![
                TransactionOutput {
                    asset: AssetKind::Coin,
                    value: self.coin_amount,
                    script_hash: destination,
                },
                TransactionOutput {
                    asset: AssetKind::Share,
                    value: self.share_amount,
                    script_hash: destination,
                },
            ],
            witnesses: vec![],
        }
    }
}
