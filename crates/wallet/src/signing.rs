//! Signing context: collects the signatures required to authorize a
//! transfer and reports completeness against the account threshold.

use spigot_common::types::{Hash, Witness};
use std::collections::BTreeMap;

/// In-progress authorization for one transaction.
///
/// Signatures are keyed by the compressed public key of the signer so a
/// double-sign from the same key never counts twice toward the threshold.
#[derive(Debug, Clone)]
pub struct SigningContext {
    tx_id: Hash,
    threshold: u8,
    verification: Vec<u8>,
    signatures: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl SigningContext {
    pub fn new(tx_id: Hash, threshold: u8, verification: Vec<u8>) -> Self {
        Self {
            tx_id,
            threshold,
            verification,
            signatures: BTreeMap::new(),
        }
    }

    pub fn tx_id(&self) -> Hash {
        self.tx_id
    }

    pub fn add_signature(&mut self, public_key: Vec<u8>, signature: Vec<u8>) {
        self.signatures.insert(public_key, signature);
    }

    /// True once the authorization threshold is met.
    pub fn is_complete(&self) -> bool {
        self.signatures.len() >= usize::from(self.threshold)
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// Produce the witness set for the signed transaction. Invocation data is
    /// the collected signatures in public-key order, mirroring the
    /// verification script's signer list.
    pub fn witnesses(&self) -> Vec<Witness> {
        let mut invocation = Vec::new();
        for signature in self.signatures.values() {
            invocation.push(signature.len() as u8);
            invocation.extend_from_slice(signature);
        }
        vec![Witness {
            invocation,
            verification: self.verification.clone(),
        }]
    }
}
