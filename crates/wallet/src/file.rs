//! On-disk wallet file format.
//!
//! Key material is stored XOR-sealed under an iterated-SHA256 key derived
//! from the wallet password. A verifier digest of the derived key is kept so
//! a wrong password is rejected before any key bytes are interpreted.

use crate::error::{WalletError, WalletResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

pub const WALLET_VERSION: u32 = 1;

const KDF_ROUNDS: usize = 16_384;

/// Serialized wallet file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletFile {
    pub version: u32,
    /// Hex-encoded KDF salt.
    pub salt: String,
    /// Hex-encoded SHA256 of the derived key, used as a password check.
    pub verifier: String,
    pub accounts: Vec<AccountFile>,
}

/// One account entry in the wallet file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountFile {
    pub label: String,
    /// Hex-encoded private key, XORed with the derived keystream.
    pub cipher: String,
    /// Hex-encoded compressed public keys of all signers of this account,
    /// the local key included.
    pub public_keys: Vec<String>,
    /// Number of signatures required to authorize a spend.
    pub threshold: u8,
}

impl WalletFile {
    pub fn load(path: &Path) -> WalletResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            WalletError::Unavailable(format!("cannot read wallet at {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| WalletError::Codec(e.to_string()))
    }

    pub fn store(&self, path: &Path) -> WalletResult<()> {
        let raw = serde_json::to_string_pretty(self).map_err(|e| WalletError::Codec(e.to_string()))?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Derive the sealing key and check it against the stored verifier.
    pub fn unlock(&self, password: &str) -> WalletResult<[u8; 32]> {
        let salt = hex::decode(&self.salt).map_err(|e| WalletError::Codec(e.to_string()))?;
        let key = derive_key(password, &salt);
        let verifier = hex::encode(Sha256::digest(key));
        if verifier != self.verifier {
            return Err(WalletError::Unavailable("wrong wallet password".to_string()));
        }
        Ok(key)
    }
}

/// Iterated SHA256 key derivation over salt and password.
pub fn derive_key(password: &str, salt: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let mut digest = hasher.finalize();
    for _ in 0..KDF_ROUNDS {
        digest = Sha256::digest(digest);
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest);
    key
}

/// XOR `data` with a keystream expanded from `key`. Symmetric: sealing and
/// unsealing are the same operation.
pub fn seal(key: &[u8; 32], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut counter = 0u64;
    let mut stream = Vec::new();
    while stream.len() < data.len() {
        let mut hasher = Sha256::new();
        hasher.update(key);
        hasher.update(counter.to_be_bytes());
        stream.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    for (i, byte) in data.iter().enumerate() {
        out.push(byte ^ stream[i]);
    }
    out
}
