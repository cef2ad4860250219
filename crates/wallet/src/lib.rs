//! User wallet for the spigot refill service.
//!
//! Owns the key material and the local view of spendable outputs. The faucet
//! drives it through a narrow capability surface: resolve an address, fund a
//! transfer, sign it, remember it, and ingest blocks to keep balances
//! current.

pub mod error;
pub mod file;
pub mod signing;

pub use error::{WalletError, WalletResult};
pub use signing::SigningContext;

use crate::file::{AccountFile, WalletFile, WALLET_VERSION};
use k256::ecdsa::{signature::Signer, Signature, SigningKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use spigot_common::types::{
    AssetKind, Block, CoinReference, Fixed8, ScriptHash, TransactionOutput, TransferTransaction,
    SCRIPT_HASH_LENGTH,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Marker byte terminating a verification script.
const CHECKSIG_OPCODE: u8 = 0xAE;

/// Account information held in an opened wallet.
pub struct WalletAccount {
    pub label: String,
    pub script_hash: ScriptHash,
    /// Signatures required to authorize a spend.
    pub threshold: u8,
    /// Compressed public keys of all signers, the local key included.
    pub public_keys: Vec<Vec<u8>>,
    verification: Vec<u8>,
    signing_key: SigningKey,
}

/// An unspent output owned by the wallet.
#[derive(Debug, Clone, Copy)]
pub struct Coin {
    pub reference: CoinReference,
    pub output: TransactionOutput,
}

/// Wallet over a password-protected key file plus an in-memory unspent set
/// rebuilt from ingested blocks.
pub struct UserWallet {
    account: WalletAccount,
    coins: RwLock<HashMap<CoinReference, TransactionOutput>>,
    /// Inputs consumed by locally saved transactions that have not been seen
    /// in a block yet. Excluded from balances and funding.
    pending_spends: RwLock<HashSet<CoinReference>>,
    history: RwLock<Vec<TransferTransaction>>,
    height: RwLock<u64>,
}

impl UserWallet {
    /// Open an existing wallet file. Fails with [`WalletError::Unavailable`]
    /// when the file is missing or the password does not match.
    pub fn open(path: impl AsRef<Path>, password: &str) -> WalletResult<Self> {
        let wallet_file = WalletFile::load(path.as_ref())?;
        let key = wallet_file.unlock(password)?;
        let entry = wallet_file
            .accounts
            .first()
            .ok_or_else(|| WalletError::Unavailable("wallet file has no accounts".to_string()))?;

        let cipher = hex::decode(&entry.cipher).map_err(|e| WalletError::Codec(e.to_string()))?;
        let secret: [u8; 32] = file::seal(&key, &cipher)
            .try_into()
            .map_err(|_| WalletError::Codec("private key has wrong length".to_string()))?;
        let signing_key = SigningKey::from_bytes(&secret.into())
            .map_err(|e| WalletError::Signing(e.to_string()))?;

        let mut public_keys = Vec::with_capacity(entry.public_keys.len());
        for encoded in &entry.public_keys {
            public_keys.push(hex::decode(encoded).map_err(|e| WalletError::Codec(e.to_string()))?);
        }

        let account = Self::build_account(
            entry.label.clone(),
            signing_key,
            public_keys,
            entry.threshold,
        );
        info!(address = %account.script_hash.to_address(), label = %account.label, "opened wallet");
        Ok(Self::from_account(account))
    }

    /// Create a fresh single-signer wallet file and open it.
    pub fn create(path: impl AsRef<Path>, password: &str, label: &str) -> WalletResult<Self> {
        Self::create_multisig(path, password, label, 1, &[])
    }

    /// Create a wallet whose account requires `threshold` signatures out of
    /// the local key plus `cosigners`.
    pub fn create_multisig(
        path: impl AsRef<Path>,
        password: &str,
        label: &str,
        threshold: u8,
        cosigners: &[Vec<u8>],
    ) -> WalletResult<Self> {
        let signing_key = SigningKey::random(&mut OsRng);
        let own_public_key = compressed_public_key(&signing_key);

        let mut public_keys = vec![own_public_key];
        public_keys.extend(cosigners.iter().cloned());

        let salt: [u8; 16] = rand::random();
        let key = file::derive_key(password, &salt);
        let secret: [u8; 32] = signing_key.to_bytes().into();

        let wallet_file = WalletFile {
            version: WALLET_VERSION,
            salt: hex::encode(salt),
            verifier: hex::encode(Sha256::digest(key)),
            accounts: vec![AccountFile {
                label: label.to_string(),
                cipher: hex::encode(file::seal(&key, &secret)),
                public_keys: public_keys.iter().map(hex::encode).collect(),
                threshold,
            }],
        };
        wallet_file.store(path.as_ref())?;

        let account = Self::build_account(label.to_string(), signing_key, public_keys, threshold);
        info!(address = %account.script_hash.to_address(), "created wallet");
        Ok(Self::from_account(account))
    }

    fn build_account(
        label: String,
        signing_key: SigningKey,
        public_keys: Vec<Vec<u8>>,
        threshold: u8,
    ) -> WalletAccount {
        let verification = verification_script(threshold, &public_keys);
        let script_hash = derive_script_hash(&verification);
        WalletAccount {
            label,
            script_hash,
            threshold,
            public_keys,
            verification,
            signing_key,
        }
    }

    fn from_account(account: WalletAccount) -> Self {
        Self {
            account,
            coins: RwLock::new(HashMap::new()),
            pending_spends: RwLock::new(HashSet::new()),
            history: RwLock::new(Vec::new()),
            height: RwLock::new(0),
        }
    }

    /// Resolve a base58 address string to its script-hash form.
    pub fn resolve_address(address: &str) -> WalletResult<ScriptHash> {
        Ok(ScriptHash::from_address(address)?)
    }

    pub fn script_hash(&self) -> ScriptHash {
        self.account.script_hash
    }

    pub fn address(&self) -> String {
        self.account.script_hash.to_address()
    }

    pub fn public_key(&self) -> Vec<u8> {
        compressed_public_key(&self.account.signing_key)
    }

    /// Number of blocks the wallet has ingested.
    pub async fn wallet_height(&self) -> u64 {
        *self.height.read().await
    }

    /// Spendable balance for one asset, pending spends excluded.
    pub async fn balance(&self, asset: AssetKind) -> Fixed8 {
        let coins = self.coins.read().await;
        let pending = self.pending_spends.read().await;
        coins
            .iter()
            .filter(|(reference, output)| output.asset == asset && !pending.contains(*reference))
            .fold(Fixed8::zero(), |acc, (_, output)| acc + output.value)
    }

    /// Spendable coins for one asset.
    pub async fn unspent(&self, asset: AssetKind) -> Vec<Coin> {
        let coins = self.coins.read().await;
        let pending = self.pending_spends.read().await;
        coins
            .iter()
            .filter(|(reference, output)| output.asset == asset && !pending.contains(*reference))
            .map(|(reference, output)| Coin {
                reference: *reference,
                output: *output,
            })
            .collect()
    }

    /// Select inputs covering the transaction's outputs and append a change
    /// output back to the wallet where the selection overshoots. Native-asset
    /// transfers carry no network fee.
    pub async fn fund(&self, tx: &mut TransferTransaction) -> WalletResult<()> {
        let coins = self.coins.read().await;
        let pending = self.pending_spends.read().await;

        for asset in [AssetKind::Share, AssetKind::Coin] {
            let needed = tx.output_total(asset);
            if needed.is_zero() {
                continue;
            }

            let mut available: Vec<(&CoinReference, &TransactionOutput)> = coins
                .iter()
                .filter(|(reference, output)| {
                    output.asset == asset && !pending.contains(*reference)
                })
                .collect();
            // Spend large coins first to keep the input set small.
            available.sort_by(|a, b| b.1.value.cmp(&a.1.value));

            let mut gathered = Fixed8::zero();
            let mut selected = Vec::new();
            for (reference, output) in available {
                if gathered >= needed {
                    break;
                }
                gathered += output.value;
                selected.push(*reference);
            }

            if gathered < needed {
                return Err(WalletError::InsufficientFunds {
                    asset,
                    needed,
                    available: gathered,
                });
            }

            tx.inputs.extend(selected);
            let change = gathered - needed;
            if !change.is_zero() {
                tx.outputs.push(TransactionOutput {
                    asset,
                    value: change,
                    script_hash: self.account.script_hash,
                });
            }
        }
        Ok(())
    }

    /// Start a signing context for a funded transaction.
    pub fn signing_context(&self, tx: &TransferTransaction) -> SigningContext {
        SigningContext::new(
            tx.id(),
            self.account.threshold,
            self.account.verification.clone(),
        )
    }

    /// Contribute the local key's signature to the context.
    pub fn sign(&self, ctx: &mut SigningContext) -> WalletResult<()> {
        let signature: Signature = self.account.signing_key.sign(&ctx.tx_id().0);
        ctx.add_signature(self.public_key(), signature.to_bytes().to_vec());
        debug!(tx = %ctx.tx_id(), "added wallet signature");
        Ok(())
    }

    /// Record a fully signed transaction in the local history and mark its
    /// inputs as spent so later balance queries reflect the pending spend.
    pub async fn save_transaction(&self, tx: &TransferTransaction) {
        let mut pending = self.pending_spends.write().await;
        pending.extend(tx.inputs.iter().copied());
        drop(pending);
        self.history.write().await.push(tx.clone());
        debug!(tx = %tx.id(), "saved transaction to wallet history");
    }

    /// Fold a ledger block into the unspent set: spent inputs leave, outputs
    /// addressed to the wallet arrive.
    pub async fn apply_block(&self, block: &Block) {
        let mut coins = self.coins.write().await;
        let mut pending = self.pending_spends.write().await;
        for tx in &block.transactions {
            for input in &tx.inputs {
                coins.remove(input);
                pending.remove(input);
            }
            let id = tx.id();
            for (index, output) in tx.outputs.iter().enumerate() {
                if output.script_hash == self.account.script_hash {
                    coins.insert(
                        CoinReference {
                            prev_hash: id,
                            prev_index: index as u16,
                        },
                        *output,
                    );
                }
            }
        }
        drop(coins);
        drop(pending);
        *self.height.write().await = block.index + 1;
        debug!(height = block.index, "applied block to wallet");
    }

    /// Drop the unspent set and start ingestion over from the genesis block.
    pub async fn rescan(&self) {
        self.coins.write().await.clear();
        self.pending_spends.write().await.clear();
        self.history.write().await.clear();
        *self.height.write().await = 0;
        info!("wallet reset for rescan");
    }

    pub async fn history(&self) -> Vec<TransferTransaction> {
        self.history.read().await.clone()
    }
}

fn compressed_public_key(signing_key: &SigningKey) -> Vec<u8> {
    signing_key
        .verifying_key()
        .to_encoded_point(true)
        .as_bytes()
        .to_vec()
}

/// Verification script listing the account's signers: threshold, key count,
/// length-prefixed keys, check-multisig marker.
fn verification_script(threshold: u8, public_keys: &[Vec<u8>]) -> Vec<u8> {
    let mut script = vec![threshold, public_keys.len() as u8];
    for key in public_keys {
        script.push(key.len() as u8);
        script.extend_from_slice(key);
    }
    script.push(CHECKSIG_OPCODE);
    script
}

/// Script hash is the first 20 bytes of the script's SHA256 digest.
fn derive_script_hash(script: &[u8]) -> ScriptHash {
    let digest = Sha256::digest(script);
    let mut hash = ScriptHash::default();
    hash.0.copy_from_slice(&digest[..SCRIPT_HASH_LENGTH]);
    hash
}
