//! Faucet service core logic: the claim workflow and the status read path.

use crate::builder::TransferBuilder;
use crate::config::FaucetConfig;
use crate::database::ThrottleStore;
use crate::error::{FaucetError, FaucetResult, RateLimitScope};
use crate::rpc::{ChainView, RelayGateway};
use crate::session::DisbursementSession;
use crate::signing::SigningCoordinator;
use chrono::Utc;
use serde::Serialize;
use spigot_common::types::{AssetKind, Fixed8, Hash, TransferTransaction};
use spigot_wallet::{UserWallet, WalletError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Informational snapshot rendered on every page, success or rejection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusContext {
    /// Ledger chain height as reported by the node.
    pub height: u64,
    /// Blocks the wallet has ingested.
    pub wallet_height: u64,
    /// Spendable share balance, whole units.
    pub shares: i64,
    /// Spendable coin balance, whole units.
    pub coins: i64,
}

/// Disbursement controller.
///
/// Owns the throttle store and the result session explicitly (no ambient
/// globals) so tests can run isolated instances side by side. The relay and
/// chain collaborators come in as trait handles.
pub struct FaucetService {
    config: FaucetConfig,
    store: ThrottleStore,
    wallet: Arc<UserWallet>,
    builder: TransferBuilder,
    signer: SigningCoordinator,
    relay: Arc<dyn RelayGateway>,
    chain: Arc<dyn ChainView>,
    session: DisbursementSession,
}

impl FaucetService {
    pub fn new(
        config: FaucetConfig,
        store: ThrottleStore,
        wallet: Arc<UserWallet>,
        relay: Arc<dyn RelayGateway>,
        chain: Arc<dyn ChainView>,
    ) -> Self {
        let builder = TransferBuilder::new(
            Fixed8::from_units(config.share_amount),
            Fixed8::from_units(config.coin_amount),
        );
        let signer = SigningCoordinator::new(wallet.clone());
        Self {
            config,
            store,
            wallet,
            builder,
            signer,
            relay,
            chain,
            session: DisbursementSession::new(),
        }
    }

    pub fn config(&self) -> &FaucetConfig {
        &self.config
    }

    /// Run one claim through the full workflow. Returns the relayed
    /// transaction id; every rejection comes back as a [`FaucetError`] whose
    /// `page_message` is shown to the caller.
    pub async fn claim(
        &self,
        address: Option<&str>,
        agreed: Option<&str>,
        client: &str,
    ) -> FaucetResult<Hash> {
        let today = Utc::now().date_naive();
        info!(client, "claim request");

        // 1. Every attempt counts against the client quota, valid or not.
        self.store.record_attempt(client, today);

        // 2. The caller must affirm the guidelines and name a destination.
        if agreed != Some("on") {
            return Err(FaucetError::InvalidInput(
                "You must agree to the guidelines to proceed".to_string(),
            ));
        }
        let address = address
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| {
                FaucetError::InvalidInput("A destination address is required".to_string())
            })?;

        // 3. Per-client daily quota, the attempt just recorded included.
        let attempts = self.store.attempts_today(client, today)?;
        if attempts > self.config.max_attempts_per_day {
            debug!(client, attempts, "client over daily quota");
            return Err(FaucetError::RateLimited {
                scope: RateLimitScope::Client,
            });
        }

        // 4. One disbursement per address per day; the first writer wins.
        if !self.store.claim_address_for_day(address, today)? {
            return Err(FaucetError::RateLimited {
                scope: RateLimitScope::Address,
            });
        }

        // 5. Resolve the address to its script-hash form.
        let destination = UserWallet::resolve_address(address)
            .map_err(|e| FaucetError::InvalidInput(format!("Invalid address: {}", e)))?;

        // 6. Fixed-amount transfer, funded by the wallet.
        let mut tx = self.builder.build(destination);
        self.wallet.fund(&mut tx).await.map_err(|e| match e {
            WalletError::InsufficientFunds { .. } => FaucetError::InsufficientFunds,
            other => FaucetError::Wallet(other),
        })?;

        // 7. Signing workflow; an incomplete signature discards the transfer.
        let tx = self.signer.sign(tx).await?;

        // 8. Hand the signed transfer to network peers.
        if !self.relay.relay(&tx).await? {
            warn!(tx = %tx.id(), "peers rejected the transaction");
            return Err(FaucetError::RelayFailure);
        }

        // 9. Park the result for the success view to consume.
        let id = tx.id();
        info!(client, tx = %id, "disbursement relayed");
        self.session.set(tx).await;
        Ok(id)
    }

    /// Status read path: balances and heights, no mutation.
    pub async fn context(&self) -> FaucetResult<StatusContext> {
        Ok(StatusContext {
            height: self.chain.block_height().await?,
            wallet_height: self.wallet.wallet_height().await,
            shares: self.wallet.balance(AssetKind::Share).await.to_units(),
            coins: self.wallet.balance(AssetKind::Coin).await.to_units(),
        })
    }

    /// True when either balance cannot cover one more disbursement.
    pub fn is_running_dry(&self, ctx: &StatusContext) -> bool {
        ctx.shares < self.config.share_amount || ctx.coins < self.config.coin_amount
    }

    /// Consume the pending result, clearing the slot.
    pub async fn take_last(&self) -> Option<TransferTransaction> {
        self.session.take().await
    }

    /// Reset the wallet's ledger view; the ingestion loop refills it.
    pub async fn rescan_wallet(&self) {
        self.wallet.rescan().await;
    }

    /// One tick of the wallet block-ingestion loop: apply any blocks the
    /// node has beyond the wallet's height. Returns how many were applied.
    pub async fn ingest_blocks(&self) -> FaucetResult<u64> {
        let target = self.chain.block_height().await?;
        let mut applied = 0u64;
        while self.wallet.wallet_height().await < target {
            let next = self.wallet.wallet_height().await;
            match self.chain.fetch_block(next).await? {
                Some(block) => {
                    self.wallet.apply_block(&block).await;
                    applied += 1;
                }
                None => break,
            }
        }
        if applied > 0 {
            debug!(applied, "ingested blocks into wallet");
        }
        Ok(applied)
    }

    /// One tick of the persistence loop: commit throttle records to disk.
    pub async fn persist(&self) -> FaucetResult<()> {
        self.store.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use spigot_common::types::{Block, TransactionOutput};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticRelay {
        accept: bool,
        calls: AtomicUsize,
    }

    impl StaticRelay {
        fn accepting() -> Arc<Self> {
            Arc::new(Self {
                accept: true,
                calls: AtomicUsize::new(0),
            })
        }

        fn rejecting() -> Arc<Self> {
            Arc::new(Self {
                accept: false,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RelayGateway for StaticRelay {
        async fn relay(&self, _tx: &TransferTransaction) -> FaucetResult<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.accept)
        }
    }

    struct StaticChain {
        blocks: Vec<Block>,
    }

    #[async_trait]
    impl ChainView for StaticChain {
        async fn block_height(&self) -> FaucetResult<u64> {
            Ok(self.blocks.len() as u64)
        }

        async fn fetch_block(&self, index: u64) -> FaucetResult<Option<Block>> {
            Ok(self.blocks.get(index as usize).cloned())
        }
    }

    // Several coins per asset: each claim reserves a whole coin until the
    // spend lands in a block, so one big coin would only fund one claim.
    fn funded_block(wallet: &UserWallet) -> Block {
        let mut outputs = Vec::new();
        for _ in 0..4 {
            outputs.push(TransactionOutput {
                asset: AssetKind::Coin,
                value: Fixed8::from_units(250_000),
                script_hash: wallet.script_hash(),
            });
            outputs.push(TransactionOutput {
                asset: AssetKind::Share,
                value: Fixed8::from_units(2_500),
                script_hash: wallet.script_hash(),
            });
        }
        Block {
            index: 0,
            hash: Hash::from_slice(b"genesis"),
            timestamp: 1_700_000_000,
            transactions: vec![TransferTransaction {
                inputs: vec![],
                outputs,
                witnesses: vec![],
            }],
        }
    }

    struct Harness {
        service: FaucetService,
        _dir: tempfile::TempDir,
    }

    async fn harness_with(relay: Arc<StaticRelay>, wallet: UserWallet, funded: bool) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = ThrottleStore::open(dir.path().join("throttle").to_str().unwrap()).unwrap();
        let wallet = Arc::new(wallet);
        let chain = Arc::new(StaticChain {
            blocks: if funded {
                vec![funded_block(&wallet)]
            } else {
                vec![]
            },
        });

        let service = FaucetService::new(
            FaucetConfig::default(),
            store,
            wallet,
            relay,
            chain,
        );
        service.ingest_blocks().await.unwrap();
        Harness {
            service,
            _dir: dir,
        }
    }

    async fn funded_harness(relay: Arc<StaticRelay>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let wallet = UserWallet::create(dir.path().join("w.json"), "pw", "t").unwrap();
        harness_with(relay, wallet, true).await
    }

    fn destination() -> String {
        spigot_common::types::ScriptHash([0x42; 20]).to_address()
    }

    #[tokio::test]
    async fn test_successful_claim_parks_result() {
        let h = funded_harness(StaticRelay::accepting()).await;

        let id = h
            .service
            .claim(Some(&destination()), Some("on"), "10.0.0.1")
            .await
            .unwrap();

        let parked = h.service.take_last().await.unwrap();
        assert_eq!(parked.id(), id);
        assert!(!parked.witnesses.is_empty());
        // Consumed exactly once.
        assert!(h.service.take_last().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_agreement_records_attempt_but_no_address_claim() {
        let h = funded_harness(StaticRelay::accepting()).await;
        let addr = destination();
        let today = Utc::now().date_naive();

        let err = h
            .service
            .claim(Some(&addr), None, "10.0.0.1")
            .await
            .unwrap_err();
        assert_eq!(
            err.page_message(),
            "You must agree to the guidelines to proceed"
        );

        assert_eq!(h.service.store.attempts_today("10.0.0.1", today).unwrap(), 1);
        assert!(!h.service.store.address_claimed(&addr, today).unwrap());
        assert!(h.service.take_last().await.is_none());
    }

    #[tokio::test]
    async fn test_second_claim_same_address_rejected() {
        let h = funded_harness(StaticRelay::accepting()).await;
        let addr = destination();

        h.service
            .claim(Some(&addr), Some("on"), "10.0.0.1")
            .await
            .unwrap();
        let err = h
            .service
            .claim(Some(&addr), Some("on"), "10.0.0.2")
            .await
            .unwrap_err();

        assert_eq!(err.page_message(), "Already requested today");
    }

    #[tokio::test]
    async fn test_fourth_attempt_from_client_rate_limited() {
        let h = funded_harness(StaticRelay::accepting()).await;

        for i in 0..3u8 {
            let addr = spigot_common::types::ScriptHash([i; 20]).to_address();
            h.service
                .claim(Some(&addr), Some("on"), "10.0.0.9")
                .await
                .unwrap();
        }

        let err = h
            .service
            .claim(Some(&destination()), Some("on"), "10.0.0.9")
            .await
            .unwrap_err();
        assert_eq!(err.page_message(), "Too many requests. Try again later");
    }

    #[tokio::test]
    async fn test_unfunded_wallet_yields_insufficient_funds() {
        let relay = StaticRelay::accepting();
        let dir = tempfile::tempdir().unwrap();
        let wallet = UserWallet::create(dir.path().join("w.json"), "pw", "t").unwrap();
        let h = harness_with(relay, wallet, false).await;

        let err = h
            .service
            .claim(Some(&destination()), Some("on"), "10.0.0.1")
            .await
            .unwrap_err();
        assert!(matches!(err, FaucetError::InsufficientFunds));
    }

    #[tokio::test]
    async fn test_incomplete_signature_never_reaches_session_or_relay() {
        let relay = StaticRelay::accepting();
        let dir = tempfile::tempdir().unwrap();
        let cosigner = {
            use k256::ecdsa::SigningKey;
            use rand::rngs::OsRng;
            SigningKey::random(&mut OsRng)
                .verifying_key()
                .to_encoded_point(true)
                .as_bytes()
                .to_vec()
        };
        let wallet =
            UserWallet::create_multisig(dir.path().join("w.json"), "pw", "t", 2, &[cosigner])
                .unwrap();
        let h = harness_with(relay.clone(), wallet, true).await;

        let err = h
            .service
            .claim(Some(&destination()), Some("on"), "10.0.0.1")
            .await
            .unwrap_err();

        assert!(matches!(err, FaucetError::IncompleteSignature));
        assert!(h.service.take_last().await.is_none());
        assert_eq!(relay.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_relay_rejection_leaves_session_empty() {
        let h = funded_harness(StaticRelay::rejecting()).await;

        let err = h
            .service
            .claim(Some(&destination()), Some("on"), "10.0.0.1")
            .await
            .unwrap_err();

        assert!(matches!(err, FaucetError::RelayFailure));
        assert!(h.service.take_last().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_address_rejected() {
        let h = funded_harness(StaticRelay::accepting()).await;

        let err = h
            .service
            .claim(Some("definitely-not-base58!"), Some("on"), "10.0.0.1")
            .await
            .unwrap_err();
        assert!(matches!(err, FaucetError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_context_reports_balances_and_heights() {
        let h = funded_harness(StaticRelay::accepting()).await;

        let ctx = h.service.context().await.unwrap();
        assert_eq!(ctx.height, 1);
        assert_eq!(ctx.wallet_height, 1);
        assert_eq!(ctx.shares, 10_000);
        assert_eq!(ctx.coins, 1_000_000);
        assert!(!h.service.is_running_dry(&ctx));

        let dry = StatusContext {
            shares: 0,
            ..ctx
        };
        assert!(h.service.is_running_dry(&dry));
    }
}
