//! End-to-end claim workflow tests driving the HTTP router with scripted
//! relay and chain collaborators.

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use spigot_common::types::{
    AssetKind, Block, Fixed8, Hash, ScriptHash, TransactionOutput, TransferTransaction,
};
use spigot_faucet::{
    api, ChainView, FaucetConfig, FaucetResult, FaucetService, RelayGateway, ThrottleStore,
};
use spigot_wallet::UserWallet;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

struct AcceptingRelay;

#[async_trait]
impl RelayGateway for AcceptingRelay {
    async fn relay(&self, _tx: &TransferTransaction) -> FaucetResult<bool> {
        Ok(true)
    }
}

struct FixedChain {
    blocks: Vec<Block>,
}

#[async_trait]
impl ChainView for FixedChain {
    async fn block_height(&self) -> FaucetResult<u64> {
        Ok(self.blocks.len() as u64)
    }

    async fn fetch_block(&self, index: u64) -> FaucetResult<Option<Block>> {
        Ok(self.blocks.get(index as usize).cloned())
    }
}

fn funding_block(wallet: &UserWallet) -> Block {
    let mut outputs = Vec::new();
    for _ in 0..4 {
        outputs.push(TransactionOutput {
            asset: AssetKind::Coin,
            value: Fixed8::from_units(10_000),
            script_hash: wallet.script_hash(),
        });
        outputs.push(TransactionOutput {
            asset: AssetKind::Share,
            value: Fixed8::from_units(500),
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

async fn test_app() -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let wallet =
        Arc::new(UserWallet::create(dir.path().join("wallet.json"), "pw", "faucet").unwrap());
    let store = ThrottleStore::open(dir.path().join("throttle").to_str().unwrap()).unwrap();
    let chain = Arc::new(FixedChain {
        blocks: vec![funding_block(&wallet)],
    });

    let service = Arc::new(FaucetService::new(
        FaucetConfig::default(),
        store,
        wallet,
        Arc::new(AcceptingRelay),
        chain,
    ));
    service.ingest_blocks().await.unwrap();

    let static_dir = dir.path().join("static");
    let app = api::router(service, static_dir.to_str().unwrap());
    (app, dir)
}

fn with_peer(mut request: Request<Body>, port: u16) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], port))));
    request
}

async fn post_ask(app: &Router, body: String) -> axum::response::Response {
    let request = Request::builder()
        .method("POST")
        .uri("/ask")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();
    app.clone().oneshot(with_peer(request, 40000)).await.unwrap()
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.clone().oneshot(with_peer(request, 40000)).await.unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn sample_address(tag: u8) -> String {
    ScriptHash([tag; 20]).to_address()
}

#[tokio::test]
async fn test_happy_path_redirects_then_shows_result_once() {
    let (app, _dir) = test_app().await;

    let response = post_ask(
        &app,
        format!("coz_addr={}&do_agree=on", sample_address(1)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/success");

    let response = get(&app, "/success").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("Your request has been relayed to the network"));

    // The slot is consumed; a second visit goes home.
    let response = get(&app, "/success").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/");
}

#[tokio::test]
async fn test_missing_agreement_renders_message() {
    let (app, _dir) = test_app().await;

    let response = post_ask(&app, format!("coz_addr={}", sample_address(2))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("You must agree to the guidelines to proceed"));
}

#[tokio::test]
async fn test_duplicate_address_same_day_rejected() {
    let (app, _dir) = test_app().await;
    let address = sample_address(3);

    let response = post_ask(&app, format!("coz_addr={}&do_agree=on", address)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = post_ask(&app, format!("coz_addr={}&do_agree=on", address)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("Already requested today"));
}

#[tokio::test]
async fn test_fourth_attempt_rate_limited() {
    let (app, _dir) = test_app().await;

    for tag in 10..13u8 {
        let response = post_ask(
            &app,
            format!("coz_addr={}&do_agree=on", sample_address(tag)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    let response = post_ask(
        &app,
        format!("coz_addr={}&do_agree=on", sample_address(13)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("Too many requests. Try again later"));
}

#[tokio::test]
async fn test_landing_page_renders_status() {
    let (app, _dir) = test_app().await;

    let response = get(&app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("Block height: 1"));
    assert!(page.contains("coz_addr"));
}

#[tokio::test]
async fn test_index_variant_sets_come_back_banner() {
    let (app, _dir) = test_app().await;

    let response = get(&app, "/index.html").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("Come back tomorrow"));
}

#[tokio::test]
async fn test_about_page() {
    let (app, _dir) = test_app().await;

    let response = get(&app, "/about").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("once per address per day"));
}
