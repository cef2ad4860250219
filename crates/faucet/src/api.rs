//! HTTP surface for the faucet service.

use crate::pages::{self, PageState};
use crate::service::{FaucetService, StatusContext};
use axum::{
    extract::{ConnectInfo, Form, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

/// Claim form fields, both optional so their absence renders a message
/// instead of a 422.
#[derive(Debug, Deserialize)]
pub struct AskForm {
    pub coz_addr: Option<String>,
    pub do_agree: Option<String>,
}

/// Build the application router around a service handle.
pub fn router(service: Arc<FaucetService>, static_dir: &str) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/index.html", get(index_handler))
        .route("/ask", post(ask_handler))
        .route("/success", get(success_handler))
        .route("/about", get(about_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// The status context degrades to zeros when the node RPC is unreachable;
/// the page stays renderable either way.
async fn context_or_default(service: &FaucetService) -> StatusContext {
    match service.context().await {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!(error = %e, "status context unavailable");
            StatusContext::default()
        }
    }
}

/// Landing page.
pub async fn home_handler(State(service): State<Arc<FaucetService>>) -> Html<String> {
    let ctx = context_or_default(&service).await;
    pages::landing(&ctx, &PageState::default())
}

/// Landing page variant with the come-back banner and low-funds warning.
pub async fn index_handler(State(service): State<Arc<FaucetService>>) -> Html<String> {
    let ctx = context_or_default(&service).await;
    let low_funds = service.is_running_dry(&ctx);
    if low_funds {
        warn!("faucet balances below one disbursement");
    }
    let state = PageState {
        come_back: true,
        low_funds,
        ..Default::default()
    };
    pages::landing(&ctx, &state)
}

/// Claim handler: runs the workflow, redirecting to the result view on
/// success and re-rendering the landing page with a message otherwise.
pub async fn ask_handler(
    State(service): State<Arc<FaucetService>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Form(form): Form<AskForm>,
) -> Response {
    let client = peer.ip().to_string();

    match service
        .claim(form.coz_addr.as_deref(), form.do_agree.as_deref(), &client)
        .await
    {
        Ok(_) => Redirect::to("/success").into_response(),
        Err(e) => {
            info!(client, error = %e, "claim rejected");
            let ctx = context_or_default(&service).await;
            let state = PageState {
                error: Some(e.page_message()),
                addr: form.coz_addr,
                ..Default::default()
            };
            pages::landing(&ctx, &state).into_response()
        }
    }
}

/// Result view: consumes the pending disbursement exactly once.
pub async fn success_handler(State(service): State<Arc<FaucetService>>) -> Response {
    match service.take_last().await {
        None => Redirect::to("/").into_response(),
        Some(tx) => {
            let ctx = context_or_default(&service).await;
            let page = pages::success(&ctx, &tx);
            // The spend is final; rebuild the wallet view from the ledger.
            service.rescan_wallet().await;
            page.into_response()
        }
    }
}

pub async fn about_handler() -> &'static str {
    "Spigot hands out a fixed round of testnet share and coin, once per address per day."
}
