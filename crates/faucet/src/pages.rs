//! Server-rendered pages. Rendering is deliberately narrow: plain HTML
//! assembled around the status context, with layout left to the stylesheet
//! under /static.

use crate::service::StatusContext;
use axum::response::Html;
use spigot_common::types::TransferTransaction;

/// Per-render page state for the landing view.
#[derive(Debug, Clone, Default)]
pub struct PageState {
    /// Rejection message, if the last claim failed.
    pub error: Option<String>,
    /// Echo of the submitted address.
    pub addr: Option<String>,
    /// Show the come-back-tomorrow banner.
    pub come_back: bool,
    /// Either balance is below one disbursement.
    pub low_funds: bool,
}

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn shell(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body>
{body}
</body>
</html>
"#
    ))
}

fn status_block(ctx: &StatusContext) -> String {
    format!(
        r#"<div class="status">
<span>Block height: {}</span>
<span>Wallet height: {}</span>
<span>Share balance: {}</span>
<span>Coin balance: {}</span>
</div>"#,
        ctx.height, ctx.wallet_height, ctx.shares, ctx.coins
    )
}

/// Landing page with the claim form, rendered for every outcome.
pub fn landing(ctx: &StatusContext, state: &PageState) -> Html<String> {
    let mut body = String::from("<h1>Spigot refill station</h1>\n");
    body.push_str(&status_block(ctx));

    if let Some(message) = &state.error {
        body.push_str(&format!(
            "<div class=\"error\">{}</div>\n",
            escape(message)
        ));
    }
    if state.come_back {
        body.push_str("<div class=\"notice\">One round per address per day. Come back tomorrow.</div>\n");
    }
    if state.low_funds {
        body.push_str(
            "<div class=\"notice\">The faucet is running low on assets. Deposits welcome.</div>\n",
        );
    }

    let addr = state.addr.as_deref().map(escape).unwrap_or_default();
    body.push_str(&format!(
        r#"<form action="/ask" method="post">
<label for="coz_addr">Destination address</label>
<input type="text" id="coz_addr" name="coz_addr" value="{addr}">
<label><input type="checkbox" name="do_agree" value="on"> I agree to the guidelines</label>
<button type="submit">Request assets</button>
</form>"#
    ));

    shell("Spigot refill station", &body)
}

/// Success page showing the relayed transaction.
pub fn success(ctx: &StatusContext, tx: &TransferTransaction) -> Html<String> {
    let tx_json = serde_json::to_string_pretty(tx).unwrap_or_else(|_| "{}".to_string());
    let body = format!(
        r#"<h1>Request relayed</h1>
{}
<div class="success">Your request has been relayed to the network. Transaction: {}</div>
<pre>{}</pre>
<p><a href="/">Back to the faucet</a></p>"#,
        status_block(ctx),
        tx.id(),
        escape(&tx_json)
    );
    shell("Request relayed", &body)
}
