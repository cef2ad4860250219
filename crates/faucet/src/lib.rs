//! Refill service ("faucet") for a dual-asset testnet ledger.
//!
//! The service dispenses a fixed round of the ledger's two native assets
//! with:
//! - Daily per-address idempotence and per-client attempt quotas
//! - A fixed-amount transfer builder (no client-controlled amounts)
//! - A wallet-driven signing workflow with completeness checks
//! - Network relay through a node's JSON-RPC interface
//! - A one-shot result view backed by a single-slot session

pub mod api;
pub mod builder;
pub mod config;
pub mod database;
pub mod error;
pub mod pages;
pub mod rpc;
pub mod service;
pub mod session;
pub mod signing;

pub use builder::TransferBuilder;
pub use config::FaucetConfig;
pub use database::{AttemptRecord, ThrottleStore};
pub use error::{FaucetError, FaucetResult, RateLimitScope};
pub use rpc::{ChainRpcClient, ChainView, RelayGateway};
pub use service::{FaucetService, StatusContext};
pub use session::DisbursementSession;
pub use signing::SigningCoordinator;
