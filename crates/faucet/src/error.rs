//! Error types for the faucet service

use spigot_wallet::WalletError;
use thiserror::Error;

/// Which throttle tripped a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitScope {
    /// Too many attempts from one client today.
    Client,
    /// The address already claimed today.
    Address,
}

/// Faucet service errors
#[derive(Error, Debug)]
pub enum FaucetError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rate limited by {scope:?} throttle")]
    RateLimited { scope: RateLimitScope },

    #[error("Insufficient funds in faucet wallet")]
    InsufficientFunds,

    #[error("Signature threshold not met")]
    IncompleteSignature,

    #[error("Network peers rejected the transaction")]
    RelayFailure,

    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FaucetError {
    /// The message rendered on the landing page when a claim is rejected.
    /// Every rejection surfaces here; none escapes the request boundary.
    pub fn page_message(&self) -> String {
        match self {
            FaucetError::InvalidInput(msg) => msg.clone(),
            FaucetError::RateLimited {
                scope: RateLimitScope::Client,
            } => "Too many requests. Try again later".to_string(),
            FaucetError::RateLimited {
                scope: RateLimitScope::Address,
            } => "Already requested today".to_string(),
            FaucetError::InsufficientFunds => {
                "The faucet is out of funds. Please try again later".to_string()
            }
            FaucetError::IncompleteSignature => {
                "Transaction initiated, but the signature is incomplete".to_string()
            }
            FaucetError::RelayFailure => {
                "Could not relay the transaction to the network".to_string()
            }
            other => format!("Could not process your request: {}", other),
        }
    }
}

pub type FaucetResult<T> = Result<T, FaucetError>;
