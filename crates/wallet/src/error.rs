use spigot_common::error::AddressError;
use spigot_common::types::{AssetKind, Fixed8};
use thiserror::Error;

/// Wallet errors
#[derive(Error, Debug)]
pub enum WalletError {
    /// Wallet file missing, unreadable, or the password does not match.
    #[error("Wallet unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("Insufficient funds: need {needed} {asset}, have {available}")]
    InsufficientFunds {
        asset: AssetKind,
        needed: Fixed8,
        available: Fixed8,
    },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(String),
}

pub type WalletResult<T> = Result<T, WalletError>;
