//! Shared domain types for the spigot refill service.
//!
//! Everything the wallet and the faucet agree on lives here: fixed-point
//! asset amounts, script hashes and their base58 address form, and the
//! transfer/block types exchanged with the ledger node.

pub mod error;
pub mod types;

pub use error::AddressError;
pub use types::{
    AssetKind, Block, CoinReference, Fixed8, Hash, ScriptHash, TransactionOutput,
    TransferTransaction, Witness,
};
