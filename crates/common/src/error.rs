use thiserror::Error;

/// Errors decoding the base58 address form into a script hash.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Not a base58 string: {0}")]
    Base58(String),

    #[error("Address payload has wrong length: {0}")]
    InvalidLength(usize),

    #[error("Address version byte mismatch: expected {expected:#04x}, got {actual:#04x}")]
    VersionMismatch { expected: u8, actual: u8 },

    #[error("Address checksum mismatch")]
    ChecksumMismatch,
}
