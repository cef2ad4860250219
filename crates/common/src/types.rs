use crate::error::AddressError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

pub const HASH_LENGTH: usize = 32;
pub const SCRIPT_HASH_LENGTH: usize = 20;
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// Version byte prefixed to a script hash in the base58 address form.
pub const ADDRESS_VERSION: u8 = 0x17;

/// Number of fractional decimal places carried by [`Fixed8`].
pub const FIXED8_DECIMALS: u32 = 8;
const FIXED8_ONE: i64 = 100_000_000;

// --- NewTypes ---

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Hash(pub [u8; HASH_LENGTH]);

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", hex::encode(self.0))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        if bytes.len() != HASH_LENGTH {
            return Err(serde::de::Error::custom("Invalid hash length"));
        }
        let mut arr = [0u8; HASH_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Hash(arr))
    }
}

impl Hash {
    /// Double SHA-256, the digest used for transaction ids and address
    /// checksums.
    pub fn double_sha256(data: &[u8]) -> Self {
        let first = Sha256::digest(data);
        let second = Sha256::digest(first);
        let mut arr = [0u8; HASH_LENGTH];
        arr.copy_from_slice(&second);
        Hash(arr)
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut arr = [0u8; HASH_LENGTH];
        let len = bytes.len().min(HASH_LENGTH);
        arr[..len].copy_from_slice(&bytes[..len]);
        Hash(arr)
    }
}

/// 20-byte script hash identifying a spendable destination on the ledger.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScriptHash(pub [u8; SCRIPT_HASH_LENGTH]);

impl fmt::Debug for ScriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptHash({})", hex::encode(self.0))
    }
}

impl fmt::Display for ScriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_address())
    }
}

impl Serialize for ScriptHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for ScriptHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        if bytes.len() != SCRIPT_HASH_LENGTH {
            return Err(serde::de::Error::custom("Invalid script hash length"));
        }
        let mut arr = [0u8; SCRIPT_HASH_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(ScriptHash(arr))
    }
}

impl ScriptHash {
    /// Encode as the human-readable base58check address form:
    /// version byte, the 20 hash bytes, then a 4-byte double-SHA256 checksum.
    pub fn to_address(&self) -> String {
        let mut payload = Vec::with_capacity(SCRIPT_HASH_LENGTH + 5);
        payload.push(ADDRESS_VERSION);
        payload.extend_from_slice(&self.0);
        let checksum = Hash::double_sha256(&payload);
        payload.extend_from_slice(&checksum.0[..4]);
        bs58::encode(payload).into_string()
    }

    /// Decode the base58check address form, validating version and checksum.
    pub fn from_address(address: &str) -> Result<Self, AddressError> {
        let payload = bs58::decode(address)
            .into_vec()
            .map_err(|e| AddressError::Base58(e.to_string()))?;
        if payload.len() != SCRIPT_HASH_LENGTH + 5 {
            return Err(AddressError::InvalidLength(payload.len()));
        }
        if payload[0] != ADDRESS_VERSION {
            return Err(AddressError::VersionMismatch {
                expected: ADDRESS_VERSION,
                actual: payload[0],
            });
        }
        let (body, checksum) = payload.split_at(SCRIPT_HASH_LENGTH + 1);
        if Hash::double_sha256(body).0[..4] != *checksum {
            return Err(AddressError::ChecksumMismatch);
        }
        let mut arr = [0u8; SCRIPT_HASH_LENGTH];
        arr.copy_from_slice(&body[1..]);
        Ok(ScriptHash(arr))
    }
}

// --- Amounts ---

/// Fixed-point asset amount with 8 decimal places, stored as a raw i64.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Fixed8(pub i64);

impl Fixed8 {
    pub const fn zero() -> Self {
        Fixed8(0)
    }

    /// Construct from a whole number of asset units.
    pub const fn from_units(units: i64) -> Self {
        Fixed8(units * FIXED8_ONE)
    }

    pub const fn raw(value: i64) -> Self {
        Fixed8(value)
    }

    /// Truncate to whole units, discarding the fractional part.
    pub const fn to_units(self) -> i64 {
        self.0 / FIXED8_ONE
    }

    pub fn checked_add(self, other: Fixed8) -> Option<Fixed8> {
        self.0.checked_add(other.0).map(Fixed8)
    }

    pub fn checked_sub(self, other: Fixed8) -> Option<Fixed8> {
        self.0.checked_sub(other.0).map(Fixed8)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::Add for Fixed8 {
    type Output = Fixed8;

    fn add(self, other: Fixed8) -> Fixed8 {
        Fixed8(self.0 + other.0)
    }
}

impl std::ops::AddAssign for Fixed8 {
    fn add_assign(&mut self, other: Fixed8) {
        self.0 += other.0;
    }
}

impl std::ops::Sub for Fixed8 {
    type Output = Fixed8;

    fn sub(self, other: Fixed8) -> Fixed8 {
        Fixed8(self.0 - other.0)
    }
}

impl fmt::Debug for Fixed8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed8({})", self)
    }
}

impl fmt::Display for Fixed8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = self.0 / FIXED8_ONE;
        let frac = (self.0 % FIXED8_ONE).unsigned_abs();
        if frac == 0 {
            write!(f, "{}", units)
        } else {
            let frac = format!("{:08}", frac);
            write!(f, "{}.{}", units, frac.trim_end_matches('0'))
        }
    }
}

// --- Assets ---

/// The two native value types tracked by the ledger.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Governance asset, transferred in whole units.
    Share,
    /// Utility asset used for fees.
    Coin,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Share => "share",
            AssetKind::Coin => "coin",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Transactions ---

/// Reference to an unspent output of a prior transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct CoinReference {
    pub prev_hash: Hash,
    pub prev_index: u16,
}

/// A single value transfer inside a transaction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub asset: AssetKind,
    pub value: Fixed8,
    pub script_hash: ScriptHash,
}

/// Authorization attached to a signed transaction.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct Witness {
    pub invocation: Vec<u8>,
    pub verification: Vec<u8>,
}

/// A two-asset value transfer as relayed to the network.
///
/// The id covers inputs and outputs only, so it is stable across witness
/// attachment.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct TransferTransaction {
    pub inputs: Vec<CoinReference>,
    pub outputs: Vec<TransactionOutput>,
    pub witnesses: Vec<Witness>,
}

impl TransferTransaction {
    pub fn id(&self) -> Hash {
        let body = bincode::serialize(&(&self.inputs, &self.outputs)).unwrap_or_default();
        Hash::double_sha256(&body)
    }

    /// Sum of output values for one asset kind.
    pub fn output_total(&self, asset: AssetKind) -> Fixed8 {
        self.outputs
            .iter()
            .filter(|o| o.asset == asset)
            .fold(Fixed8::zero(), |acc, o| acc + o.value)
    }
}

// --- Blocks ---

/// The slice of a ledger block the wallet cares about.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub hash: Hash,
    pub timestamp: i64,
    pub transactions: Vec<TransferTransaction>,
}
