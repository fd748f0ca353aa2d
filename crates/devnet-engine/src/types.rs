// devnet-engine/src/types.rs

use devnet_crypto::Address;
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::Add;

/// Status reported for a transaction that was applied
pub const STATUS_SUCCESS: u64 = 1;
/// Status reported for a transaction that was rejected during execution
pub const STATUS_FAILURE: u64 = 0;

/// Token amount in loop (10^-18 ICX), carried as `0x` hex on the wire
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(BigUint);

impl Amount {
    pub fn new(value: BigUint) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn from_u64(value: u64) -> Self {
        Self(BigUint::from(value))
    }

    pub fn inner(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        Some(Amount(&self.0 + &other.0))
    }

    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if self.0 >= other.0 {
            Some(Amount(&self.0 - &other.0))
        } else {
            None
        }
    }

    /// Parse a `0x`-prefixed hex integer
    pub fn from_hex(s: &str) -> Option<Self> {
        let body = s.strip_prefix("0x")?;
        if body.is_empty() {
            return None;
        }
        BigUint::parse_bytes(body.as_bytes(), 16).map(Self)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{:x}", self.0)
    }
}

impl Add<&Amount> for &Amount {
    type Output = Amount;

    fn add(self, rhs: &Amount) -> Amount {
        Amount::new(self.inner() + rhs.inner())
    }
}

impl TryFrom<String> for Amount {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_hex(&value).ok_or_else(|| format!("invalid hex amount: {}", value))
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_hex()
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.to_hex())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Seed account created at genesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub name: String,
    pub address: Address,
    pub balance: Amount,
}

/// Synthetic single-transaction block metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDescriptor {
    pub block_height: u64,
    pub block_hash: String,
    /// Microseconds since the Unix epoch
    pub timestamp: u64,
}

/// One transaction inside an execution request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub method: String,
    pub params: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub transactions: Vec<Transaction>,
    pub block: BlockDescriptor,
}

/// Read-only call: `icx_call`, `icx_getBalance`, `icx_getTotalSupply`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub method: String,
    pub params: Map<String, Value>,
}

/// Backend-reported outcome of one transaction.
///
/// Only `txHash` and `status` are interpreted; everything else is carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub tx_hash: String,
    pub status: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransactionResult {
    pub fn new(tx_hash: impl Into<String>, status: u64) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            status,
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}
