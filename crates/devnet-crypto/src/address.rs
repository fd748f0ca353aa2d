// devnet-crypto/src/address.rs

use crate::{CryptoError, CryptoResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Externally owned account prefix
pub const ACCOUNT_PREFIX: &str = "hx";
/// Contract (SCORE) prefix
pub const CONTRACT_PREFIX: &str = "cx";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressKind {
    Account,
    Contract,
}

impl AddressKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            AddressKind::Account => ACCOUNT_PREFIX,
            AddressKind::Contract => CONTRACT_PREFIX,
        }
    }
}

/// Prefixed address: `hx` or `cx` followed by hex digits.
///
/// The hex body is kept lowercase so that `hxAB` and `hxab` name the same
/// account. Body length is not enforced; local development accounts are
/// often shortened.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    kind: AddressKind,
    body: String,
}

impl Address {
    pub fn new(kind: AddressKind, body: &str) -> CryptoResult<Self> {
        if body.is_empty() || !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CryptoError::InvalidAddress(format!("{}{}", kind.prefix(), body)));
        }
        Ok(Self {
            kind,
            body: body.to_ascii_lowercase(),
        })
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn is_contract(&self) -> bool {
        self.kind == AddressKind::Contract
    }

    pub fn to_hex(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.body)
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> CryptoResult<Self> {
        if let Some(body) = s.strip_prefix(ACCOUNT_PREFIX) {
            Self::new(AddressKind::Account, body)
        } else if let Some(body) = s.strip_prefix(CONTRACT_PREFIX) {
            Self::new(AddressKind::Contract, body)
        } else {
            Err(CryptoError::InvalidAddress(s.to_string()))
        }
    }
}

impl TryFrom<String> for Address {
    type Error = CryptoError;

    fn try_from(value: String) -> CryptoResult<Self> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_hex()
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
