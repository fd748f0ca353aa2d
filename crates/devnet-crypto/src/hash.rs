// devnet-crypto/src/hash.rs

use crate::{CryptoError, CryptoResult};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;

pub const HASH_SIZE: usize = 32;

/// SHA3-256 digest; rendered `0x`-prefixed on the wire
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash([u8; HASH_SIZE]);

impl TxHash {
    pub fn of(data: &[u8]) -> Self {
        Self(Sha3_256::digest(data).into())
    }
}

impl FromStr for TxHash {
    type Err = CryptoError;

    fn from_str(s: &str) -> CryptoResult<Self> {
        let body = s.strip_prefix("0x").ok_or(CryptoError::InvalidHash)?;
        let mut bytes = [0u8; HASH_SIZE];
        hex::decode_to_slice(body, &mut bytes).map_err(|_| CryptoError::InvalidHash)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash(0x{}..)", hex::encode(&self.0[..4]))
    }
}

/// SHA3-256 of `data` as `0x`-prefixed lowercase hex.
///
/// Used for both transaction hashes and synthetic block hashes.
pub fn create_hash(data: &[u8]) -> String {
    TxHash::of(data).to_string()
}
