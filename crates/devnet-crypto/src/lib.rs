// devnet-crypto/src/lib.rs

//! Hashing and addressing primitives for the development node
//!
//! This crate provides:
//! - SHA3-256 hashing with `0x`-prefixed hex rendering
//! - ICON-style addresses (`hx` accounts, `cx` contracts)

pub mod hash;
pub mod address;

pub use hash::{create_hash, TxHash};
pub use address::{Address, AddressKind};

/// Result type for cryptographic operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while decoding hashes and addresses
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid hash")]
    InvalidHash,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}
