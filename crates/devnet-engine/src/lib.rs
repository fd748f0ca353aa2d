// devnet-engine/src/lib.rs

//! Execution backend for the development node
//!
//! The JSON-RPC front end only talks to the [`ExecutionBackend`] trait. It
//! synthesises one block per transaction, asks the backend to execute it and
//! then finalises the pending state with exactly one of
//! [`ExecutionBackend::commit_state`] or [`ExecutionBackend::rollback_state`].
//!
//! [`InMemoryEngine`] is a reference backend that keeps balances in memory.

pub mod types;
pub mod state;
pub mod engine;

pub use engine::InMemoryEngine;
pub use state::WorldState;
pub use types::*;

use async_trait::async_trait;

pub type EngineResult<T> = Result<T, EngineError>;

/// Domain error codes reported by the backend (positive; the RPC layer negates them)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ServerError,
    ScoreNotFound,
    OutOfBalance,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
}

impl ErrorCode {
    pub fn value(&self) -> i64 {
        match self {
            ErrorCode::ServerError => 32000,
            ErrorCode::ScoreNotFound => 32100,
            ErrorCode::OutOfBalance => 32101,
            ErrorCode::InvalidRequest => 32600,
            ErrorCode::MethodNotFound => 32601,
            ErrorCode::InvalidParams => 32602,
        }
    }
}

/// Outcome of a failed backend call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// Operation rejected with a known code
    #[error("{message}")]
    Domain { code: i64, message: String },
    /// Anything else the backend could not handle
    #[error("{0}")]
    Unexpected(String),
}

impl EngineError {
    pub fn domain(code: ErrorCode, message: impl Into<String>) -> Self {
        EngineError::Domain {
            code: code.value(),
            message: message.into(),
        }
    }
}

/// Contract between the dispatcher and whatever performs state transitions.
///
/// `execute_transaction` leaves its effects in a pending slot; the caller must
/// follow it with one `commit_state` or `rollback_state`. Both finalisers are
/// no-ops when nothing is pending.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn genesis_init(&self, accounts: Vec<GenesisAccount>) -> EngineResult<()>;

    async fn execute_transaction(&self, request: ExecutionRequest) -> EngineResult<Vec<TransactionResult>>;

    async fn commit_state(&self) -> EngineResult<()>;

    async fn rollback_state(&self) -> EngineResult<()>;

    async fn query(&self, request: QueryRequest) -> EngineResult<serde_json::Value>;

    async fn shutdown(&self) -> EngineResult<()>;
}
