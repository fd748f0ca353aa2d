// devnet-rpc/src/lib.rs

//! JSON-RPC front end of the development node.
//!
//! Every `icx_sendTransaction` is wrapped in its own synthetic block, handed
//! to the [`ExecutionBackend`](devnet_engine::ExecutionBackend) and then
//! committed or rolled back depending on the reported status. Results are
//! kept in a bounded [`ResultCache`] for `icx_getTransactionResult`.

pub mod cache;
pub mod convert;
pub mod methods;
pub mod sequencer;
pub mod server;
pub mod types;
pub mod validator;

pub use cache::ResultCache;
pub use convert::integers_to_hex;
pub use methods::{Dispatcher, Method};
pub use sequencer::BlockSequencer;
pub use server::{RpcConfig, RpcServer};
pub use types::*;

use devnet_engine::EngineError;
use hyper::StatusCode;

/// Generic server-side failure code
pub const SERVER_ERROR_CODE: i64 = -32000;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RpcError {
    #[error("Parse error")]
    Parse,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Method not found: {0}")]
    MethodNotFound(String),
    /// A parameter is missing or has the wrong shape
    #[error("{message}")]
    InvalidParams { field: String, message: String },
    #[error("{0}")]
    NotFound(String),
    /// Backend rejected the operation; `code` is the backend's own (positive) code
    #[error("{message}")]
    Domain { code: i64, message: String },
    #[error("{0}")]
    Server(String),
}

impl RpcError {
    pub fn invalid_params(field: impl Into<String>, message: impl Into<String>) -> Self {
        RpcError::InvalidParams {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            RpcError::Parse => -32700,
            RpcError::InvalidRequest(_) => -32600,
            RpcError::MethodNotFound(_) => -32601,
            RpcError::InvalidParams { .. } => -32602,
            RpcError::NotFound(_) => -32602,
            RpcError::Domain { code, .. } => code.saturating_neg(),
            RpcError::Server(_) => SERVER_ERROR_CODE,
        }
    }

    /// Every failure is reported as a client error; this layer never answers 5xx.
    pub fn http_status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub fn data(&self) -> Option<serde_json::Value> {
        match self {
            RpcError::InvalidParams { field, .. } => Some(serde_json::json!({ "field": field })),
            _ => None,
        }
    }

    pub fn to_error_response(&self) -> RpcErrorResponse {
        RpcErrorResponse {
            code: self.code(),
            message: self.to_string(),
            data: self.data(),
        }
    }
}

impl From<EngineError> for RpcError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::Domain { code, message } => RpcError::Domain { code, message },
            EngineError::Unexpected(message) => RpcError::Server(message),
        }
    }
}

pub type RpcResult<T> = Result<T, RpcError>;
