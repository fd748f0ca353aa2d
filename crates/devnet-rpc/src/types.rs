// devnet-rpc/src/types.rs
use crate::RpcError;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};

pub const JSONRPC_VERSION: &str = "2.0";

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub id: serde_json::Value,
}

impl RpcRequest {
    pub fn new(method: &str, params: serde_json::Value, id: serde_json::Value) -> Self {
        Self {
            jsonrpc: default_version(),
            method: method.to_string(),
            params,
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorResponse>,
    pub id: serde_json::Value,
    /// Transport status to answer with; not part of the envelope
    #[serde(skip)]
    pub http_status: StatusCode,
}

impl RpcResponse {
    pub fn success(result: serde_json::Value, id: serde_json::Value) -> Self {
        Self {
            jsonrpc: default_version(),
            result: Some(result),
            error: None,
            id,
            http_status: StatusCode::OK,
        }
    }

    pub fn failure(error: &RpcError, id: serde_json::Value) -> Self {
        Self {
            jsonrpc: default_version(),
            result: None,
            error: Some(error.to_error_response()),
            id,
            http_status: error.http_status(),
        }
    }

    /// Fixed envelope for bodies that are not JSON; the id is unknown so it is null
    pub fn parse_error() -> Self {
        Self::failure(&RpcError::Parse, serde_json::Value::Null)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorResponse {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}
