// devnet-rpc/src/methods.rs
use crate::{
    convert::integers_to_hex, validator, BlockSequencer, ResultCache, RpcError, RpcRequest, RpcResponse,
    RpcResult, JSONRPC_VERSION,
};
use devnet_crypto::{create_hash, TxHash};
use devnet_engine::{EngineResult, ExecutionBackend, ExecutionRequest, QueryRequest, Transaction, TransactionResult};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Value returned by `server_exit`
const EXIT_SENTINEL: &str = "0x0";

/// Every method the node answers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    SendTransaction,
    Call,
    GetBalance,
    GetTotalSupply,
    GetTransactionResult,
    ServerExit,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::SendTransaction,
        Method::Call,
        Method::GetBalance,
        Method::GetTotalSupply,
        Method::GetTransactionResult,
        Method::ServerExit,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Method::SendTransaction => "icx_sendTransaction",
            Method::Call => "icx_call",
            Method::GetBalance => "icx_getBalance",
            Method::GetTotalSupply => "icx_getTotalSupply",
            Method::GetTransactionResult => "icx_getTransactionResult",
            Method::ServerExit => "server_exit",
        }
    }
}

impl FromStr for Method {
    type Err = RpcError;

    fn from_str(name: &str) -> RpcResult<Self> {
        Method::ALL
            .into_iter()
            .find(|method| method.name() == name)
            .ok_or_else(|| RpcError::MethodNotFound(name.to_string()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Routes JSON-RPC calls to the execution backend.
///
/// Submissions run one at a time: the sequencer sits inside the submission
/// gate, and the gate is held from block creation until the pending state has
/// been committed or rolled back. That sequence runs on its own task, so a
/// caller that goes away mid-submission cannot skip the finaliser. Queries and
/// result lookups skip the gate.
pub struct Dispatcher {
    backend: Arc<dyn ExecutionBackend>,
    submission_gate: Arc<Mutex<BlockSequencer>>,
    results: Arc<ResultCache>,
    shutdown_tx: watch::Sender<bool>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn ExecutionBackend>, cache_capacity: usize) -> Self {
        Self::with_sequencer(backend, BlockSequencer::new(), cache_capacity)
    }

    pub fn with_sequencer(backend: Arc<dyn ExecutionBackend>, sequencer: BlockSequencer, cache_capacity: usize) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            backend,
            submission_gate: Arc::new(Mutex::new(sequencer)),
            results: Arc::new(ResultCache::new(cache_capacity)),
            shutdown_tx,
        }
    }

    pub fn results(&self) -> &ResultCache {
        &self.results
    }

    /// Height of the last synthesised block
    pub async fn block_height(&self) -> u64 {
        self.submission_gate.lock().await.height()
    }

    /// Flips to `true` once `server_exit` has been handled
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Handle a decoded request and build the response envelope
    pub async fn dispatch(&self, request: RpcRequest) -> RpcResponse {
        let RpcRequest { jsonrpc, method, params, id } = request;

        if jsonrpc != JSONRPC_VERSION {
            let error = RpcError::InvalidRequest(format!("unsupported jsonrpc version '{}'", jsonrpc));
            return RpcResponse::failure(&error, id);
        }

        match self.handle(&method, params).await {
            Ok(result) => RpcResponse::success(integers_to_hex(result), id),
            Err(error) => {
                tracing::warn!("{} failed ({}): {}", method, error.code(), error);
                RpcResponse::failure(&error, id)
            }
        }
    }

    /// Run a method by wire name and return its raw (not hex-normalised) result
    pub async fn handle(&self, method: &str, params: Value) -> RpcResult<Value> {
        let method: Method = method.parse()?;
        let params = params_object(params)?;
        tracing::debug!("json_rpc_server {}", method);

        match method {
            Method::SendTransaction => self.submit_transaction(params).await.map(Value::String),
            Method::Call => self.call(params).await,
            Method::GetBalance => self.get_balance(params).await,
            Method::GetTotalSupply => self.get_total_supply(params).await,
            Method::GetTransactionResult => {
                let result = self.get_transaction_result(&params)?;
                serde_json::to_value(result).map_err(|e| RpcError::Server(e.to_string()))
            }
            Method::ServerExit => self.shutdown().await,
        }
    }

    /// Execute one transaction in its own block; returns the transaction hash
    pub async fn submit_transaction(&self, mut params: Map<String, Value>) -> RpcResult<String> {
        validator::validate(Method::SendTransaction, &params)?;

        // serde_json keeps object keys sorted, which makes this encoding canonical
        params.remove("txHash");
        let encoded = serde_json::to_vec(&params).map_err(|e| RpcError::Server(e.to_string()))?;
        params.insert("txHash".to_string(), Value::String(create_hash(&encoded)));

        let transaction = Transaction {
            method: Method::SendTransaction.name().to_string(),
            params,
        };

        let backend = self.backend.clone();
        let gate = self.submission_gate.clone();
        let results = self.results.clone();

        // Runs to completion even if the caller's future is dropped
        let submission = tokio::spawn(async move {
            let mut sequencer = gate.lock().await;
            let block = sequencer.next_block();
            tracing::debug!("Executing transaction in block {} ({})", block.block_height, block.block_hash);

            let request = ExecutionRequest {
                transactions: vec![transaction],
                block,
            };
            let executed = backend.execute_transaction(request).await;
            finalise(backend.as_ref(), &executed).await?;
            drop(sequencer);

            let result = executed?
                .into_iter()
                .next()
                .ok_or_else(|| RpcError::Server("empty execution result".into()))?;

            let tx_hash = result.tx_hash.clone();
            results.put(tx_hash.clone(), result);
            Ok::<_, RpcError>(tx_hash)
        });

        submission
            .await
            .map_err(|e| RpcError::Server(format!("submission task failed: {}", e)))?
    }

    pub async fn call(&self, params: Map<String, Value>) -> RpcResult<Value> {
        validator::validate(Method::Call, &params)?;
        self.query(Method::Call, params).await
    }

    pub async fn get_balance(&self, params: Map<String, Value>) -> RpcResult<Value> {
        validator::validate(Method::GetBalance, &params)?;
        self.query(Method::GetBalance, params).await
    }

    pub async fn get_total_supply(&self, params: Map<String, Value>) -> RpcResult<Value> {
        self.query(Method::GetTotalSupply, params).await
    }

    async fn query(&self, method: Method, params: Map<String, Value>) -> RpcResult<Value> {
        let request = QueryRequest {
            method: method.name().to_string(),
            params,
        };
        Ok(self.backend.query(request).await?)
    }

    pub fn get_transaction_result(&self, params: &Map<String, Value>) -> RpcResult<TransactionResult> {
        params
            .get("txHash")
            .and_then(Value::as_str)
            .and_then(|tx_hash| tx_hash.parse::<TxHash>().ok())
            .and_then(|tx_hash| self.results.get(&tx_hash.to_string()))
            .ok_or_else(|| RpcError::NotFound("TransactionResult not found".into()))
    }

    /// Close the backend and tell the HTTP server to stop
    pub async fn shutdown(&self) -> RpcResult<Value> {
        tracing::info!("Shutdown requested");
        let closed = self.backend.shutdown().await;
        self.shutdown_tx.send_replace(true);
        closed?;
        Ok(json!(EXIT_SENTINEL))
    }
}

/// Commit when the first result succeeded, roll back in every other case
async fn finalise(backend: &dyn ExecutionBackend, executed: &EngineResult<Vec<TransactionResult>>) -> RpcResult<()> {
    let succeeded = matches!(executed, Ok(results) if results.first().map_or(false, TransactionResult::is_success));

    if succeeded {
        backend.commit_state().await?;
    } else {
        tracing::warn!("Rolling back pending state");
        backend.rollback_state().await?;
    }
    Ok(())
}

fn params_object(params: Value) -> RpcResult<Map<String, Value>> {
    match params {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        _ => Err(RpcError::invalid_params("params", "params must be an object")),
    }
}
