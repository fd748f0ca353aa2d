// devnet-engine/src/engine.rs

use crate::{
    Amount, EngineError, EngineResult, ErrorCode, ExecutionBackend, ExecutionRequest, GenesisAccount,
    QueryRequest, Transaction, TransactionResult, WorldState, BlockDescriptor, STATUS_FAILURE, STATUS_SUCCESS,
};
use async_trait::async_trait;
use devnet_crypto::Address;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

const SEND_TRANSACTION: &str = "icx_sendTransaction";
const CALL: &str = "icx_call";
const GET_BALANCE: &str = "icx_getBalance";
const GET_TOTAL_SUPPLY: &str = "icx_getTotalSupply";

/// State produced by `execute_transaction`, waiting for commit or rollback
#[derive(Debug)]
struct Precommit {
    block_height: u64,
    state: WorldState,
}

#[derive(Debug, Default)]
struct EngineState {
    committed: WorldState,
    precommit: Option<Precommit>,
    last_height: u64,
    genesis_done: bool,
    closed: bool,
}

/// Balance-transfer engine that keeps everything in memory.
///
/// There is no contract VM: `icx_call` only resolves `cx` addresses and
/// reports that no SCORE is deployed there.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    inner: Mutex<EngineState>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Height of the last committed block (0 before the first commit)
    pub async fn last_height(&self) -> u64 {
        self.inner.lock().await.last_height
    }

    pub async fn balance(&self, address: &Address) -> Amount {
        self.inner.lock().await.committed.balance(address)
    }

    pub async fn has_pending_state(&self) -> bool {
        self.inner.lock().await.precommit.is_some()
    }
}

fn ensure_open(state: &EngineState) -> EngineResult<()> {
    if state.closed {
        return Err(EngineError::Unexpected("engine is closed".into()));
    }
    Ok(())
}

fn param_address(params: &Map<String, Value>, key: &str) -> EngineResult<Address> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::domain(ErrorCode::InvalidParams, format!("missing '{}'", key)))?
        .parse()
        .map_err(|e| EngineError::domain(ErrorCode::InvalidParams, format!("invalid '{}': {}", key, e)))
}

fn param_amount(params: &Map<String, Value>, key: &str) -> EngineResult<Amount> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(Amount::zero()),
        Some(Value::String(s)) => Amount::from_hex(s)
            .ok_or_else(|| EngineError::domain(ErrorCode::InvalidParams, format!("invalid '{}': {}", key, s))),
        Some(other) => Err(EngineError::domain(
            ErrorCode::InvalidParams,
            format!("invalid '{}': {}", key, other),
        )),
    }
}

/// Apply one transfer to `pending`, turning balance failures into a failed result
fn apply_transaction(
    pending: &mut WorldState,
    tx: &Transaction,
    block: &BlockDescriptor,
    index: usize,
) -> EngineResult<TransactionResult> {
    if tx.method != SEND_TRANSACTION {
        return Err(EngineError::domain(
            ErrorCode::MethodNotFound,
            format!("cannot execute '{}'", tx.method),
        ));
    }

    let tx_hash = tx
        .params
        .get("txHash")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::domain(ErrorCode::InvalidParams, "missing 'txHash'"))?;
    let from = param_address(&tx.params, "from")?;
    let to = param_address(&tx.params, "to")?;
    let value = param_amount(&tx.params, "value")?;
    let fee = param_amount(&tx.params, "fee")?;

    let result = TransactionResult::new(tx_hash, STATUS_SUCCESS)
        .with_field("blockHeight", json!(block.block_height))
        .with_field("blockHash", json!(block.block_hash))
        .with_field("txIndex", json!(index))
        .with_field("to", json!(to.to_hex()));

    match pending.transfer(&from, &to, &value, &fee) {
        Ok(()) => Ok(result),
        Err(EngineError::Domain { code, message }) => {
            tracing::debug!("Transaction {} failed: {}", tx_hash, message);
            let mut failed = result.with_field("failure", json!({"code": code, "message": message}));
            failed.status = STATUS_FAILURE;
            Ok(failed)
        }
        Err(e) => Err(e),
    }
}

#[async_trait]
impl ExecutionBackend for InMemoryEngine {
    async fn genesis_init(&self, accounts: Vec<GenesisAccount>) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        ensure_open(&inner)?;
        if inner.genesis_done {
            return Err(EngineError::domain(ErrorCode::InvalidRequest, "genesis already initialised"));
        }

        inner.committed = WorldState::from_genesis(&accounts);
        inner.genesis_done = true;
        tracing::info!(
            "Genesis initialised: {} accounts, total supply {}",
            accounts.len(),
            inner.committed.total_supply()
        );
        Ok(())
    }

    async fn execute_transaction(&self, request: ExecutionRequest) -> EngineResult<Vec<TransactionResult>> {
        let mut inner = self.inner.lock().await;
        ensure_open(&inner)?;

        let block = &request.block;
        if block.block_height <= inner.last_height {
            return Err(EngineError::domain(
                ErrorCode::InvalidRequest,
                format!(
                    "block height {} is not above last committed height {}",
                    block.block_height, inner.last_height
                ),
            ));
        }

        let mut pending = inner.committed.clone();
        let mut results = Vec::with_capacity(request.transactions.len());
        for (index, tx) in request.transactions.iter().enumerate() {
            results.push(apply_transaction(&mut pending, tx, block, index)?);
        }

        inner.precommit = Some(Precommit {
            block_height: block.block_height,
            state: pending,
        });
        Ok(results)
    }

    async fn commit_state(&self) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        ensure_open(&inner)?;
        if let Some(precommit) = inner.precommit.take() {
            inner.committed = precommit.state;
            inner.last_height = precommit.block_height;
            tracing::debug!("Committed block {}", precommit.block_height);
        }
        Ok(())
    }

    async fn rollback_state(&self) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        ensure_open(&inner)?;
        if let Some(precommit) = inner.precommit.take() {
            tracing::debug!("Discarded pending block {}", precommit.block_height);
        }
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> EngineResult<Value> {
        let inner = self.inner.lock().await;
        ensure_open(&inner)?;

        match request.method.as_str() {
            GET_BALANCE => {
                let address = param_address(&request.params, "address")?;
                Ok(json!(inner.committed.balance(&address).to_hex()))
            }
            GET_TOTAL_SUPPLY => Ok(json!(inner.committed.total_supply().to_hex())),
            CALL => {
                let to = param_address(&request.params, "to")?;
                if !to.is_contract() {
                    return Err(EngineError::domain(
                        ErrorCode::InvalidParams,
                        format!("{} is not a SCORE address", to),
                    ));
                }
                Err(EngineError::domain(ErrorCode::ScoreNotFound, format!("SCORE not found: {}", to)))
            }
            other => Err(EngineError::domain(
                ErrorCode::MethodNotFound,
                format!("unknown query method: {}", other),
            )),
        }
    }

    async fn shutdown(&self) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        inner.precommit = None;
        inner.closed = true;
        tracing::info!("Execution engine closed");
        Ok(())
    }
}
