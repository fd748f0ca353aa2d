use async_trait::async_trait;
use devnet_engine::{
    EngineError, EngineResult, ExecutionBackend, ExecutionRequest, GenesisAccount, QueryRequest, TransactionResult,
};
use devnet_rpc::{BlockSequencer, Dispatcher, RpcError, RpcRequest};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the fake backend answers to `execute_transaction`
#[derive(Clone)]
enum Reply {
    Status(u64),
    Domain(i64, &'static str),
    Unexpected(&'static str),
    Empty,
}

struct RecordingBackend {
    reply: Reply,
    delay: Duration,
    /// When set, `commit_state` and `rollback_state` fail with this domain error
    finalise_error: Option<(i64, &'static str)>,
    executes: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    in_flight: AtomicBool,
    overlapped: AtomicBool,
    heights: Mutex<Vec<u64>>,
    queries: Mutex<Vec<QueryRequest>>,
    closed: AtomicBool,
}

impl RecordingBackend {
    fn new(reply: Reply) -> Arc<Self> {
        Self::with_options(reply, Duration::from_millis(1), None)
    }

    fn with_options(reply: Reply, delay: Duration, finalise_error: Option<(i64, &'static str)>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            delay,
            finalise_error,
            executes: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
            rollbacks: AtomicUsize::new(0),
            in_flight: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
            heights: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    fn finish(&self) -> EngineResult<()> {
        self.in_flight.store(false, Ordering::SeqCst);
        match self.finalise_error {
            Some((code, message)) => Err(EngineError::Domain {
                code,
                message: message.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ExecutionBackend for RecordingBackend {
    async fn genesis_init(&self, _accounts: Vec<GenesisAccount>) -> EngineResult<()> {
        Ok(())
    }

    async fn execute_transaction(&self, request: ExecutionRequest) -> EngineResult<Vec<TransactionResult>> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        self.executes.fetch_add(1, Ordering::SeqCst);
        self.heights.lock().unwrap().push(request.block.block_height);

        // Give other submissions a chance to sneak in
        tokio::time::sleep(self.delay).await;

        let tx_hash = request.transactions[0].params["txHash"].as_str().unwrap().to_string();
        match &self.reply {
            Reply::Status(status) => Ok(vec![TransactionResult::new(tx_hash, *status)
                .with_field("blockHeight", json!(request.block.block_height))
                .with_field("eventLogs", json!([{"indexed": [7]}]))]),
            Reply::Domain(code, message) => Err(EngineError::Domain {
                code: *code,
                message: message.to_string(),
            }),
            Reply::Unexpected(message) => Err(EngineError::Unexpected(message.to_string())),
            Reply::Empty => Ok(vec![]),
        }
    }

    async fn commit_state(&self) -> EngineResult<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.finish()
    }

    async fn rollback_state(&self) -> EngineResult<()> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.finish()
    }

    async fn query(&self, request: QueryRequest) -> EngineResult<Value> {
        self.queries.lock().unwrap().push(request);
        Ok(json!({"balance": 256, "nested": [1, "0x2"]}))
    }

    async fn shutdown(&self) -> EngineResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn dispatcher(backend: &Arc<RecordingBackend>) -> Dispatcher {
    Dispatcher::with_sequencer(backend.clone(), BlockSequencer::with_clock(|| 1_000_000), 1000)
}

fn transfer() -> Value {
    json!({"from": "hxA", "to": "hxB", "value": "0x10"})
}

#[tokio::test]
async fn test_successful_transfer_is_committed() {
    let backend = RecordingBackend::new(Reply::Status(1));
    let dispatcher = dispatcher(&backend);

    let tx_hash = dispatcher.submit_transaction(transfer().as_object().cloned().unwrap()).await.unwrap();

    assert_eq!(backend.commits(), 1);
    assert_eq!(backend.rollbacks(), 0);
    assert!(tx_hash.starts_with("0x"));

    let stored = dispatcher.results().get(&tx_hash).unwrap();
    assert_eq!(stored.tx_hash, tx_hash);
    assert_eq!(stored.status, 1);

    let lookup = dispatcher
        .handle("icx_getTransactionResult", json!({"txHash": tx_hash}))
        .await
        .unwrap();
    assert_eq!(lookup, serde_json::to_value(&stored).unwrap());
}

#[tokio::test]
async fn test_failed_status_is_rolled_back() {
    let backend = RecordingBackend::new(Reply::Status(0));
    let dispatcher = dispatcher(&backend);

    let response = dispatcher
        .dispatch(RpcRequest::new("icx_sendTransaction", transfer(), json!(1)))
        .await;

    assert_eq!(backend.rollbacks(), 1);
    assert_eq!(backend.commits(), 0);

    // The failed result is still retrievable
    let tx_hash = response.result.unwrap();
    let stored = dispatcher.results().get(tx_hash.as_str().unwrap()).unwrap();
    assert_eq!(stored.status, 0);
}

#[tokio::test]
async fn test_domain_error_is_rolled_back_and_negated() {
    let backend = RecordingBackend::new(Reply::Domain(100, "insufficient balance"));
    let dispatcher = dispatcher(&backend);

    let response = dispatcher
        .dispatch(RpcRequest::new("icx_sendTransaction", transfer(), json!(5)))
        .await;

    assert_eq!(backend.rollbacks(), 1);
    assert_eq!(backend.commits(), 0);
    assert_eq!(response.http_status, hyper::StatusCode::BAD_REQUEST);
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"jsonrpc": "2.0", "error": {"code": -100, "message": "insufficient balance"}, "id": 5})
    );
    assert!(dispatcher.results().is_empty());
}

#[tokio::test]
async fn test_unexpected_and_empty_replies_are_rolled_back() {
    let backend = RecordingBackend::new(Reply::Unexpected("connection reset"));
    let err = dispatcher(&backend)
        .handle("icx_sendTransaction", transfer())
        .await
        .unwrap_err();
    assert_eq!(err, RpcError::Server("connection reset".into()));
    assert_eq!(backend.rollbacks(), 1);

    let backend = RecordingBackend::new(Reply::Empty);
    let err = dispatcher(&backend)
        .handle("icx_sendTransaction", transfer())
        .await
        .unwrap_err();
    assert_eq!(err.code(), -32000);
    assert_eq!(backend.rollbacks(), 1);
    assert_eq!(backend.commits(), 0);
}

#[tokio::test]
async fn test_validation_failure_never_reaches_backend() {
    let backend = RecordingBackend::new(Reply::Status(1));
    let dispatcher = dispatcher(&backend);

    let err = dispatcher
        .handle("icx_sendTransaction", json!({"to": "hxB"}))
        .await
        .unwrap_err();

    assert!(matches!(err, RpcError::InvalidParams { ref field, .. } if field == "from"));
    assert_eq!(backend.executes.load(Ordering::SeqCst), 0);
    assert_eq!(backend.commits() + backend.rollbacks(), 0);
    assert_eq!(dispatcher.block_height().await, 0);
}

#[tokio::test]
async fn test_heights_increase_by_one_per_submission() {
    let backend = RecordingBackend::new(Reply::Status(1));
    let dispatcher = dispatcher(&backend);

    for i in 0..5 {
        let params = json!({"from": "hxA", "to": "hxB", "nonce": format!("{:#x}", i)});
        dispatcher.handle("icx_sendTransaction", params).await.unwrap();
    }

    assert_eq!(*backend.heights.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    assert_eq!(dispatcher.block_height().await, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_are_serialised() {
    let backend = RecordingBackend::new(Reply::Status(1));
    let dispatcher = Arc::new(dispatcher(&backend));

    let mut handles = Vec::new();
    for i in 0..20 {
        let dispatcher = dispatcher.clone();
        handles.push(tokio::spawn(async move {
            let params = json!({"from": "hxA", "to": "hxB", "nonce": format!("{:#x}", i)});
            dispatcher.handle("icx_sendTransaction", params).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(!backend.overlapped.load(Ordering::SeqCst));
    assert_eq!(backend.commits(), 20);

    let mut heights = backend.heights.lock().unwrap().clone();
    heights.sort_unstable();
    assert_eq!(heights, (1..=20).collect::<Vec<u64>>());
    assert_eq!(dispatcher.results().len(), 20);
}

#[tokio::test]
async fn test_unknown_transaction_result_is_not_found() {
    let backend = RecordingBackend::new(Reply::Status(1));
    let dispatcher = dispatcher(&backend);

    for params in [json!({"txHash": "0xdead"}), json!({}), json!({"txHash": 12})] {
        let response = dispatcher
            .dispatch(RpcRequest::new("icx_getTransactionResult", params, json!(1)))
            .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert_eq!(error.message, "TransactionResult not found");
        assert_eq!(response.http_status, hyper::StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_queries_pass_through_and_are_normalised() {
    let backend = RecordingBackend::new(Reply::Status(1));
    let dispatcher = dispatcher(&backend);

    let raw = dispatcher.handle("icx_getBalance", json!({"address": "hxA"})).await.unwrap();
    assert_eq!(raw, json!({"balance": 256, "nested": [1, "0x2"]}));

    let response = dispatcher
        .dispatch(RpcRequest::new("icx_call", json!({"to": "cx01", "dataType": "call"}), json!(2)))
        .await;
    assert_eq!(response.result.unwrap(), json!({"balance": "0x100", "nested": ["0x1", "0x2"]}));

    dispatcher.handle("icx_getTotalSupply", Value::Null).await.unwrap();

    let queries = backend.queries.lock().unwrap();
    let methods: Vec<&str> = queries.iter().map(|q| q.method.as_str()).collect();
    assert_eq!(methods, ["icx_getBalance", "icx_call", "icx_getTotalSupply"]);
    assert_eq!(queries[1].params["dataType"], json!("call"));

    // Queries never touch the block sequence
    assert_eq!(backend.commits() + backend.rollbacks(), 0);
}

#[tokio::test]
async fn test_submission_result_is_hex_string_not_rewritten() {
    let backend = RecordingBackend::new(Reply::Status(1));
    let dispatcher = dispatcher(&backend);

    let response = dispatcher
        .dispatch(RpcRequest::new("icx_sendTransaction", transfer(), json!(1)))
        .await;
    let tx_hash = response.result.unwrap();
    assert_eq!(tx_hash.as_str().unwrap().len(), 66);

    let response = dispatcher
        .dispatch(RpcRequest::new("icx_getTransactionResult", json!({"txHash": tx_hash}), json!(2)))
        .await;
    let result = response.result.unwrap();
    assert_eq!(result["status"], json!("0x1"));
    assert_eq!(result["eventLogs"], json!([{"indexed": ["0x7"]}]));
}

#[tokio::test]
async fn test_server_exit_closes_backend() {
    let backend = RecordingBackend::new(Reply::Status(1));
    let dispatcher = dispatcher(&backend);
    let signal = dispatcher.shutdown_signal();

    let response = dispatcher.dispatch(RpcRequest::new("server_exit", Value::Null, json!(1))).await;

    assert_eq!(response.result, Some(json!("0x0")));
    assert!(backend.closed.load(Ordering::SeqCst));
    assert!(*signal.borrow());
}

#[tokio::test]
async fn test_dropped_caller_still_finalises() {
    let backend = RecordingBackend::with_options(Reply::Status(1), Duration::from_millis(200), None);
    let dispatcher = dispatcher(&backend);

    // The caller gives up while the backend is still executing
    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        dispatcher.handle("icx_sendTransaction", transfer()),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(backend.executes.load(Ordering::SeqCst), 1);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while backend.commits() + backend.rollbacks() == 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(backend.commits(), 1);
    assert_eq!(backend.rollbacks(), 0);
    // The submission completed on its own, result included
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(dispatcher.results().len(), 1);

    // The gate was released, so the next submission gets the next height
    dispatcher.handle("icx_sendTransaction", transfer()).await.unwrap();
    assert_eq!(*backend.heights.lock().unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn test_failed_commit_is_reported_and_not_cached() {
    let backend = RecordingBackend::with_options(Reply::Status(1), Duration::from_millis(1), Some((7, "precommit missing")));
    let dispatcher = dispatcher(&backend);

    let response = dispatcher
        .dispatch(RpcRequest::new("icx_sendTransaction", transfer(), json!(1)))
        .await;

    assert_eq!(backend.commits(), 1);
    assert_eq!(backend.rollbacks(), 0);
    assert_eq!(response.http_status, hyper::StatusCode::BAD_REQUEST);
    let error = response.error.unwrap();
    assert_eq!(error.code, -7);
    assert_eq!(error.message, "precommit missing");
    assert!(dispatcher.results().is_empty());
}

#[tokio::test]
async fn test_failed_rollback_is_reported_and_not_cached() {
    let backend = RecordingBackend::with_options(Reply::Status(0), Duration::from_millis(1), Some((7, "precommit missing")));
    let dispatcher = dispatcher(&backend);

    let err = dispatcher.handle("icx_sendTransaction", transfer()).await.unwrap_err();

    assert_eq!(backend.rollbacks(), 1);
    assert_eq!(backend.commits(), 0);
    assert_eq!(err.code(), -7);
    assert!(dispatcher.results().is_empty());
}
