// devnet-node/src/runtime.rs
use crate::NodeConfig;
use devnet_engine::{ExecutionBackend, InMemoryEngine};
use devnet_rpc::{Dispatcher, RpcConfig, RpcServer};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub struct Node {
    config: NodeConfig,
    backend: Arc<dyn ExecutionBackend>,
    dispatcher: Arc<Dispatcher>,
    rpc: Arc<RpcServer>,
    rpc_task: Mutex<Option<JoinHandle<()>>>,
}

impl Node {
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        Self::with_backend(config, Arc::new(InMemoryEngine::new()))
    }

    pub fn with_backend(config: NodeConfig, backend: Arc<dyn ExecutionBackend>) -> anyhow::Result<Self> {
        tracing::info!("Initializing node components");

        let dispatcher = Arc::new(Dispatcher::new(backend.clone(), config.rpc.result_cache_capacity));
        tracing::info!(
            "✓ Dispatcher initialized: result_cache_capacity={}",
            dispatcher.results().capacity()
        );

        let rpc_config = RpcConfig {
            listen_addr: config.listen_addr(),
            max_connections: config.rpc.max_connections,
        };
        let rpc = Arc::new(RpcServer::new(rpc_config, dispatcher.clone()));

        Ok(Self {
            config,
            backend,
            dispatcher,
            rpc,
            rpc_task: Mutex::new(None),
        })
    }

    pub async fn start(self: Arc<Self>) -> anyhow::Result<()> {
        tracing::info!("Starting development node");

        let accounts = self.config.genesis_accounts()?;
        let count = accounts.len();
        self.backend.genesis_init(accounts).await?;
        tracing::info!("✓ Genesis initialized with {} accounts", count);

        let rpc = self.rpc.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = rpc.start().await {
                tracing::error!("RPC server error: {}", e);
            }
        });
        *self.rpc_task.lock().await = Some(task);

        tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        tracing::info!("  Node is running");
        tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        tracing::info!("  RPC:        {}{}", self.config.listen_addr(), devnet_rpc::server::API_PATH);
        tracing::info!("  Score root: {}", self.config.score_root);
        tracing::info!("  DB root:    {}", self.config.db_root);
        tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        Ok(())
    }

    /// Resolves once the RPC server has stopped, e.g. after `server_exit`
    pub async fn wait(&self) {
        let mut task = self.rpc_task.lock().await;
        if let Some(handle) = task.as_mut() {
            if let Err(e) = handle.await {
                tracing::error!("RPC server task failed: {}", e);
            }
            *task = None;
        }
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!("Shutting down node...");

        // Goes through the same path as `server_exit` so the HTTP server drains too
        if !*self.dispatcher.shutdown_signal().borrow() {
            self.dispatcher.shutdown().await?;
        }
        self.wait().await;

        tracing::info!("Node shutdown complete");
        Ok(())
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}
