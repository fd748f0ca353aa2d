// devnet-rpc/src/server.rs
use crate::{Dispatcher, RpcError, RpcRequest, RpcResponse, RpcResult};
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::ServiceBuilder;

/// JSON-RPC endpoint path; a trailing slash is accepted too
pub const API_PATH: &str = "/api/v3";

#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub listen_addr: SocketAddr,
    /// Requests handled at the same time, across all connections
    pub max_connections: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
            max_connections: 100,
        }
    }
}

pub struct RpcServer {
    config: RpcConfig,
    dispatcher: Arc<Dispatcher>,
}

impl RpcServer {
    pub fn new(config: RpcConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self { config, dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Serve until `server_exit` is handled or the dispatcher goes away
    pub async fn start(self: Arc<Self>) -> RpcResult<()> {
        tracing::info!("Starting RPC server on {}", self.config.listen_addr);

        let limit = GlobalConcurrencyLimitLayer::new(self.config.max_connections.max(1));
        let value = self.clone();
        let make_svc = make_service_fn(move |_| {
            let server = value.clone();
            let limit = limit.clone();
            async move {
                Ok::<_, hyper::Error>(ServiceBuilder::new().layer(limit).service(service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req).await }
                })))
            }
        });

        let mut shutdown = self.dispatcher.shutdown_signal();
        let server = Server::try_bind(&self.config.listen_addr)
            .map_err(|e| RpcError::Server(format!("cannot bind {}: {}", self.config.listen_addr, e)))?
            .serve(make_svc)
            .with_graceful_shutdown(async move {
                if shutdown.wait_for(|stopped| *stopped).await.is_err() {
                    tracing::debug!("Dispatcher dropped, stopping RPC server");
                }
            });

        tracing::info!("RPC server listening on {}{}", self.config.listen_addr, API_PATH);

        server.await
            .map_err(|e| RpcError::Server(e.to_string()))?;

        tracing::info!("RPC server stopped");
        Ok(())
    }

    async fn handle_request(&self, req: Request<Body>) -> Result<Response<Body>, hyper::Error> {
        // Handle OPTIONS
        if req.method() == Method::OPTIONS {
            return Ok(with_headers(Response::new(Body::empty())));
        }

        if req.uri().path().trim_end_matches('/') != API_PATH {
            return Ok(plain(StatusCode::NOT_FOUND, "Not found"));
        }

        // Only accept POST
        if req.method() != Method::POST {
            return Ok(plain(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"));
        }

        let body_bytes = hyper::body::to_bytes(req.into_body()).await?;

        let value: serde_json::Value = match serde_json::from_slice(&body_bytes) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Rejecting malformed body: {}", e);
                return Ok(json_response(&RpcResponse::parse_error()));
            }
        };

        let id = value.get("id").cloned().unwrap_or_default();
        let rpc_request: RpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                let error = RpcError::InvalidRequest(e.to_string());
                return Ok(json_response(&RpcResponse::failure(&error, id)));
            }
        };

        let response = self.dispatcher.dispatch(rpc_request).await;
        Ok(json_response(&response))
    }
}

fn with_headers(mut response: Response<Body>) -> Response<Body> {
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("POST, OPTIONS"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
    response
}

fn plain(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
}

fn json_response(rpc: &RpcResponse) -> Response<Body> {
    let body = match serde_json::to_vec(rpc) {
        Ok(bytes) => Body::from(bytes),
        Err(e) => {
            tracing::error!("Failed to encode response: {}", e);
            return plain(StatusCode::BAD_REQUEST, "Unencodable response");
        }
    };
    let mut response = with_headers(Response::new(body));
    *response.status_mut() = rpc.http_status;
    response
}
