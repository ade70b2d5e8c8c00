//! Gateway HTTP server.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all gateway handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Sync the proxy registry from the membership snapshot at startup
//! - Apply discovery events (add/remove) to the proxy registry
//! - Resolve inbound requests to a backend handle and forward
//! - Run the one-shot failover retry on forwarding errors
//!
//! # Per-connection state machine
//! ```text
//! Received → Resolving → { Forwarding | Rejected(503) | Dropped }
//! Forwarding → Retrying (exactly once) → { Forwarding | Rejected }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{FromRequestParts, State, WebSocketUpgrade},
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{MakeRequestUuid, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::discovery::{Action, Discovery, DiscoveryEvent};
use crate::failover;
use crate::http::websocket;
use crate::observability::metrics;
use crate::proxy::ProxyRegistry;
use crate::routing::Resolver;

/// Total forward attempts per request: the original try plus one retry.
const MAX_FORWARD_ATTEMPTS: u32 = 2;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    pub proxies: Arc<ProxyRegistry>,
    pub discovery: Arc<dyn Discovery>,
    pub socket_idle_timeout: Duration,
    pub max_body_bytes: usize,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    discovery: Arc<dyn Discovery>,
    proxies: Arc<ProxyRegistry>,
}

impl GatewayServer {
    /// Create a new gateway server with the given configuration and an
    /// already-connected discovery registry.
    pub fn new(config: &GatewayConfig, discovery: Arc<dyn Discovery>) -> Self {
        // One keep-alive client shared by every handle.
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let proxies = Arc::new(ProxyRegistry::new(client));
        let resolver = Arc::new(Resolver::new(discovery.clone(), proxies.clone()));

        let state = AppState {
            resolver,
            proxies: proxies.clone(),
            discovery: discovery.clone(),
            socket_idle_timeout: Duration::from_secs(config.timeouts.socket_idle_secs),
            max_body_bytes: config.limits.max_body_bytes,
        };

        let router = Self::build_router(config, state);
        Self {
            router,
            discovery,
            proxies,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server on a plain listener, applying discovery events until
    /// shutdown.
    pub async fn run(
        self,
        listener: TcpListener,
        events: mpsc::UnboundedReceiver<DiscoveryEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway listening");

        self.sync_members().await;
        Self::spawn_control_loop(self.proxies.clone(), events);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }

    /// Run the server with TLS via axum-server.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        events: mpsc::UnboundedReceiver<DiscoveryEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "Gateway listening (https)");

        self.sync_members().await;
        Self::spawn_control_loop(self.proxies.clone(), events);

        let handle = axum_server::Handle::new();
        let graceful = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            graceful.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }

    /// Reconcile the local handle table with the current membership
    /// snapshot. Subscribers see no replay, so this must run after
    /// subscribing and before serving.
    async fn sync_members(&self) {
        match self.discovery.list_members().await {
            Ok(nodes) => {
                for node in &nodes {
                    self.proxies.register(node);
                }
                tracing::info!(backends = nodes.len(), "Synced fleet membership");
            }
            Err(error) => {
                // Degraded start: handles fill in as discovery events arrive.
                tracing::error!(%error, "Could not sync fleet membership");
            }
        }
    }

    /// Apply membership changes to the local handle table, in publish order.
    fn spawn_control_loop(
        proxies: Arc<ProxyRegistry>,
        mut events: mpsc::UnboundedReceiver<DiscoveryEvent>,
    ) {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                tracing::debug!(action = ?event.action, node = %event.node, "Discovery event");
                match event.action {
                    Action::Add => proxies.register(&event.node),
                    Action::Remove => proxies.unregister(&event.node.process_id),
                }
            }
            tracing::debug!("Discovery event stream closed");
        });
    }
}

/// Catch-all entry point: WebSocket upgrades peel off to the relay path,
/// everything else is forwarded as plain HTTP.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    if !is_upgrade_request(&request) {
        return handle_request(state, request).await;
    }

    let (mut parts, body) = request.into_parts();
    match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
        Ok(upgrade) => handle_upgrade(state, upgrade, Request::from_parts(parts, body)).await,
        Err(rejection) => rejection.into_response(),
    }
}

fn is_upgrade_request(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("websocket"))
}

/// Plain request path: resolve, forward, retry once on forwarding failure.
async fn handle_request(state: AppState, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request);
    let method = request.method().to_string();

    let (parts, body) = request.into_parts();
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_string();

    // Buffered so a failed forward can be replayed against another backend.
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!(request_id = %request_id, target = %target, %error, "Refusing unbufferable body");
            metrics::record_request(&method, 413, "none", start_time);
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let mut attempts = 0;
    loop {
        attempts += 1;

        let handle = match state.resolver.resolve(&parts.uri).await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                tracing::error!(
                    request_id = %request_id,
                    target = %target,
                    backends = state.proxies.len(),
                    "No backend available"
                );
                metrics::record_request(&method, 503, "none", start_time);
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
            Err(error) => {
                tracing::error!(request_id = %request_id, target = %target, %error, "Routing degraded");
                metrics::record_request(&method, 503, "none", start_time);
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
        };

        let node = handle.node().clone();
        match handle.forward(&parts, body.clone()).await {
            Ok(response) => {
                metrics::record_request(
                    &method,
                    response.status().as_u16(),
                    &node.address,
                    start_time,
                );
                return response.into_response();
            }
            Err(error) => {
                failover::handle_failure(&state.discovery, &state.proxies, &node, &target, &error);

                if attempts < MAX_FORWARD_ATTEMPTS {
                    tracing::info!(
                        request_id = %request_id,
                        attempt = attempts,
                        "Retrying against remaining fleet"
                    );
                    continue;
                }

                metrics::record_request(&method, 502, &node.address, start_time);
                return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
            }
        }
    }
}

/// WebSocket upgrade path: the backend connection is established before the
/// client handshake completes, so a dead backend can still be failed over.
/// With no backend available the handshake is refused; the client never
/// sees an upgrade response.
async fn handle_upgrade(
    state: AppState,
    upgrade: WebSocketUpgrade,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request);
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_string();

    let mut attempts = 0;
    let (backend, node) = loop {
        attempts += 1;

        let handle = match state.resolver.resolve(request.uri()).await {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                tracing::error!(
                    request_id = %request_id,
                    target = %target,
                    backends = state.proxies.len(),
                    "No backend available for upgrade, dropping"
                );
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
            Err(error) => {
                tracing::error!(request_id = %request_id, target = %target, %error, "Routing degraded");
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
        };

        let node = handle.node().clone();
        match handle.connect_ws(&target).await {
            Ok(stream) => break (stream, node),
            Err(error) => {
                failover::handle_failure(&state.discovery, &state.proxies, &node, &target, &error);

                if attempts < MAX_FORWARD_ATTEMPTS {
                    tracing::info!(
                        request_id = %request_id,
                        attempt = attempts,
                        "Retrying upgrade against remaining fleet"
                    );
                    continue;
                }

                return StatusCode::BAD_GATEWAY.into_response();
            }
        }
    };

    metrics::record_request(request.method().as_str(), 101, &node.address, start_time);

    let idle_timeout = state.socket_idle_timeout;
    upgrade.on_upgrade(move |client| websocket::relay(client, backend, node, idle_timeout))
}

fn request_id(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
