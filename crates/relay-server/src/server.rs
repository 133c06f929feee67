//! `RelayServer`: Axum HTTP + SSE server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::forward::OutboundSink;
use crate::health::{self, HealthResponse};
use crate::routes::{self, ingest, send, test_message};
use crate::shutdown::ShutdownCoordinator;
use crate::subscribers::{BroadcastEngine, ConnectionRegistry, stream};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Fan-out engine (and through it, the registry).
    pub engine: Arc<BroadcastEngine>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Port reported by `/health`.
    pub port: u16,
    /// Outbound sink for `/send`, when configured.
    pub forwarder: Option<Arc<dyn OutboundSink>>,
    /// Prometheus handle for `/metrics`, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// When the server started.
    pub start_time: Instant,
}

/// Handle to a running listener task.
pub struct ServerHandle {
    /// Address actually bound.
    pub local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Bound port.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }
}

/// The relay server.
pub struct RelayServer {
    config: Arc<ServerConfig>,
    engine: Arc<BroadcastEngine>,
    shutdown: Arc<ShutdownCoordinator>,
    forwarder: Option<Arc<dyn OutboundSink>>,
    metrics: Option<PrometheusHandle>,
    start_time: Instant,
}

impl RelayServer {
    /// Create a new server with an empty registry.
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            config: Arc::new(config),
            engine: Arc::new(BroadcastEngine::new(registry)),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            forwarder: None,
            metrics: None,
            start_time: Instant::now(),
        }
    }

    /// Attach the outbound sink used by `/send`.
    #[must_use]
    pub fn with_forwarder(mut self, sink: Arc<dyn OutboundSink>) -> Self {
        self.forwarder = Some(sink);
        self
    }

    /// Expose `/metrics` from this handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the router, reporting the configured port in `/health`.
    pub fn router(&self) -> Router {
        self.router_for(self.config.port)
    }

    /// Build the router, reporting `port` in `/health`.
    pub fn router_for(&self, port: u16) -> Router {
        let state = AppState {
            engine: Arc::clone(&self.engine),
            config: Arc::clone(&self.config),
            port,
            forwarder: self.forwarder.clone(),
            metrics: self.metrics.clone(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/events", get(stream::events_handler))
            .route("/webhook", post(ingest::webhook_handler))
            .route("/send", post(send::send_handler))
            .route("/test-message", post(test_message::test_message_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .fallback(routes::not_found_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&self.config.allowed_origins))
    }

    /// Bind the configured address and start serving.
    pub async fn start(&self) -> std::io::Result<ServerHandle> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        self.spawn(listener)
    }

    /// Serve on an already-bound listener until shutdown is requested.
    pub fn spawn(&self, listener: TcpListener) -> std::io::Result<ServerHandle> {
        let local_addr = listener.local_addr()?;
        let router = self.router_for(local_addr.port());
        let token = self.shutdown.token();

        log_banner(&self.config.host, local_addr.port());

        let task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server error");
            }
        });

        Ok(ServerHandle { local_addr, task })
    }

    /// Stop accepting, close every subscription and wait for the listener.
    ///
    /// Returns the number of subscribers that were still connected.
    pub async fn stop(&self, handle: ServerHandle) -> usize {
        let timeout = Duration::from_secs(self.config.shutdown_timeout_secs);
        let closed = self
            .shutdown
            .graceful_shutdown(self.engine.registry(), vec![handle.task], Some(timeout))
            .await;
        info!(closed, "relay stopped");
        closed
    }

    /// Get the broadcast engine.
    pub fn engine(&self) -> &Arc<BroadcastEngine> {
        &self.engine
    }

    /// Get the subscriber registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.engine.registry()
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::CACHE_CONTROL])
        .allow_credentials(true)
}

fn log_banner(host: &str, port: u16) {
    let display_host = if host == "0.0.0.0" { "localhost" } else { host };
    let base = format!("http://{display_host}:{port}");
    info!(port, "relay listening");
    info!("SSE endpoint: {base}/events");
    info!("webhook endpoint: {base}/webhook");
    info!("send endpoint: {base}/send");
    info!("test endpoint: {base}/test-message");
    info!("health check: {base}/health");
    info!(r#"webhook body: {{"message": "text", "from": "Bot", "sessionId": "optional"}}"#);
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.engine.registry().count(),
        state.port,
        state.start_time.elapsed().as_secs(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            crate::metrics::render(&handle),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
