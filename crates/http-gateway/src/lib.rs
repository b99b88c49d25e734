// Path: crates/http-gateway/src/lib.rs
#![forbid(unsafe_code)]
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! The agent-facing HTTP and WebSocket surface of the runtime.
//!
//! | route | purpose |
//! |---|---|
//! | `POST /control` | overwrite the command slot |
//! | `GET /observe` | WebSocket stream of UI snapshots |
//! | `POST /ton` | Action Gateway (`balance` / `call`) |
//! | `POST /snapshot` | renderer writes the snapshot slot |
//! | `GET /command` | renderer reads the command slot |
//! | `GET /metrics`, `GET /healthz` | operations |

mod handlers;
mod observe;

use aether_services::bridge::Bridge;
use aether_services::ton::ActionGateway;
use aether_telemetry::http::{healthz_handler, metrics_handler};
use aether_telemetry::rpc_metrics;
use aether_types::app::MalformedRequest;
use aether_types::config::RuntimeConfig;
use aether_types::error::{BridgeError, ErrorCode, StoreError};
use anyhow::Result;
use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    extract::{rejection::JsonRejection, ConnectInfo, MatchedPath, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use ipnetwork::IpNetwork;
use std::{
    net::{IpAddr, SocketAddr},
    str::FromStr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::{
    limit::ConcurrencyLimitLayer, load_shed::LoadShedLayer, timeout::TimeoutLayer, BoxError,
    ServiceBuilder,
};
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

// --- Error Handling ---
#[derive(Debug)]
pub enum AppError {
    /// The body could not be parsed into the expected request shape.
    BadRequest { code: &'static str, message: String },
    /// The body parsed but failed field-level validation.
    Unprocessable { code: &'static str, message: String },
    /// The shared state store is unreachable.
    Unavailable(String),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg, code) = match self {
            AppError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, message, code),
            AppError::Unprocessable { code, message } => {
                (StatusCode::UNPROCESSABLE_ENTITY, message, code)
            }
            AppError::Unavailable(s) => {
                tracing::error!(target: "http-gateway", "Store unavailable: {}", s);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Shared state store unavailable".to_string(),
                    "STORE_UNAVAILABLE",
                )
            }
            AppError::Internal(e) => {
                tracing::error!(target: "http-gateway", "Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_ERROR",
                )
            }
        };
        (
            status,
            Json(serde_json::json!({ "error": {"code": code, "message": msg} })),
        )
            .into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::BadRequest {
            code: "INVALID_REQUEST",
            message: e.body_text(),
        }
    }
}

impl From<MalformedRequest> for AppError {
    fn from(e: MalformedRequest) -> Self {
        AppError::BadRequest {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

impl From<BridgeError> for AppError {
    fn from(e: BridgeError) -> Self {
        aether_telemetry::error_metrics().inc_error("bridge", e.code());
        match e {
            BridgeError::InvalidCommand(_) => AppError::Unprocessable {
                code: e.code(),
                message: e.to_string(),
            },
            BridgeError::Store(StoreError::Backend(s)) => AppError::Unavailable(s),
            BridgeError::Codec(_) => AppError::Internal(e.into()),
        }
    }
}

// --- Rate Limiter ---

/// Buckets are swept for idle entries once every this many admissions.
const SWEEP_EVERY: u64 = 1024;

/// Per-client token buckets. A bucket that has refilled to `burst` is
/// indistinguishable from a fresh one and is evicted on the next sweep.
#[derive(Clone)]
struct IpLimiter {
    buckets: Arc<DashMap<IpAddr, Bucket>>,
    calls: Arc<AtomicU64>,
    rps: f64,
    burst: f64,
    trusted_proxy_cidrs: Arc<Vec<IpNetwork>>,
}

#[derive(Clone, Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

impl Bucket {
    fn refilled(&self, now: Instant, rps: f64, burst: f64) -> f64 {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        (self.tokens + elapsed * rps).min(burst)
    }
}

impl IpLimiter {
    fn new(rps: u32, burst: u32, trusted_proxy_cidrs: Arc<Vec<IpNetwork>>) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            calls: Arc::new(AtomicU64::new(0)),
            rps: rps as f64,
            burst: burst as f64,
            trusted_proxy_cidrs,
        }
    }

    fn client_ip<B>(&self, req: &Request<B>) -> IpAddr {
        let Some(peer_ip) = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|c| c.0.ip())
        else {
            return IpAddr::from([127, 0, 0, 1]);
        };
        if !self
            .trusted_proxy_cidrs
            .iter()
            .any(|cidr| cidr.contains(peer_ip))
        {
            return peer_ip;
        }
        req.headers()
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|xff| xff.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok())
            .unwrap_or(peer_ip)
    }

    fn allow<B>(&self, req: &Request<B>) -> bool {
        let ip = self.client_ip(req);
        let now = Instant::now();
        let admitted = {
            let mut entry = self.buckets.entry(ip).or_insert_with(|| Bucket {
                tokens: self.burst,
                last: now,
            });
            entry.tokens = entry.refilled(now, self.rps, self.burst);
            entry.last = now;
            if entry.tokens >= 1.0 {
                entry.tokens -= 1.0;
                true
            } else {
                false
            }
        };
        // The entry guard must be released before sweeping the map.
        if self.calls.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep_idle(now);
        }
        admitted
    }

    fn sweep_idle(&self, now: Instant) {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, b| b.refilled(now, self.rps, self.burst) < self.burst);
        tracing::debug!(
            target: "http-gateway",
            evicted = before.saturating_sub(self.buckets.len()),
            remaining = self.buckets.len(),
            "Swept idle rate-limit buckets"
        );
    }
}

async fn rate_limit_middleware(
    State(limiter): State<IpLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if limiter.allow(&req) {
        next.run(req).await
    } else {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": { "code": "RATE_LIMITED", "message": "Too many requests" }
            })),
        )
            .into_response()
    }
}

/// Records per-route request totals and latency.
async fn track_metrics(req: Request<Body>, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_string());
    let started = Instant::now();
    let resp = next.run(req).await;
    let metrics = rpc_metrics();
    metrics.observe_request_duration(&route, started.elapsed().as_secs_f64());
    metrics.inc_requests_total(&route, resp.status().as_u16());
    resp
}

// Small helper used by HandleErrorLayer to produce structured responses.
async fn map_middleware_error(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(serde_json::json!({
                "error": { "code": "TIMEOUT", "message": "request timed out" }
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "error": { "code": "OVERLOADED", "message": err.to_string() }
            })),
        )
    }
}

// --- State ---

/// Shared handler state. Cloning is cheap; every field is a handle.
#[derive(Clone, Debug)]
pub struct AppState {
    pub gateway: ActionGateway,
    pub bridge: Bridge,
    /// Flips to `true` when the server is shutting down, closing open observers.
    shutdown: Option<watch::Receiver<bool>>,
}

impl AppState {
    pub fn new(gateway: ActionGateway, bridge: Bridge) -> Self {
        Self {
            gateway,
            bridge,
            shutdown: None,
        }
    }
}

// --- Server ---
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen_addr: String,
    pub rps: u32,
    pub burst: u32,
    pub body_limit_kb: usize,
    pub request_timeout: Duration,
    pub concurrency_limit: usize,
    pub trusted_proxies: Vec<String>,
}

impl From<&RuntimeConfig> for GatewayConfig {
    fn from(cfg: &RuntimeConfig) -> Self {
        Self {
            listen_addr: cfg.listen_addr.clone(),
            rps: cfg.rps,
            burst: cfg.burst,
            body_limit_kb: cfg.body_limit_kb,
            request_timeout: Duration::from_secs(cfg.request_timeout_secs),
            concurrency_limit: 128,
            trusted_proxies: cfg.trusted_proxies.clone(),
        }
    }
}

/// Assembles the full router with its middleware stack.
pub fn build_router(config: &GatewayConfig, state: AppState) -> Router {
    let cidrs: Vec<IpNetwork> = config
        .trusted_proxies
        .iter()
        .filter_map(|s| match IpNetwork::from_str(s) {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::warn!(target: "http-gateway", cidr = %s, error = %e, "Ignoring invalid trusted proxy");
                None
            }
        })
        .collect();
    let limiter = IpLimiter::new(config.rps, config.burst, Arc::new(cidrs));

    // Request/response routes are bounded by the timeout; `/observe` lives as
    // long as its connection and is only rate limited on upgrade.
    let api = Router::new()
        .route("/control", post(handlers::control_handler))
        .route("/ton", post(handlers::ton_handler))
        .route("/snapshot", post(handlers::snapshot_handler))
        .route("/command", get(handlers::command_handler))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(map_middleware_error))
                .layer(LoadShedLayer::new())
                .layer(ConcurrencyLimitLayer::new(config.concurrency_limit))
                .layer(TimeoutLayer::new(config.request_timeout)),
        );

    Router::new()
        .route("/observe", get(observe::observe_handler))
        .merge(api)
        .route_layer(middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ))
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route_layer(middleware::from_fn(track_metrics))
        .with_state(Arc::new(state))
        // These layers are infallible and can be applied outside the error-handling wrapper.
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.body_limit_kb * 1024))
        .layer(CorsLayer::permissive())
}

/// Serves on an already-bound listener until `shutdown_rx` flips.
pub async fn serve(
    listener: TcpListener,
    config: &GatewayConfig,
    mut state: AppState,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    state.shutdown = Some(shutdown_rx.clone());
    let app = build_router(config, state);

    tracing::info!(target: "http-gateway", "Aether runtime listening on {}", listener.local_addr()?);
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_rx.changed().await.ok();
        tracing::info!(target: "http-gateway", "shutting down gracefully");
    });

    if let Err(e) = server.await {
        tracing::error!(target: "http-gateway", error = %e, "server error");
    }

    Ok(())
}

/// Binds `config.listen_addr` and serves until `shutdown_rx` flips.
pub async fn run_server(
    config: GatewayConfig,
    state: AppState,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    serve(listener, &config, state, shutdown_rx).await
}
