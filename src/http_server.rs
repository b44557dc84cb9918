//! HTTP surface over [`ControlService`].
//!
//! Thin by intent: handlers only translate between HTTP and the control
//! layer's result types.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::control::{ControlService, Lease, OperationResult, StatusResponse, ValidationResult};
use crate::error::{ControlError, ErrorKind};

const DEFAULT_ACTIVITY_LIMIT: usize = 50;

type AppState = Arc<ControlService>;

pub struct HttpServer {
    service: Arc<ControlService>,
    addr: SocketAddr,
}

impl HttpServer {
    /// Listens on the address from the service configuration.
    pub fn new(service: Arc<ControlService>) -> Self {
        let addr = service.config().listen;
        Self { service, addr }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until SIGINT/SIGTERM.
    pub async fn run(&self) -> anyhow::Result<()> {
        let app = router(Arc::clone(&self.service));

        tracing::info!("Starting HTTP server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

pub fn router(service: Arc<ControlService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/status", get(status_handler))
        .route("/api/config", get(get_config_handler).post(set_config_handler))
        .route("/api/test-config", post(test_config_handler))
        .route("/api/restart", post(restart_handler))
        .route("/api/apply", post(apply_handler))
        .route("/api/leases", get(leases_handler))
        .route("/api/activity", get(activity_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                    _ = sigint.recv() => tracing::info!("Received SIGINT"),
                }
            }
            _ => {
                tracing::warn!("Could not install signal handlers, falling back to Ctrl+C");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received Ctrl+C");
    }
}

fn error_response(err: ControlError) -> Response {
    let status = match err.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Permission => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(OperationResult::from(err))).into_response()
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn status_handler(State(service): State<AppState>) -> Json<StatusResponse> {
    let snapshot = service.get_status().await;
    Json(StatusResponse::from(&snapshot))
}

async fn get_config_handler(State(service): State<AppState>) -> Response {
    match service.get_config().await {
        Ok(blob) => ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], blob).into_response(),
        Err(e) => error_response(e),
    }
}

async fn set_config_handler(State(service): State<AppState>, body: Bytes) -> Json<OperationResult> {
    Json(service.apply_config(body.to_vec()).await)
}

async fn test_config_handler(
    State(service): State<AppState>,
    body: Bytes,
) -> Json<ValidationResult> {
    Json(service.check_config(&body).await)
}

async fn restart_handler(State(service): State<AppState>) -> Json<OperationResult> {
    Json(service.restart_daemon().await)
}

async fn apply_handler(State(service): State<AppState>, body: Bytes) -> Json<OperationResult> {
    Json(service.apply_and_restart(body.to_vec()).await)
}

async fn leases_handler(State(service): State<AppState>) -> Result<Json<Vec<Lease>>, Response> {
    service.leases().await.map(Json).map_err(error_response)
}

#[derive(Debug, Deserialize)]
struct ActivityQuery {
    limit: Option<usize>,
}

async fn activity_handler(
    State(service): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Json<Value> {
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    Json(json!(service.activity(limit)))
}
