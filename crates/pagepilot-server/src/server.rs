//! Axum web server

use anyhow::Context;
use axum::{
    extract::State,
    http::{HeaderValue, Method, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use pagepilot_core::config::ServerSettings;
use pagepilot_core::VerificationReport;
use pagepilot_metrics::ReportStore;
use pagepilot_orchestrator::{Command, ProgressEvent, SessionHandle};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::ws;

/// Shared application state
pub struct AppState {
    pub session: SessionHandle,
    pub report_store: ReportStore,
}

pub type SharedState = Arc<AppState>;

/// Build the router without binding, for embedding and tests
pub fn router(state: SharedState, allowed_origin: &str) -> anyhow::Result<Router> {
    let origin: HeaderValue = allowed_origin
        .parse()
        .with_context(|| format!("Invalid CORS origin: {}", allowed_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Ok(Router::new()
        .route("/", get(root))
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health))
        .route("/reset", post(reset))
        .route("/api/report", get(latest_report))
        .layer(cors)
        .with_state(state))
}

/// Serve until the listener fails or the process stops
pub async fn serve(settings: &ServerSettings, state: SharedState) -> anyhow::Result<()> {
    let app = router(state, &settings.allowed_origin)?;
    let addr = format!("{}:{}", settings.host, settings.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("pagepilot server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// GET /
async fn root() -> Json<Value> {
    Json(json!({
        "service": "pagepilot",
        "status": "running",
        "websocket": "/ws"
    }))
}

/// GET /health - answered from the published snapshot, never queued
async fn health(State(app): State<SharedState>) -> Json<Value> {
    let snapshot = app.session.snapshot();
    Json(json!({
        "status": "healthy",
        "phase": snapshot.phase,
        "metrics": snapshot.metrics
    }))
}

/// POST /reset - queued behind any in-flight command
async fn reset(State(app): State<SharedState>) -> Result<Json<Value>, StatusCode> {
    let events = app.session.execute(Command::Reset).await.map_err(|e| {
        error!("Reset could not be queued: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    let message = events
        .into_iter()
        .find_map(|event| match event {
            ProgressEvent::Info { message } => Some(message),
            _ => None,
        })
        .unwrap_or_else(|| "Session reset".to_string());

    Ok(Json(json!({ "status": "reset", "message": message })))
}

/// GET /api/report - the latest report side file, independent of the session
async fn latest_report(State(app): State<SharedState>) -> Result<Json<VerificationReport>, StatusCode> {
    match app.report_store.load().await {
        Ok(Some(report)) => Ok(Json(report)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to read latest report: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
