pub mod state;

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use self::state::{BridgeState, WebCommand};
use crate::calibration::{CalibrationPoint, LeverId};

/// Shared state for the web server.
pub struct WebState {
    pub bridge: Arc<BridgeState>,
    pub cmd_tx: mpsc::Sender<WebCommand>,
}

pub fn router(bridge: Arc<BridgeState>, cmd_tx: mpsc::Sender<WebCommand>) -> Router {
    let shared = Arc::new(WebState { bridge, cmd_tx });

    Router::new()
        .route("/api/state", get(api_state))
        .route("/api/enable", post(api_enable))
        .route("/api/disable", post(api_disable))
        .route("/api/settings/save", post(api_save))
        .route("/api/calibrate/:lever/:point", post(api_calibrate))
        .with_state(shared)
}

/// Start the web server on the given port.
pub async fn start_server(
    port: u16,
    bridge: Arc<BridgeState>,
    cmd_tx: mpsc::Sender<WebCommand>,
) -> anyhow::Result<()> {
    let app = router(bridge, cmd_tx);

    let addr = format!("0.0.0.0:{port}");
    info!("[WEB] Server starting on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// GET /api/state
async fn api_state(State(state): State<Arc<WebState>>) -> Json<serde_json::Value> {
    Json(state.bridge.snapshot_json())
}

/// POST /api/enable
async fn api_enable(State(state): State<Arc<WebState>>) -> StatusCode {
    send(&state, WebCommand::Enable).await
}

/// POST /api/disable
async fn api_disable(State(state): State<Arc<WebState>>) -> StatusCode {
    send(&state, WebCommand::Disable).await
}

/// POST /api/settings/save
async fn api_save(State(state): State<Arc<WebState>>) -> StatusCode {
    send(&state, WebCommand::SaveSettings).await
}

/// POST /api/calibrate/{lever}/{min|middle|max|reset}
async fn api_calibrate(
    State(state): State<Arc<WebState>>,
    Path((lever, point)): Path<(String, String)>,
) -> StatusCode {
    match parse_calibrate(&lever, &point) {
        Ok(cmd) => send(&state, cmd).await,
        Err(status) => {
            warn!("[WEB] Rejected calibrate {lever}/{point}");
            status
        }
    }
}

fn parse_calibrate(lever: &str, point: &str) -> Result<WebCommand, StatusCode> {
    let lever = LeverId::from_path(lever).ok_or(StatusCode::NOT_FOUND)?;
    if point == "reset" {
        return Ok(WebCommand::Reset(lever));
    }
    let point = CalibrationPoint::from_path(point).ok_or(StatusCode::NOT_FOUND)?;
    if lever.point_label(point).is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(WebCommand::Capture(lever, point))
}

async fn send(state: &WebState, cmd: WebCommand) -> StatusCode {
    match state.cmd_tx.send(cmd).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            error!("[WEB] Failed to send command: {e}");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
