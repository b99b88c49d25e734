// Path: crates/http-gateway/src/handlers.rs
use crate::{AppError, AppState};
use aether_types::app::{ActionRequest, ActionResult, ControlAck, ControlCommand, UiSnapshot};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::de::IgnoredAny;
use serde_json::Value;
use std::sync::Arc;

/// `POST /control`: one blind overwrite of the command slot.
pub(crate) async fn control_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ControlCommand>, JsonRejection>,
) -> Result<Json<ControlAck>, AppError> {
    let Json(command) = payload?;
    let ack = state.bridge.dispatch_command(command).await?;
    Ok(Json(ack))
}

/// `POST /ton`: an unknown action or a malformed body is a 400; everything the
/// gateway itself decides (including upstream failures) is a 200 with an
/// `ActionResult` body.
pub(crate) async fn ton_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ActionResult>, AppError> {
    let Json(body) = payload?;
    let request = ActionRequest::from_json(body).map_err(|e| {
        tracing::warn!(target: "http-gateway", error = %e, "Rejected malformed /ton request");
        AppError::from(e)
    })?;
    Ok(Json(state.gateway.handle(request).await))
}

/// `POST /snapshot`: the renderer pushes its serialized UI state. The body must
/// be JSON but is stored byte-for-byte.
pub(crate) async fn snapshot_handler(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<Value>, AppError> {
    serde_json::from_str::<IgnoredAny>(&body).map_err(|e| AppError::BadRequest {
        code: "INVALID_SNAPSHOT",
        message: e.to_string(),
    })?;
    state.bridge.publish_snapshot(UiSnapshot::new(body)).await?;
    Ok(Json(serde_json::json!({ "status": "stored" })))
}

/// `GET /command`: the renderer polls the latest command, or `null`.
pub(crate) async fn command_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Option<ControlCommand>>, AppError> {
    Ok(Json(state.bridge.current_command().await?))
}
