use aura_core::handoff::HandoffPayload;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffBody {
    pub work_item_id: String,
    #[serde(default)]
    pub auto_advance: bool,
}

/// POST /api/handoff — stage a work item for the design view.
pub async fn put_handoff(
    State(app): State<AppState>,
    Json(body): Json<HandoffBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let item = app
        .read_store()
        .find(&body.work_item_id)
        .cloned()
        .ok_or_else(|| AppError::not_found(format!("work item not found: {}", body.work_item_id)))?;
    let payload = HandoffPayload::from_work_item(&item);
    app.lock_handoff().put_selection(&payload, body.auto_advance)?;

    let state = app.clone();
    tokio::task::spawn_blocking(move || state.persist_handoff())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(serde_json::json!({ "success": true, "data": payload })))
}

/// POST /api/handoff/take — read and clear the staged hand-off, applying it
/// to the workflow session. With auto-advance the session moves to config
/// with a pre-filled prompt.
pub async fn take_handoff(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let taken = app.lock_handoff().take_selection();

    let state = app.clone();
    tokio::task::spawn_blocking(move || state.persist_handoff())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    let Some(handoff) = taken else {
        return Ok(Json(serde_json::json!({ "success": true, "data": null })));
    };

    let mut session = app.lock_session();
    let prompt = session.accept_handoff(&handoff.payload, handoff.auto_advance)?;
    Ok(Json(serde_json::json!({
        "success": true,
        "data": {
            "workItem": handoff.payload,
            "autoAdvance": handoff.auto_advance,
            "stage": session.stage(),
            "selected": session.selected(),
            "prompt": prompt,
        },
    })))
}
