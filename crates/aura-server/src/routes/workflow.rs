use aura_core::error::AuraError;
use aura_core::preview::{render_design, FrameRenderer, MemoryFrame};
use aura_core::view_state::WorkflowSession;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::state::AppState;

fn session_view(session: &WorkflowSession) -> serde_json::Value {
    let saved: Vec<&str> = session.saved_ids().collect();
    serde_json::json!({
        "stage": session.stage(),
        "selected": session.selected(),
        "prompt": session.prompt(),
        "generated": session.generated(),
        "savedDesigns": saved,
    })
}

/// GET /api/workflow — the design workflow session.
pub async fn get_workflow(State(app): State<AppState>) -> Json<serde_json::Value> {
    let session = app.lock_session();
    Json(serde_json::json!({ "success": true, "data": session_view(&session) }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectBody {
    pub work_item_id: String,
    #[serde(default)]
    pub prompt: Option<String>,
}

/// POST /api/workflow/select — select a work item and move to the config
/// stage. 422 once a design has been generated; go back first.
pub async fn select(
    State(app): State<AppState>,
    Json(body): Json<SelectBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    if app.read_store().find(&body.work_item_id).is_none() {
        return Err(AppError::not_found(format!(
            "work item not found: {}",
            body.work_item_id
        )));
    }

    let mut session = app.lock_session();
    let mut staged = session.clone();
    staged.select(body.work_item_id);
    if let Some(prompt) = body.prompt {
        staged.set_prompt(prompt);
    }
    staged.advance_to_config()?;
    *session = staged;
    Ok(Json(serde_json::json!({ "success": true, "data": session_view(&session) })))
}

/// POST /api/workflow/back — return to the table, dropping the selection.
pub async fn back(State(app): State<AppState>) -> Json<serde_json::Value> {
    let mut session = app.lock_session();
    session.back();
    Json(serde_json::json!({ "success": true, "data": session_view(&session) }))
}

/// POST /api/workflow/save — keep the generated design under the selected
/// work item and return to the table.
pub async fn save(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let mut session = app.lock_session();
    let id = session.save_design()?;
    tracing::info!(work_item = %id, "design saved");
    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "savedId": id, "workflow": session_view(&session) },
    })))
}

/// GET /api/workflow/saved/{id} — reopen a saved design in the generated stage.
pub async fn view_saved(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut session = app.lock_session();
    session.view_saved(&id)?;
    Ok(Json(serde_json::json!({ "success": true, "data": session_view(&session) })))
}

/// GET /api/workflow/preview — render the generated design into an
/// in-memory frame and return the document the frame ends up showing.
pub async fn preview(State(app): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let generated = app.lock_session().generated().cloned();
    let Some(code) = generated else {
        return Err(AppError::not_found("no generated design"));
    };

    let frame = Arc::new(MemoryFrame::new());
    let renderer = FrameRenderer::new(frame.clone(), &app.config.preview);
    let composed = render_design(&renderer, &code)
        .await
        .map_err(AuraError::from)?;
    let document = frame.document().unwrap_or(composed);
    Ok((
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        document,
    ))
}

/// GET /api/workflow/download — the generated design as a plain-text file.
pub async fn download(State(app): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let session = app.lock_session();
    let (Some(id), Some(code)) = (session.selected(), session.generated()) else {
        return Err(AppError::not_found("no generated design"));
    };
    let disposition = format!("attachment; filename=\"{id}-design.txt\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        code.download_text(),
    ))
}
