use aura_core::types::WorkItemKind;
use aura_core::work_item::WorkItem;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/{kind}/list — one work-item collection in source order.
pub async fn list_items(
    State(app): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let kind: WorkItemKind = kind.parse()?;
    let store = app.read_store();
    Ok(Json(serde_json::json!({
        "success": true,
        "data": store.items(kind),
    })))
}

/// GET /api/portfolios
pub async fn list_portfolios(State(app): State<AppState>) -> Json<serde_json::Value> {
    let store = app.read_store();
    Json(serde_json::json!({ "success": true, "data": store.portfolios() }))
}

/// GET /api/business-briefs
pub async fn list_business_briefs(State(app): State<AppState>) -> Json<serde_json::Value> {
    let store = app.read_store();
    Json(serde_json::json!({ "success": true, "data": store.business_briefs() }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReloadBody {
    #[serde(default)]
    pub force: Option<bool>,
}

/// POST /api/work-items/reload — clear then reload every collection from
/// disk. 409 while another load is running.
pub async fn reload(
    State(app): State<AppState>,
    body: Option<Json<ReloadBody>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let force = body.and_then(|Json(b)| b.force).unwrap_or(true);
    let state = app.clone();
    let counts = tokio::task::spawn_blocking(move || state.reload(force))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    let counts = counts.unwrap_or_else(|| app.read_store().counts());
    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "counts": counts, "loader": app.loader.state() },
    })))
}

/// POST /api/work-items/{kind} — add one item and persist.
pub async fn add_item(
    State(app): State<AppState>,
    Path(kind): Path<String>,
    Json(mut item): Json<WorkItem>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let kind: WorkItemKind = kind.parse()?;
    if item.id.trim().is_empty() {
        item.id = WorkItem::generate_id(kind);
    }
    let state = app.clone();
    let saved = tokio::task::spawn_blocking(move || {
        let id = item.id.clone();
        state.commit(|store| {
            store.add(kind, item)?;
            Ok(store.get(kind, &id).cloned())
        })
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    app.notify();
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "success": true, "data": saved })),
    ))
}
