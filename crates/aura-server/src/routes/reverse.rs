use aura_core::store::ExtractedItems;
use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/reverse-engineer/save — persist extracted items. Either every
/// item is saved or none is.
pub async fn save_extracted(
    State(app): State<AppState>,
    Json(extracted): Json<ExtractedItems>,
) -> Result<Json<serde_json::Value>, AppError> {
    let state = app.clone();
    let saved =
        tokio::task::spawn_blocking(move || state.commit(|store| store.save_extracted(extracted)))
            .await
            .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    app.notify();
    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "saved": saved },
        "message": format!("Saved {saved} work items"),
    })))
}
