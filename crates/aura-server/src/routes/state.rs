use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /api/state — collection counts, loader state and active generations.
pub async fn get_state(State(app): State<AppState>) -> Json<serde_json::Value> {
    let counts = app.read_store().counts();
    Json(serde_json::json!({
        "success": true,
        "data": {
            "counts": counts,
            "total": counts.total(),
            "loader": app.loader.state(),
            "activeGenerations": app.generations.len(),
            "provider": app.backend.name(),
        },
    }))
}
