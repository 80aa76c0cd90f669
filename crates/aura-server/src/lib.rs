pub mod backend;
pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router for the project at `root`.
pub fn build_router(root: PathBuf) -> Router {
    router_with_state(state::AppState::new(root))
}

/// Build the Router around an existing state. Tests use this to inject a
/// generation backend.
pub fn router_with_state(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // State
        .route("/api/state", get(routes::state::get_state))
        .route("/api/hierarchy", get(routes::hierarchy::get_hierarchy))
        .route("/api/hierarchy/rows", get(routes::hierarchy::get_rows))
        // Collections
        .route("/api/{kind}/list", get(routes::items::list_items))
        .route("/api/portfolios", get(routes::items::list_portfolios))
        .route(
            "/api/business-briefs",
            get(routes::items::list_business_briefs),
        )
        .route("/api/work-items/reload", post(routes::items::reload))
        .route("/api/work-items/{kind}", post(routes::items::add_item))
        .route(
            "/api/reverse-engineer/save",
            post(routes::reverse::save_extracted),
        )
        // Preview and generation
        .route("/api/preview", post(routes::preview::render_preview))
        .route(
            "/api/generate-design-code",
            post(routes::generate::generate_design_code),
        )
        .route("/api/generate-code", post(routes::generate::generate_code))
        // Design workflow
        .route("/api/workflow", get(routes::workflow::get_workflow))
        .route("/api/workflow/select", post(routes::workflow::select))
        .route("/api/workflow/back", post(routes::workflow::back))
        .route("/api/workflow/save", post(routes::workflow::save))
        .route(
            "/api/workflow/saved/{id}",
            get(routes::workflow::view_saved),
        )
        .route("/api/workflow/preview", get(routes::workflow::preview))
        .route("/api/workflow/download", get(routes::workflow::download))
        // Hand-off
        .route("/api/handoff", post(routes::handoff::put_handoff))
        .route("/api/handoff/take", post(routes::handoff::take_handoff))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Serve on a pre-bound listener, so the caller can learn the port first
/// (useful with `port = 0`).
pub async fn serve_on(
    root: PathBuf,
    listener: tokio::net::TcpListener,
    open_browser: bool,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(root);

    tracing::info!("aura server listening on http://localhost:{actual_port}");

    if open_browser {
        let url = format!("http://localhost:{actual_port}/api/hierarchy");
        let _ = open::that(&url);
    }

    axum::serve(listener, app).await?;
    Ok(())
}
