use aura_core::generation::DesignCode;
use aura_core::preview::{compose_document, SandboxPolicy};
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PreviewQuery {
    /// `iframe` wraps the document in a sandboxed `<iframe srcdoc>`.
    #[serde(default)]
    pub embed: Option<String>,
}

/// POST /api/preview — compose a standalone document from generated code.
///
/// The document is served under a CSP `sandbox` directive carrying the same
/// tokens as the iframe, so opening it directly grants nothing extra.
pub async fn render_preview(
    State(app): State<AppState>,
    Query(query): Query<PreviewQuery>,
    Json(code): Json<DesignCode>,
) -> impl IntoResponse {
    let policy = SandboxPolicy::from_config(&app.config.preview);
    let document = compose_document(&code);
    let body = match query.embed.as_deref() {
        Some("iframe") => policy.iframe_tag(&document),
        _ => document,
    };
    let csp = format!("sandbox {}", policy.attribute());
    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (header::CONTENT_SECURITY_POLICY, csp),
        ],
        body,
    )
}
