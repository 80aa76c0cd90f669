use aura_core::generation::{
    bundle_file_name, generate_code_with_fallback, generate_with_fallback, CodeRequest, CodeType,
    DesignRequest, ImageAttachment,
};
use aura_core::types::WorkflowStage;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    pub work_item_id: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default)]
    pub image_type: Option<String>,
    #[serde(default)]
    pub framework: Option<String>,
}

/// POST /api/generate-design-code — generate a design for one work item.
///
/// One generation per work item at a time (409 otherwise). Backend failures
/// are answered with the template design and `usedFallback: true`. When the
/// workflow session is at the config stage for this item, the result moves
/// it to the generated stage.
pub async fn generate_design_code(
    State(app): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let item = app
        .read_store()
        .find(&body.work_item_id)
        .cloned()
        .ok_or_else(|| AppError::not_found(format!("work item not found: {}", body.work_item_id)))?;

    let image = match (body.image_data, body.image_type) {
        (Some(data), Some(mime)) if !data.is_empty() => {
            let attachment = ImageAttachment {
                data_base64: data,
                mime_type: mime,
            };
            if !attachment.mime_type.starts_with("image/") {
                return Err(AppError::bad_request(format!(
                    "imageType must be an image MIME type, got '{}'",
                    attachment.mime_type
                )));
            }
            attachment.decoded_len()?;
            Some((attachment, "uploaded image".to_string()))
        }
        (Some(data), None) if !data.is_empty() => {
            return Err(AppError::bad_request("imageData requires imageType"));
        }
        _ => None,
    };

    let Some(_guard) = app.generations.try_begin(item.id.clone()) else {
        return Err(AppError::conflict(format!(
            "generation already running for '{}'",
            item.id
        )));
    };
    let token = app.requests.issue(&item.id);

    let framework = body
        .framework
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| app.config.generation.framework.clone());
    let request = DesignRequest::from_work_item(&item, body.prompt.as_deref(), image, &framework);
    let outcome = generate_with_fallback(app.backend.as_ref(), &request, &item).await;

    let superseded = !app.requests.is_current(&item.id, token);
    let stage = {
        let mut session = app.lock_session();
        let waiting = session.selected() == Some(item.id.as_str())
            && session.stage() == WorkflowStage::Config;
        if superseded {
            tracing::debug!(work_item = %item.id, "generation finished after a newer request");
        } else if waiting {
            session.complete_generation(outcome.code.clone())?;
        }
        session.stage()
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "data": {
            "code": {
                "html": outcome.code.html,
                "css": outcome.code.css,
                "javascript": outcome.code.javascript,
            },
            "framework": outcome.code.framework,
            "provider": outcome.provider,
            "usedFallback": outcome.used_fallback,
            "superseded": superseded,
            "stage": stage,
        },
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodeBody {
    pub work_item_id: String,
    #[serde(default)]
    pub code_type: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

/// POST /api/generate-code — generate a runnable project for one work item.
///
/// Failures are answered with the template project and `usedFallback: true`.
/// `fileName` is the suggested name for the markdown bundle.
pub async fn generate_code(
    State(app): State<AppState>,
    Json(body): Json<GenerateCodeBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let item = app
        .read_store()
        .find(&body.work_item_id)
        .cloned()
        .ok_or_else(|| AppError::not_found(format!("work item not found: {}", body.work_item_id)))?;
    let code_type: CodeType = match body.code_type.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw.parse()?,
        _ => CodeType::default(),
    };

    let key = format!("code:{}", item.id);
    let Some(_guard) = app.generations.try_begin(key) else {
        return Err(AppError::conflict(format!(
            "code generation already running for '{}'",
            item.id
        )));
    };

    let request = CodeRequest::from_work_item(
        &item,
        code_type,
        body.language.as_deref().unwrap_or_default(),
        body.prompt.as_deref(),
    );
    let outcome = generate_code_with_fallback(app.backend.as_ref(), &request, &item).await;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": {
            "project": outcome.project,
            "provider": outcome.provider,
            "usedFallback": outcome.used_fallback,
            "fileName": bundle_file_name(&item.id),
        },
    })))
}
