use aura_core::error::AuraError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

// ---------------------------------------------------------------------------
// Internal sentinels for explicit statuses
// ---------------------------------------------------------------------------

/// Carries an explicit 409 through the `anyhow::Error` chain.
#[derive(Debug)]
struct ConflictError(String);

impl std::fmt::Display for ConflictError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ConflictError {}

/// Carries an explicit 404 through the `anyhow::Error` chain.
#[derive(Debug)]
struct NotFoundError(String);

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for NotFoundError {}

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses. Bodies are
/// `{ "success": false, "error": "..." }`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(AuraError::Validation(msg.into()).into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self(ConflictError(msg.into()).into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(NotFoundError(msg.into()).into())
    }

    fn status(&self) -> StatusCode {
        if self.0.downcast_ref::<ConflictError>().is_some() {
            return StatusCode::CONFLICT;
        }
        if self.0.downcast_ref::<NotFoundError>().is_some() {
            return StatusCode::NOT_FOUND;
        }
        let Some(e) = self.0.downcast_ref::<AuraError>() else {
            return StatusCode::INTERNAL_SERVER_ERROR;
        };
        match e {
            AuraError::NotInitialized => StatusCode::BAD_REQUEST,
            AuraError::WorkItemNotFound { .. }
            | AuraError::PortfolioNotFound(_)
            | AuraError::BriefNotFound(_) => StatusCode::NOT_FOUND,
            AuraError::WorkItemExists { .. } => StatusCode::CONFLICT,
            AuraError::InvalidId(_) | AuraError::InvalidKind(_) | AuraError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AuraError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AuraError::LoadInProgress | AuraError::Busy(_) => StatusCode::CONFLICT,
            AuraError::Generation(_) => StatusCode::BAD_GATEWAY,
            AuraError::Render(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuraError::Io(_) | AuraError::Yaml(_) | AuraError::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({ "success": false, "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::preview::RenderError;

    fn status_of(err: AuraError) -> StatusCode {
        AppError(err.into()).into_response().status()
    }

    #[test]
    fn not_found_variants_map_to_404() {
        assert_eq!(
            status_of(AuraError::WorkItemNotFound {
                kind: "feature".into(),
                id: "F1".into()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(AuraError::BriefNotFound("B1".into())), StatusCode::NOT_FOUND);
    }

    #[test]
    fn duplicates_and_busy_map_to_409() {
        assert_eq!(
            status_of(AuraError::WorkItemExists {
                kind: "epic".into(),
                id: "E1".into()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(AuraError::LoadInProgress), StatusCode::CONFLICT);
        assert_eq!(status_of(AuraError::Busy("S1".into())), StatusCode::CONFLICT);
    }

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(status_of(AuraError::InvalidKind("sagas".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AuraError::InvalidId("a b".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AuraError::NotInitialized), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_transition_maps_to_422() {
        let err = AuraError::InvalidTransition {
            from: "table".into(),
            to: "generated".into(),
            reason: "no generation".into(),
        };
        assert_eq!(status_of(err), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn upstream_failures() {
        assert_eq!(status_of(AuraError::Generation("timeout".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_of(RenderError::Unavailable.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(std::io::Error::other("disk full").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn sentinels_and_foreign_errors() {
        assert_eq!(AppError::conflict("x").into_response().status(), StatusCode::CONFLICT);
        assert_eq!(AppError::not_found("x").into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::bad_request("x").into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError(anyhow::anyhow!("boom")).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_body_is_json() {
        let response = AppError::not_found("missing").into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
