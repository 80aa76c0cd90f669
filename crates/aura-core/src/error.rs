use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuraError {
    #[error("not initialized: run 'aura init'")]
    NotInitialized,

    #[error("{kind} not found: {id}")]
    WorkItemNotFound { kind: String, id: String },

    #[error("{kind} already exists: {id}")]
    WorkItemExists { kind: String, id: String },

    #[error("portfolio not found: {0}")]
    PortfolioNotFound(String),

    #[error("business brief not found: {0}")]
    BriefNotFound(String),

    #[error("invalid id '{0}': must be non-empty and contain no whitespace or slashes")]
    InvalidId(String),

    #[error("invalid work item kind: {0}")]
    InvalidKind(String),

    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("load already in progress")]
    LoadInProgress,

    #[error("already running for '{0}'")]
    Busy(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Render(#[from] crate::preview::RenderError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AuraError>;
