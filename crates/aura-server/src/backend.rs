use async_trait::async_trait;
use aura_core::config::GenerationConfig;
use aura_core::error::{AuraError, Result};
use aura_core::generation::{
    parse_code_response, parse_design_response, CodeProject, CodeRequest, DesignCode,
    DesignRequest, GenerationBackend, MockGenerationBackend,
};
use std::sync::Arc;
use std::time::Duration;

/// Posts the request JSON to a remote generation endpoint and parses the
/// `{ success, data }` envelope it answers with.
pub struct HttpGenerationBackend {
    client: reqwest::Client,
    endpoint: String,
    code_endpoint: Option<String>,
}

impl HttpGenerationBackend {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuraError::Generation(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            code_endpoint: None,
        })
    }

    pub fn with_code_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.code_endpoint = Some(endpoint.into());
        self
    }

    async fn post<T: serde::Serialize>(&self, url: &str, body: &T) -> Result<(u16, String)> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuraError::Generation(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AuraError::Generation(e.to_string()))?;
        Ok((status, body))
    }
}

#[async_trait]
impl GenerationBackend for HttpGenerationBackend {
    fn name(&self) -> &str {
        "Http"
    }

    async fn generate_design(&self, request: &DesignRequest) -> Result<DesignCode> {
        let (status, body) = self.post(&self.endpoint, request).await?;
        parse_design_response(status, &body)
    }

    async fn generate_code(&self, request: &CodeRequest) -> Result<CodeProject> {
        let Some(endpoint) = self.code_endpoint.as_deref() else {
            return Err(AuraError::Generation("no code endpoint configured".into()));
        };
        let (status, body) = self.post(endpoint, request).await?;
        parse_code_response(status, &body)
    }
}

/// The HTTP backend when a live endpoint is enabled, otherwise the mock.
pub fn from_config(config: &GenerationConfig) -> Arc<dyn GenerationBackend> {
    let Some(endpoint) = config.live_endpoint() else {
        return Arc::new(MockGenerationBackend);
    };
    match HttpGenerationBackend::new(endpoint, Duration::from_secs(config.timeout_secs)) {
        Ok(backend) => {
            tracing::info!(endpoint, "using remote generation endpoint");
            match config.live_code_endpoint() {
                Some(code) => Arc::new(backend.with_code_endpoint(code)),
                None => Arc::new(backend),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "falling back to mock generation backend");
            Arc::new(MockGenerationBackend)
        }
    }
}
